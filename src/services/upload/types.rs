//! Upload service types and events.

use serde::Serialize;

use crate::models::{ClassificationSource, DocumentStats, UploadFile, UploadState};

/// Events emitted while a batch is processed.
#[derive(Debug, Clone)]
pub enum UploadEvent {
    /// Batch accepted; pipelines are starting.
    BatchStarted { total: usize },
    /// A file's name collided and was versioned.
    Renamed {
        index: usize,
        original: String,
        resolved: String,
    },
    /// A file's pipeline moved to a new stage.
    StateChanged {
        index: usize,
        name: String,
        state: UploadState,
    },
    /// A category was chosen for a file.
    Classified {
        index: usize,
        name: String,
        category: Option<String>,
        confidence: f32,
        source: ClassificationSource,
    },
    /// The store accepted a file.
    Succeeded {
        index: usize,
        name: String,
        document_id: String,
    },
    /// The store rejected a file or could not be reached.
    Failed {
        index: usize,
        name: String,
        error: String,
    },
    /// Every pipeline has settled.
    BatchComplete { succeeded: usize, failed: usize },
}

/// Files selected for upload, editable until submission.
#[derive(Debug, Clone, Default)]
pub struct UploadBatch {
    files: Vec<UploadFile>,
}

impl UploadBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, file: UploadFile) {
        self.files.push(file);
    }

    /// Drop a file before submission. Returns it if it was in the batch.
    pub fn remove(&mut self, name: &str) -> Option<UploadFile> {
        let idx = self.files.iter().position(|f| f.name == name)?;
        Some(self.files.remove(idx))
    }

    pub fn files(&self) -> &[UploadFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(UploadFile::size).sum()
    }

    pub(crate) fn into_files(self) -> Vec<UploadFile> {
        self.files
    }
}

impl FromIterator<UploadFile> for UploadBatch {
    fn from_iter<I: IntoIterator<Item = UploadFile>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}

/// Selections made by the user before submitting.
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    /// Category chosen manually; overrides classification.
    pub category: Option<String>,
    /// Award classification chosen manually.
    pub award_type: Option<String>,
}

/// Result of one file's pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct UploadOutcome {
    /// Position of the file in the batch.
    pub index: usize,
    pub ok: bool,
    /// Filename as selected.
    pub original_filename: String,
    /// Name after duplicate resolution.
    pub name: String,
    pub document_id: Option<String>,
    pub category: Option<String>,
    pub confidence: f32,
    pub source: ClassificationSource,
    pub error: Option<String>,
}

/// Aggregate result of a batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchResult {
    pub succeeded: usize,
    pub failed: usize,
    /// One outcome per file, in batch order.
    pub outcomes: Vec<UploadOutcome>,
    /// Archive statistics refreshed after the batch, if reachable.
    pub stats: Option<DocumentStats>,
}

impl BatchResult {
    pub fn from_outcomes(outcomes: Vec<UploadOutcome>) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.ok).count();
        Self {
            succeeded,
            failed: outcomes.len() - succeeded,
            outcomes,
            stats: None,
        }
    }

    /// "2 succeeded, 1 failed"
    pub fn summary(&self) -> String {
        format!("{} succeeded, {} failed", self.succeeded, self.failed)
    }
}
