//! Upload models: files selected for upload and the per-file task state.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::document::file_extension;

/// A file selected for upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    /// Filename as selected, including extension.
    pub name: String,
    pub bytes: Vec<u8>,
    /// MIME type reported by the caller, if any.
    pub mime_type: Option<String>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
            mime_type: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Read a file from disk.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(name, bytes))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Lowercase extension, empty when the name has none.
    pub fn file_type(&self) -> String {
        file_extension(&self.name)
    }
}

/// Pipeline state of one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadState {
    Pending,
    Extracting,
    Classifying,
    Submitting,
    Succeeded,
    Failed,
}

impl UploadState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Extracting => "extracting",
            Self::Classifying => "classifying",
            Self::Submitting => "submitting",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Where the category of an upload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    /// Selected by the user before upload.
    Manual,
    /// Derived from the OCR excerpt.
    Content,
    /// Derived from the filename alone.
    Filename,
    /// No rule matched.
    Unmatched,
}

impl ClassificationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Content => "content",
            Self::Filename => "filename",
            Self::Unmatched => "unmatched",
        }
    }
}

/// One file moving through the upload pipeline.
#[derive(Debug, Clone)]
pub struct UploadTask {
    pub file: UploadFile,
    /// Name the file was selected with, minus extension.
    pub candidate_name: String,
    /// Unique name after duplicate resolution.
    pub resolved_name: String,
    pub extracted_excerpt: String,
    pub category: Option<String>,
    pub confidence: f32,
    pub source: ClassificationSource,
    pub state: UploadState,
}

impl UploadTask {
    pub fn new(file: UploadFile) -> Self {
        let candidate_name = Path::new(&file.name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.name.clone());
        Self {
            file,
            resolved_name: candidate_name.clone(),
            candidate_name,
            extracted_excerpt: String::new(),
            category: None,
            confidence: 0.0,
            source: ClassificationSource::Unmatched,
            state: UploadState::Pending,
        }
    }
}

/// Entry of the persisted recent-uploads list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentUploadRecord {
    pub name: String,
    pub file_type: String,
    pub file_size: u64,
    #[serde(alias = "uploadDate")]
    pub upload_timestamp: DateTime<Utc>,
}
