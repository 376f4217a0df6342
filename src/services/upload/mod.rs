//! Upload coordinator.
//!
//! Each file of a batch runs its own pipeline:
//! resolve name -> extract content -> classify -> submit -> record outcome.
//! Pipelines are joined on the caller's task, so they interleave only at
//! extraction and submission. A failing pipeline never affects the others,
//! and the batch result is reported once all of them have settled.

mod names;
mod types;

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::mpsc;

use crate::categorizer::CategorizerService;
use crate::config::UploadConfig;
use crate::models::{
    ClassificationSource, NewDocument, UploadFile, UploadState, UploadTask, AWARDS_CATEGORY,
};
use crate::storage::RecentUploads;
use crate::store::DocumentStore;
use crate::utils::detect_mime_type;

use super::extract::ContentExtractor;

pub use names::{base_name, resolve_name, NameRegistry};
pub use types::{BatchResult, UploadBatch, UploadEvent, UploadOptions, UploadOutcome};

/// Confidence reported for a manually chosen category.
const MANUAL_CONFIDENCE: f32 = 1.0;

/// Service that turns selected files into archive documents.
pub struct UploadCoordinator {
    store: Arc<dyn DocumentStore>,
    categorizer: Arc<CategorizerService>,
    extractor: Arc<dyn ContentExtractor>,
    names: Arc<NameRegistry>,
    recent: Arc<RecentUploads>,
    config: UploadConfig,
}

impl UploadCoordinator {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        categorizer: Arc<CategorizerService>,
        extractor: Arc<dyn ContentExtractor>,
        recent: Arc<RecentUploads>,
        config: UploadConfig,
    ) -> Self {
        Self {
            store,
            categorizer,
            extractor,
            names: Arc::new(NameRegistry::new()),
            recent,
            config,
        }
    }

    /// Share a name registry with other coordinators.
    pub fn with_names(mut self, names: Arc<NameRegistry>) -> Self {
        self.names = names;
        self
    }

    pub fn names(&self) -> &NameRegistry {
        &self.names
    }

    pub fn recent(&self) -> &RecentUploads {
        &self.recent
    }

    /// Upload every file of `batch` and report once all have settled.
    pub async fn submit_batch(
        &self,
        batch: UploadBatch,
        options: &UploadOptions,
        event_tx: mpsc::Sender<UploadEvent>,
    ) -> BatchResult {
        let files = batch.into_files();
        let _ = event_tx
            .send(UploadEvent::BatchStarted { total: files.len() })
            .await;

        if files.is_empty() {
            let _ = event_tx
                .send(UploadEvent::BatchComplete {
                    succeeded: 0,
                    failed: 0,
                })
                .await;
            return BatchResult::default();
        }

        self.refresh_known_names().await;

        let pipelines = files
            .into_iter()
            .enumerate()
            .map(|(index, file)| self.run_pipeline(index, file, options, &event_tx));
        let outcomes = join_all(pipelines).await;

        let mut result = BatchResult::from_outcomes(outcomes);
        tracing::info!("Upload batch finished: {}", result.summary());

        result.stats = match self.store.get_stats().await {
            Ok(stats) => Some(stats),
            Err(e) => {
                tracing::warn!("Failed to refresh document stats: {}", e);
                None
            }
        };

        let _ = event_tx
            .send(UploadEvent::BatchComplete {
                succeeded: result.succeeded,
                failed: result.failed,
            })
            .await;
        result
    }

    /// Upload a single file.
    pub async fn upload_one(
        &self,
        file: UploadFile,
        options: &UploadOptions,
        event_tx: mpsc::Sender<UploadEvent>,
    ) -> UploadOutcome {
        self.refresh_known_names().await;
        self.run_pipeline(0, file, options, &event_tx).await
    }

    /// Seed the registry with the store's active names.
    ///
    /// Reservations held by in-flight uploads survive the reseed. On failure
    /// the previous registry contents are kept.
    async fn refresh_known_names(&self) {
        match self.store.list_document_names().await {
            Ok(names) => {
                tracing::debug!("Known document names: {}", names.len());
                self.names.reset(names);
            }
            Err(e) => tracing::warn!("Could not list existing documents: {}", e),
        }
    }

    async fn run_pipeline(
        &self,
        index: usize,
        file: UploadFile,
        options: &UploadOptions,
        event_tx: &mpsc::Sender<UploadEvent>,
    ) -> UploadOutcome {
        let mut task = UploadTask::new(file);

        task.resolved_name = self.names.reserve(&task.file.name);
        let base = base_name(&task.file.name);
        if task.resolved_name != base {
            tracing::info!(
                "'{}' already exists, uploading as '{}'",
                base,
                task.resolved_name
            );
            let _ = event_tx
                .send(UploadEvent::Renamed {
                    index,
                    original: task.file.name.clone(),
                    resolved: task.resolved_name.clone(),
                })
                .await;
        }

        self.set_state(&mut task, index, UploadState::Extracting, event_tx)
            .await;
        let extraction = self.extractor.extract(&task.file).await;
        task.extracted_excerpt = extraction.excerpt;

        self.set_state(&mut task, index, UploadState::Classifying, event_tx)
            .await;
        let manual = options
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .or_else(|| options.award_type.as_ref().map(|_| AWARDS_CATEGORY.to_string()));

        if let Some(category) = manual {
            task.category = Some(category);
            task.confidence = MANUAL_CONFIDENCE;
            task.source = ClassificationSource::Manual;
        } else if let Some(category) = extraction.category {
            task.category = Some(category);
            task.confidence = extraction.confidence;
            task.source = ClassificationSource::Content;
        } else {
            let classification = self.categorizer.classify(&task.file.name, "");
            task.source = if classification.is_match() {
                ClassificationSource::Filename
            } else {
                ClassificationSource::Unmatched
            };
            task.category = classification.category;
            task.confidence = classification.confidence;
        }
        let _ = event_tx
            .send(UploadEvent::Classified {
                index,
                name: task.resolved_name.clone(),
                category: task.category.clone(),
                confidence: task.confidence,
                source: task.source,
            })
            .await;

        self.set_state(&mut task, index, UploadState::Submitting, event_tx)
            .await;
        let file_type = task.file.file_type();
        let file_size = task.file.size();
        let document = NewDocument {
            name: task.resolved_name.clone(),
            original_filename: task.file.name.clone(),
            category: task.category.clone(),
            category_confidence: task.confidence,
            award_type: options.award_type.clone(),
            excerpt: Some(task.extracted_excerpt.clone()).filter(|e| !e.is_empty()),
            mime_type: detect_mime_type(
                &task.file.name,
                &task.file.bytes,
                task.file.mime_type.as_deref(),
            ),
            bytes: std::mem::take(&mut task.file.bytes),
        };

        match self.store.create_document(document).await {
            Ok(created) => {
                self.names.commit(&task.resolved_name);
                if let Err(e) = self.recent.push(&task.resolved_name, &file_type, file_size) {
                    tracing::warn!("Failed to record recent upload: {}", e);
                }
                self.set_state(&mut task, index, UploadState::Succeeded, event_tx)
                    .await;
                let _ = event_tx
                    .send(UploadEvent::Succeeded {
                        index,
                        name: task.resolved_name.clone(),
                        document_id: created.id.clone(),
                    })
                    .await;
                self.outcome(index, &task, Some(created.id), None)
            }
            Err(e) => {
                tracing::warn!("Upload of '{}' failed: {}", task.file.name, e);
                if self.config.release_failed_names {
                    self.names.release(&task.resolved_name);
                }
                self.set_state(&mut task, index, UploadState::Failed, event_tx)
                    .await;
                let _ = event_tx
                    .send(UploadEvent::Failed {
                        index,
                        name: task.resolved_name.clone(),
                        error: e.to_string(),
                    })
                    .await;
                self.outcome(index, &task, None, Some(e.to_string()))
            }
        }
    }

    async fn set_state(
        &self,
        task: &mut UploadTask,
        index: usize,
        state: UploadState,
        event_tx: &mpsc::Sender<UploadEvent>,
    ) {
        task.state = state;
        let _ = event_tx
            .send(UploadEvent::StateChanged {
                index,
                name: task.resolved_name.clone(),
                state,
            })
            .await;
    }

    fn outcome(
        &self,
        index: usize,
        task: &UploadTask,
        document_id: Option<String>,
        error: Option<String>,
    ) -> UploadOutcome {
        UploadOutcome {
            index,
            ok: task.state == UploadState::Succeeded,
            original_filename: task.file.name.clone(),
            name: task.resolved_name.clone(),
            document_id,
            category: task.category.clone(),
            confidence: task.confidence,
            source: task.source,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CategoryDefinition;
    use crate::services::extract::{Extraction, NoopExtractor};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct FixedExtractor(Extraction);

    #[async_trait]
    impl ContentExtractor for FixedExtractor {
        async fn extract(&self, _file: &UploadFile) -> Extraction {
            self.0.clone()
        }
    }

    struct Harness {
        store: Arc<MemoryStore>,
        coordinator: UploadCoordinator,
        _dir: TempDir,
    }

    fn harness(extractor: Arc<dyn ContentExtractor>, config: UploadConfig) -> Harness {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::new());
        let categorizer = Arc::new(CategorizerService::from_definitions([
            CategoryDefinition::new("MOUs & MOAs", 9).with_keywords(["mou", "moa"]),
            CategoryDefinition::new("Registrar Files", 5).with_keywords(["transcript", "tor"]),
        ]));
        let recent = Arc::new(RecentUploads::load(dir.path().join("recent.json"), 50));
        let coordinator =
            UploadCoordinator::new(store.clone(), categorizer, extractor, recent, config);
        Harness {
            store,
            coordinator,
            _dir: dir,
        }
    }

    fn events() -> (mpsc::Sender<UploadEvent>, mpsc::Receiver<UploadEvent>) {
        mpsc::channel(256)
    }

    #[tokio::test]
    async fn test_filename_classification() {
        let h = harness(Arc::new(NoopExtractor), UploadConfig::default());
        let (tx, _rx) = events();
        let outcome = h
            .coordinator
            .upload_one(
                UploadFile::new("Partnership_MOU_2024.pdf", vec![1, 2, 3]),
                &UploadOptions::default(),
                tx,
            )
            .await;
        assert!(outcome.ok);
        assert_eq!(outcome.name, "Partnership_MOU_2024");
        assert_eq!(outcome.category.as_deref(), Some("MOUs & MOAs"));
        assert_eq!(outcome.source, ClassificationSource::Filename);
        assert_eq!(h.store.documents()[0].category.as_deref(), Some("MOUs & MOAs"));
    }

    #[tokio::test]
    async fn test_content_beats_filename() {
        let extractor = FixedExtractor(Extraction {
            excerpt: "official transcript of records".to_string(),
            category: Some("Registrar Files".to_string()),
            confidence: 0.9,
        });
        let h = harness(Arc::new(extractor), UploadConfig::default());
        let (tx, _rx) = events();
        let outcome = h
            .coordinator
            .upload_one(
                UploadFile::new("MOU scan.png", vec![1]),
                &UploadOptions::default(),
                tx,
            )
            .await;
        assert_eq!(outcome.category.as_deref(), Some("Registrar Files"));
        assert_eq!(outcome.source, ClassificationSource::Content);
        assert_eq!(
            h.store.documents()[0].excerpt.as_deref(),
            Some("official transcript of records")
        );
    }

    #[tokio::test]
    async fn test_manual_selection_overrides() {
        let h = harness(Arc::new(NoopExtractor), UploadConfig::default());
        let (tx, _rx) = events();
        let options = UploadOptions {
            category: None,
            award_type: Some("Global Citizenship".to_string()),
        };
        let outcome = h
            .coordinator
            .upload_one(UploadFile::new("MOU.pdf", vec![1]), &options, tx)
            .await;
        assert_eq!(outcome.category.as_deref(), Some(AWARDS_CATEGORY));
        assert_eq!(outcome.source, ClassificationSource::Manual);
        assert_eq!(outcome.confidence, MANUAL_CONFIDENCE);
        assert_eq!(
            h.store.documents()[0].award_type.as_deref(),
            Some("Global Citizenship")
        );
    }

    #[tokio::test]
    async fn test_unmatched_is_stored_uncategorized() {
        let h = harness(Arc::new(NoopExtractor), UploadConfig::default());
        let (tx, _rx) = events();
        let outcome = h
            .coordinator
            .upload_one(
                UploadFile::new("holiday.jpg", vec![1]),
                &UploadOptions::default(),
                tx,
            )
            .await;
        assert!(outcome.ok);
        assert_eq!(outcome.category, None);
        assert_eq!(outcome.source, ClassificationSource::Unmatched);
        assert_eq!(h.store.documents()[0].category, None);
    }

    #[tokio::test]
    async fn test_failed_submission_releases_name_by_default() {
        let h = harness(Arc::new(NoopExtractor), UploadConfig::default());
        h.store.reject_uploads_named("Report");
        let (tx, _rx) = events();
        let outcome = h
            .coordinator
            .upload_one(
                UploadFile::new("Report.pdf", vec![1]),
                &UploadOptions::default(),
                tx,
            )
            .await;
        assert!(!outcome.ok);
        assert!(outcome.error.is_some());
        assert!(!h.coordinator.names().contains("Report"));
        assert!(h.coordinator.recent().is_empty());
    }

    #[tokio::test]
    async fn test_failed_submission_can_keep_reservation() {
        let config = UploadConfig {
            release_failed_names: false,
            ..Default::default()
        };
        let h = harness(Arc::new(NoopExtractor), config);
        h.store.reject_uploads_named("Report");
        let (tx, _rx) = events();
        h.coordinator
            .upload_one(
                UploadFile::new("Report.pdf", vec![1]),
                &UploadOptions::default(),
                tx,
            )
            .await;
        assert!(h.coordinator.names().contains("Report"));
    }

    #[tokio::test]
    async fn test_reservation_from_shared_registry_survives_refresh() {
        let names = Arc::new(NameRegistry::new());
        let h = harness(Arc::new(NoopExtractor), UploadConfig::default());
        let coordinator = h.coordinator.with_names(names.clone());

        // Another coordinator is still submitting "Report".
        assert_eq!(names.reserve("Report.pdf"), "Report");

        let (tx, _rx) = events();
        let outcome = coordinator
            .upload_one(
                UploadFile::new("Report.pdf", vec![1]),
                &UploadOptions::default(),
                tx,
            )
            .await;
        assert!(outcome.ok);
        assert_eq!(outcome.name, "Report (1)");
        assert_eq!(names.reserved(), 1);
        assert!(names.contains("Report (1)"));
    }

    #[tokio::test]
    async fn test_rename_event_emitted() {
        let h = harness(Arc::new(NoopExtractor), UploadConfig::default());
        let (tx, mut rx) = events();
        let batch: UploadBatch = vec![
            UploadFile::new("Form.pdf", vec![1]),
            UploadFile::new("Form.docx", vec![1]),
        ]
        .into_iter()
        .collect();
        let result = h
            .coordinator
            .submit_batch(batch, &UploadOptions::default(), tx)
            .await;
        assert_eq!(result.succeeded, 2);

        let mut renamed = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let UploadEvent::Renamed { resolved, .. } = event {
                renamed.push(resolved);
            }
        }
        assert_eq!(renamed, vec!["Form (1)"]);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let h = harness(Arc::new(NoopExtractor), UploadConfig::default());
        let (tx, _rx) = events();
        let result = h
            .coordinator
            .submit_batch(UploadBatch::new(), &UploadOptions::default(), tx)
            .await;
        assert_eq!(result.succeeded + result.failed, 0);
        assert!(result.outcomes.is_empty());
    }
}
