//! Trash lifecycle for documents and events: delete, restore, purge.
//!
//! Every store call is bounded by the configured timeout. Bulk operations
//! issue their calls concurrently and report each item separately; the
//! store decides the final state of every record.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use thiserror::Error;

use crate::config::LifecycleConfig;
use crate::models::{EntityKind, TrashEntry};
use crate::store::{DocumentStore, StoreError};

/// Errors from lifecycle operations.
#[derive(Debug, Clone, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Store did not answer within {0:?}")]
    TimedOut(Duration),
}

pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Result for one record of a bulk operation.
#[derive(Debug, Clone, Serialize)]
pub struct ItemOutcome {
    pub id: String,
    pub ok: bool,
    /// Store confirmation on success, error text on failure.
    pub message: String,
}

/// Per-item results of a bulk operation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkOutcome {
    pub outcomes: Vec<ItemOutcome>,
}

impl BulkOutcome {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.ok).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn summary(&self) -> String {
        format!("{} succeeded, {} failed", self.succeeded(), self.failed())
    }
}

/// Drives delete/restore/purge against a [`DocumentStore`].
pub struct LifecycleManager {
    store: Arc<dyn DocumentStore>,
    timeout: Duration,
}

impl LifecycleManager {
    pub fn new(store: Arc<dyn DocumentStore>, config: &LifecycleConfig) -> Self {
        Self {
            store,
            timeout: config.timeout(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Move an active record to the trash.
    pub async fn delete(&self, kind: EntityKind, id: &str) -> LifecycleResult<String> {
        let message = self.bounded(self.store.trash(kind, id)).await?;
        tracing::info!("Moved {} {} to trash", kind, id);
        Ok(message)
    }

    /// Return a trashed record to the active set.
    pub async fn restore(&self, kind: EntityKind, trash_id: &str) -> LifecycleResult<String> {
        let message = self.bounded(self.store.restore(kind, trash_id)).await?;
        tracing::info!("Restored {} {}", kind, trash_id);
        Ok(message)
    }

    /// Permanently remove a trashed record.
    pub async fn purge(&self, kind: EntityKind, trash_id: &str) -> LifecycleResult<String> {
        let message = self.bounded(self.store.purge(kind, trash_id)).await?;
        tracing::info!("Purged {} {}", kind, trash_id);
        Ok(message)
    }

    pub async fn list_trash(&self, kind: EntityKind) -> LifecycleResult<Vec<TrashEntry>> {
        self.bounded(self.store.list_trash(kind)).await
    }

    /// Trash several records at once.
    pub async fn bulk_delete(&self, kind: EntityKind, ids: &[String]) -> BulkOutcome {
        let calls = ids.iter().map(|id| async move {
            let result = self.delete(kind, id).await;
            item_outcome(id, result)
        });
        let outcome = BulkOutcome {
            outcomes: join_all(calls).await,
        };
        tracing::info!("Bulk delete of {} {}s: {}", ids.len(), kind, outcome.summary());
        outcome
    }

    /// Purge every trashed record of a kind, one call per record.
    pub async fn empty_trash(&self, kind: EntityKind) -> LifecycleResult<BulkOutcome> {
        let entries = self.list_trash(kind).await?;
        let calls = entries.iter().map(|entry| async move {
            let result = self.purge(kind, &entry.trash_id).await;
            item_outcome(&entry.trash_id, result)
        });
        let outcome = BulkOutcome {
            outcomes: join_all(calls).await,
        };
        tracing::info!("Emptied {} trash: {}", kind, outcome.summary());
        Ok(outcome)
    }

    async fn bounded<T>(
        &self,
        call: impl std::future::Future<Output = Result<T, StoreError>>,
    ) -> LifecycleResult<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(LifecycleError::from),
            Err(_) => {
                tracing::warn!("Store call timed out after {:?}", self.timeout);
                Err(LifecycleError::TimedOut(self.timeout))
            }
        }
    }
}

fn item_outcome(id: &str, result: LifecycleResult<String>) -> ItemOutcome {
    match result {
        Ok(message) => ItemOutcome {
            id: id.to_string(),
            ok: true,
            message,
        },
        Err(e) => ItemOutcome {
            id: id.to_string(),
            ok: false,
            message: e.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentRecord, EventRecord};
    use crate::store::MemoryStore;
    use chrono::Utc;

    fn doc(id: &str, name: &str) -> DocumentRecord {
        DocumentRecord {
            id: id.to_string(),
            name: name.to_string(),
            original_filename: format!("{}.pdf", name),
            category: Some("MOUs & MOAs".to_string()),
            category_confidence: 0.9,
            file_type: "pdf".to_string(),
            file_size: 10,
            award_type: None,
            excerpt: None,
            uploaded_at: Utc::now(),
        }
    }

    fn manager(store: Arc<MemoryStore>) -> LifecycleManager {
        LifecycleManager::new(store, &LifecycleConfig::default())
    }

    #[tokio::test]
    async fn test_delete_restore_brings_back_record() {
        let store = Arc::new(MemoryStore::new());
        store.insert_document(doc("7", "Partnership MOU"));
        let lifecycle = manager(store.clone());

        lifecycle.delete(EntityKind::Document, "7").await.unwrap();
        assert!(store.documents().is_empty());

        let trash = lifecycle.list_trash(EntityKind::Document).await.unwrap();
        assert_eq!(trash.len(), 1);
        lifecycle
            .restore(EntityKind::Document, &trash[0].trash_id)
            .await
            .unwrap();

        let docs = store.documents();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "7");
        assert_eq!(docs[0].name, "Partnership MOU");
    }

    #[tokio::test]
    async fn test_purged_record_cannot_be_restored() {
        let store = Arc::new(MemoryStore::new());
        store.insert_document(doc("7", "Partnership MOU"));
        let lifecycle = manager(store.clone());

        lifecycle.delete(EntityKind::Document, "7").await.unwrap();
        let trash_id = lifecycle.list_trash(EntityKind::Document).await.unwrap()[0]
            .trash_id
            .clone();
        lifecycle.purge(EntityKind::Document, &trash_id).await.unwrap();

        let err = lifecycle
            .restore(EntityKind::Document, &trash_id)
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Store(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_bulk_delete_reports_each_item() {
        let store = Arc::new(MemoryStore::new());
        store.insert_document(doc("1", "a"));
        store.insert_document(doc("2", "b"));
        let lifecycle = manager(store.clone());

        let ids = vec!["1".to_string(), "missing".to_string(), "2".to_string()];
        let outcome = lifecycle.bulk_delete(EntityKind::Document, &ids).await;
        assert_eq!(outcome.succeeded(), 2);
        assert_eq!(outcome.failed(), 1);
        assert!(!outcome.outcomes[1].ok);
        assert_eq!(outcome.summary(), "2 succeeded, 1 failed");
    }

    #[tokio::test]
    async fn test_empty_trash_only_touches_kind() {
        let store = Arc::new(MemoryStore::new());
        store.insert_document(doc("1", "a"));
        store.insert_event(EventRecord {
            id: "e1".to_string(),
            title: "Orientation".to_string(),
            description: String::new(),
            category: None,
            location: None,
            starts_at: None,
        });
        let lifecycle = manager(store.clone());
        lifecycle.delete(EntityKind::Document, "1").await.unwrap();
        lifecycle.delete(EntityKind::Event, "e1").await.unwrap();

        let outcome = lifecycle.empty_trash(EntityKind::Document).await.unwrap();
        assert_eq!(outcome.succeeded(), 1);
        assert!(lifecycle.list_trash(EntityKind::Document).await.unwrap().is_empty());
        assert_eq!(lifecycle.list_trash(EntityKind::Event).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_slow_store_times_out() {
        let store = Arc::new(MemoryStore::new());
        store.insert_document(doc("1", "a"));
        store.set_latency(Duration::from_millis(500));
        let lifecycle = manager(store.clone()).with_timeout(Duration::from_millis(20));

        let err = lifecycle.delete(EntityKind::Document, "1").await.unwrap_err();
        assert!(matches!(err, LifecycleError::TimedOut(_)));
        assert_eq!(store.documents().len(), 1);
    }
}
