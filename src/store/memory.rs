//! In-process store implementing the full trash lifecycle.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use super::{DocumentStore, StoreError, StoreResult};
use crate::models::{
    CreatedDocument, DocumentFilter, DocumentPage, DocumentRecord, DocumentStats, EntityKind,
    EventRecord, LifecycleState, NewDocument, Pagination, TrashEntry,
};

/// Documents count as recent for this many days.
const RECENT_DAYS: i64 = 30;

/// Stats bucket for documents without a category.
const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Debug, Clone)]
enum TrashedRecord {
    Document(DocumentRecord),
    Event(EventRecord),
}

#[derive(Debug, Clone)]
struct TrashedItem {
    entry: TrashEntry,
    record: TrashedRecord,
}

#[derive(Default)]
struct MemoryState {
    documents: Vec<DocumentRecord>,
    events: Vec<EventRecord>,
    trash: Vec<TrashedItem>,
    rejected_names: HashSet<String>,
    latency: Option<Duration>,
}

impl MemoryState {
    fn find_trashed(&self, kind: EntityKind, trash_id: &str) -> Option<usize> {
        self.trash.iter().position(|t| {
            t.entry.kind == kind && (t.entry.trash_id == trash_id || t.entry.original_id == trash_id)
        })
    }
}

/// A [`DocumentStore`] kept entirely in memory.
///
/// Restoring a trashed record brings back the exact record, id included.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an active document.
    pub fn insert_document(&self, document: DocumentRecord) {
        self.lock().documents.push(document);
    }

    /// Seed an active event.
    pub fn insert_event(&self, event: EventRecord) {
        self.lock().events.push(event);
    }

    /// Make `create_document` reject uploads with this resolved name.
    pub fn reject_uploads_named(&self, name: impl Into<String>) {
        self.lock().rejected_names.insert(name.into());
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = Some(latency);
    }

    pub fn documents(&self) -> Vec<DocumentRecord> {
        self.lock().documents.clone()
    }

    pub fn events(&self) -> Vec<EventRecord> {
        self.lock().events.clone()
    }

    /// Where a record currently is. `None` once purged or never created.
    pub fn state_of(&self, kind: EntityKind, id: &str) -> Option<LifecycleState> {
        let state = self.lock();
        let active = match kind {
            EntityKind::Document => state.documents.iter().any(|d| d.id == id),
            EntityKind::Event => state.events.iter().any(|e| e.id == id),
        };
        if active {
            return Some(LifecycleState::Active);
        }
        state
            .trash
            .iter()
            .any(|t| t.entry.kind == kind && t.entry.original_id == id)
            .then_some(LifecycleState::Trashed)
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn simulate_latency(&self) {
        let latency = self.lock().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list_categories(&self) -> StoreResult<Vec<String>> {
        self.simulate_latency().await;
        let state = self.lock();
        let categories: BTreeSet<String> = state
            .documents
            .iter()
            .filter_map(|d| d.category.clone())
            .collect();
        Ok(categories.into_iter().collect())
    }

    async fn list_documents(&self, filter: &DocumentFilter) -> StoreResult<DocumentPage> {
        self.simulate_latency().await;
        let (page, limit) = filter.normalized();
        let state = self.lock();

        let mut matching: Vec<&DocumentRecord> =
            state.documents.iter().filter(|d| filter.matches(d)).collect();
        matching.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));

        let total = matching.len() as u64;
        let offset = ((page - 1) * limit) as usize;
        let documents = matching
            .into_iter()
            .skip(offset)
            .take(limit as usize)
            .cloned()
            .collect();

        Ok(DocumentPage {
            documents,
            pagination: Pagination::new(page, limit, total),
        })
    }

    async fn create_document(&self, document: NewDocument) -> StoreResult<CreatedDocument> {
        self.simulate_latency().await;
        let mut state = self.lock();
        if state.rejected_names.contains(&document.name) {
            return Err(StoreError::Rejected(format!(
                "Upload of '{}' rejected",
                document.name
            )));
        }

        let id = uuid::Uuid::new_v4().to_string();
        state.documents.push(DocumentRecord {
            id: id.clone(),
            file_type: document.file_type(),
            file_size: document.bytes.len() as u64,
            name: document.name,
            original_filename: document.original_filename,
            category: document.category,
            category_confidence: document.category_confidence,
            award_type: document.award_type,
            excerpt: document.excerpt,
            uploaded_at: Utc::now(),
        });

        Ok(CreatedDocument {
            id,
            message: "Document added".to_string(),
        })
    }

    async fn get_stats(&self) -> StoreResult<DocumentStats> {
        self.simulate_latency().await;
        let state = self.lock();
        let cutoff = Utc::now() - chrono::Duration::days(RECENT_DAYS);

        let mut by_category = BTreeMap::new();
        for doc in &state.documents {
            let key = doc.category.as_deref().unwrap_or(UNCATEGORIZED).to_string();
            *by_category.entry(key).or_insert(0) += 1;
        }

        Ok(DocumentStats {
            total: state.documents.len() as u64,
            recent: state
                .documents
                .iter()
                .filter(|d| d.uploaded_at >= cutoff)
                .count() as u64,
            by_category,
        })
    }

    async fn trash(&self, kind: EntityKind, id: &str) -> StoreResult<String> {
        self.simulate_latency().await;
        let mut state = self.lock();

        let (name, category, record) = match kind {
            EntityKind::Document => {
                let idx = state
                    .documents
                    .iter()
                    .position(|d| d.id == id)
                    .ok_or_else(|| StoreError::NotFound(format!("document {}", id)))?;
                let doc = state.documents.remove(idx);
                (doc.name.clone(), doc.category.clone(), TrashedRecord::Document(doc))
            }
            EntityKind::Event => {
                let idx = state
                    .events
                    .iter()
                    .position(|e| e.id == id)
                    .ok_or_else(|| StoreError::NotFound(format!("event {}", id)))?;
                let event = state.events.remove(idx);
                (event.title.clone(), event.category.clone(), TrashedRecord::Event(event))
            }
        };

        state.trash.push(TrashedItem {
            entry: TrashEntry {
                trash_id: uuid::Uuid::new_v4().to_string(),
                kind,
                original_id: id.to_string(),
                name,
                category,
                deleted_at: Utc::now(),
            },
            record,
        });

        Ok(format!("{} moved to trash", kind))
    }

    async fn restore(&self, kind: EntityKind, trash_id: &str) -> StoreResult<String> {
        self.simulate_latency().await;
        let mut state = self.lock();
        let idx = state
            .find_trashed(kind, trash_id)
            .ok_or_else(|| StoreError::NotFound(format!("trash item {}", trash_id)))?;

        let original_id = state.trash[idx].entry.original_id.clone();
        let conflict = match kind {
            EntityKind::Document => state.documents.iter().any(|d| d.id == original_id),
            EntityKind::Event => state.events.iter().any(|e| e.id == original_id),
        };
        if conflict {
            return Err(StoreError::Rejected(format!(
                "An active {} with id {} already exists",
                kind, original_id
            )));
        }

        let item = state.trash.remove(idx);
        match item.record {
            TrashedRecord::Document(doc) => state.documents.push(doc),
            TrashedRecord::Event(event) => state.events.push(event),
        }
        Ok(format!("{} restored", kind))
    }

    async fn purge(&self, kind: EntityKind, trash_id: &str) -> StoreResult<String> {
        self.simulate_latency().await;
        let mut state = self.lock();
        let idx = state
            .find_trashed(kind, trash_id)
            .ok_or_else(|| StoreError::NotFound(format!("trash item {}", trash_id)))?;
        state.trash.remove(idx);
        Ok(format!("{} permanently deleted", kind))
    }

    async fn list_trash(&self, kind: EntityKind) -> StoreResult<Vec<TrashEntry>> {
        self.simulate_latency().await;
        let state = self.lock();
        Ok(state
            .trash
            .iter()
            .filter(|t| t.entry.kind == kind)
            .map(|t| t.entry.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_doc(name: &str, category: Option<&str>) -> NewDocument {
        NewDocument {
            name: name.to_string(),
            original_filename: format!("{}.pdf", name),
            category: category.map(str::to_string),
            category_confidence: 0.9,
            award_type: None,
            excerpt: Some("excerpt".to_string()),
            mime_type: "application/pdf".to_string(),
            bytes: vec![0; 4],
        }
    }

    fn event(id: &str, title: &str) -> EventRecord {
        EventRecord {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            category: Some("Events & Activities".to_string()),
            location: None,
            starts_at: None,
        }
    }

    #[tokio::test]
    async fn test_delete_then_restore_returns_exact_record() {
        let store = MemoryStore::new();
        let created = store
            .create_document(new_doc("Partnership MOU", Some("MOUs & MOAs")))
            .await
            .unwrap();
        let before = store.documents()[0].clone();

        store.trash(EntityKind::Document, &created.id).await.unwrap();
        assert!(store.documents().is_empty());

        let trash = store.list_trash(EntityKind::Document).await.unwrap();
        assert_eq!(trash.len(), 1);
        assert_eq!(trash[0].original_id, created.id);

        store
            .restore(EntityKind::Document, &trash[0].trash_id)
            .await
            .unwrap();
        assert_eq!(store.documents(), vec![before]);
    }

    #[tokio::test]
    async fn test_purge_is_irreversible() {
        let store = MemoryStore::new();
        store.insert_event(event("e1", "Seminar"));
        store.trash(EntityKind::Event, "e1").await.unwrap();
        let trash_id = store.list_trash(EntityKind::Event).await.unwrap()[0]
            .trash_id
            .clone();

        assert_eq!(
            store.state_of(EntityKind::Event, "e1"),
            Some(LifecycleState::Trashed)
        );
        store.purge(EntityKind::Event, &trash_id).await.unwrap();
        assert_eq!(store.state_of(EntityKind::Event, "e1"), None);
        assert!(matches!(
            store.restore(EntityKind::Event, &trash_id).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(store.events().is_empty());
    }

    #[tokio::test]
    async fn test_trash_is_per_kind() {
        let store = MemoryStore::new();
        let created = store.create_document(new_doc("Form", None)).await.unwrap();
        store.insert_event(event("e1", "Workshop"));
        store.trash(EntityKind::Document, &created.id).await.unwrap();
        store.trash(EntityKind::Event, "e1").await.unwrap();

        let events = store.list_trash(EntityKind::Event).await.unwrap();
        assert_eq!(events.len(), 1);
        store
            .purge(EntityKind::Event, &events[0].trash_id)
            .await
            .unwrap();
        assert!(store.list_trash(EntityKind::Event).await.unwrap().is_empty());
        assert_eq!(store.list_trash(EntityKind::Document).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_listing_paginates_and_names_cover_all_pages() {
        let store = MemoryStore::new();
        for i in 0..120 {
            store
                .create_document(new_doc(&format!("Doc {}", i), None))
                .await
                .unwrap();
        }

        let page = store
            .list_documents(&DocumentFilter {
                page: 2,
                limit: 50,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.documents.len(), 50);
        assert_eq!(page.pagination.total, 120);
        assert_eq!(page.pagination.total_pages, 3);

        assert_eq!(store.list_document_names().await.unwrap().len(), 120);
    }

    #[tokio::test]
    async fn test_stats_group_uncategorized() {
        let store = MemoryStore::new();
        store
            .create_document(new_doc("MOU", Some("MOUs & MOAs")))
            .await
            .unwrap();
        store.create_document(new_doc("Photo", None)).await.unwrap();

        let stats = store.get_stats().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.recent, 2);
        assert_eq!(stats.by_category.get(UNCATEGORIZED), Some(&1));
        assert_eq!(store.list_categories().await.unwrap(), vec!["MOUs & MOAs"]);
    }

    #[tokio::test]
    async fn test_rejected_upload() {
        let store = MemoryStore::new();
        store.reject_uploads_named("Bad");
        assert!(matches!(
            store.create_document(new_doc("Bad", None)).await,
            Err(StoreError::Rejected(_))
        ));
    }
}
