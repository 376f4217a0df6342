//! Access to the external document/event store.
//!
//! The archive server owns durable storage. This module only defines the
//! operations the ingestion core needs from it, plus two implementations:
//! [`HttpDocumentStore`] for the archive's JSON API and [`MemoryStore`] for
//! tests and embedding.

mod http;
mod memory;

use async_trait::async_trait;

use crate::models::{
    CreatedDocument, DocumentFilter, DocumentPage, DocumentStats, EntityKind, NewDocument,
    TrashEntry, MAX_PAGE_LIMIT,
};

pub use http::HttpDocumentStore;
pub use memory::MemoryStore;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from store operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// The store answered `{ success: false, message }`.
    #[error("{0}")]
    Rejected(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Request failed: {0}")]
    Transport(String),
    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        StoreError::Transport(e.to_string())
    }
}

/// Operations the ingestion core performs against the archive.
///
/// Implementations must be safe to call from concurrent pipelines.
/// Lifecycle calls return the store's confirmation message.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn list_categories(&self) -> StoreResult<Vec<String>>;

    async fn list_documents(&self, filter: &DocumentFilter) -> StoreResult<DocumentPage>;

    async fn create_document(&self, document: NewDocument) -> StoreResult<CreatedDocument>;

    async fn get_stats(&self) -> StoreResult<DocumentStats>;

    /// Move an active record to the trash.
    async fn trash(&self, kind: EntityKind, id: &str) -> StoreResult<String>;

    /// Return a trashed record to the active set.
    async fn restore(&self, kind: EntityKind, trash_id: &str) -> StoreResult<String>;

    /// Remove a trashed record permanently.
    async fn purge(&self, kind: EntityKind, trash_id: &str) -> StoreResult<String>;

    async fn list_trash(&self, kind: EntityKind) -> StoreResult<Vec<TrashEntry>>;

    /// Names of every active document, paging through the listing.
    async fn list_document_names(&self) -> StoreResult<Vec<String>> {
        let mut names = Vec::new();
        let mut filter = DocumentFilter {
            page: 1,
            limit: MAX_PAGE_LIMIT,
            ..Default::default()
        };

        loop {
            let page = self.list_documents(&filter).await?;
            if page.documents.is_empty() {
                break;
            }
            names.extend(page.documents.into_iter().map(|d| d.name));
            if !page.pagination.has_next() {
                break;
            }
            filter.page += 1;
        }

        Ok(names)
    }
}
