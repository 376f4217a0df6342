//! Data models for LILAC.

mod category;
mod document;
mod upload;

pub use category::{default_categories, CategoryDefinition, AWARDS_CATEGORY, DEFAULT_PRIORITY};
pub use document::{
    file_extension, CreatedDocument, DocumentFilter, DocumentPage, DocumentRecord, DocumentStats,
    EntityKind, EventRecord, LifecycleState, NewDocument, Pagination, TrashEntry, MAX_PAGE_LIMIT,
};
pub use upload::{
    ClassificationSource, RecentUploadRecord, UploadFile, UploadState, UploadTask,
};
