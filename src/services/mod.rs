//! Service layer for the ingestion pipeline.
//!
//! Services hold the domain logic and report progress through event
//! channels, so the CLI and any other front end only render.

pub mod extract;
pub mod lifecycle;
pub mod upload;

pub use extract::{ContentExtractor, Extraction, NoopExtractor, OcrContentExtractor};
pub use lifecycle::{BulkOutcome, ItemOutcome, LifecycleError, LifecycleManager};
pub use upload::{
    BatchResult, NameRegistry, UploadBatch, UploadCoordinator, UploadEvent, UploadOptions,
    UploadOutcome,
};
