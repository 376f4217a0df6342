//! LILAC - institutional document and event archive ingestion.
//!
//! Classifies uploaded files by keyword rules, optionally reads their
//! content with OCR, uploads them in concurrent batches with duplicate-name
//! versioning, and manages the trash lifecycle of archived records.

pub mod categorizer;
pub mod cli;
pub mod config;
pub mod models;
pub mod ocr;
pub mod services;
pub mod storage;
pub mod store;
pub mod utils;

pub use categorizer::{CategorizerService, Classification};
pub use services::{LifecycleManager, UploadCoordinator};
pub use store::{DocumentStore, HttpDocumentStore, MemoryStore};
