//! Shared utility functions.
//!
//! - `format`: human-readable sizes and ages for CLI output
//! - `mime`: file kind detection for uploads

mod format;
mod mime;

pub use format::{format_age, format_size};
pub use mime::{detect_file_kind, detect_mime_type, FileKind};
