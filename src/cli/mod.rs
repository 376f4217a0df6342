//! Command-line interface for lilac.

mod commands;
pub mod helpers;

pub use commands::{is_verbose, run};
