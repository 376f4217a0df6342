//! Shared helper functions for CLI commands.

use std::sync::Arc;

use crate::categorizer::CategorizerService;
use crate::config::Settings;
use crate::store::{DocumentStore, HttpDocumentStore};

/// Truncate a string to at most `max_len` characters, adding "..." if cut.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
}

/// Build the archive store client from settings.
pub fn open_store(settings: &Settings) -> anyhow::Result<Arc<dyn DocumentStore>> {
    let store = HttpDocumentStore::new(&settings.api_url)?;
    tracing::debug!("Using archive API at {}", store.base_url());
    Ok(Arc::new(store))
}

/// Build the categorizer from the configured (or default) rules.
pub fn open_categorizer(settings: &Settings) -> Arc<CategorizerService> {
    Arc::new(CategorizerService::from_definitions(
        settings.categories.clone(),
    ))
}

/// Format a confidence as a percentage.
pub fn percent(confidence: f32) -> String {
    format!("{:.0}%", confidence * 100.0)
}
