//! Upload command.

use std::path::PathBuf;
use std::sync::Arc;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;

use crate::config::Settings;
use crate::models::{ClassificationSource, UploadFile};
use crate::services::{
    ContentExtractor, NoopExtractor, OcrContentExtractor, UploadBatch, UploadCoordinator,
    UploadEvent, UploadOptions,
};
use crate::storage::RecentUploads;
use crate::utils::format_size;

use crate::cli::helpers::{open_categorizer, open_store, percent, truncate};

/// Upload files as one batch.
pub async fn cmd_upload(
    settings: &Settings,
    paths: &[PathBuf],
    category: Option<String>,
    award_type: Option<String>,
    no_ocr: bool,
    json: bool,
) -> anyhow::Result<()> {
    settings.ensure_directories()?;

    let mut batch = UploadBatch::new();
    for path in paths {
        match UploadFile::from_path(path).await {
            Ok(file) => batch.add(file),
            Err(e) => println!(
                "{} Skipping {}: {}",
                style("!").yellow(),
                path.display(),
                e
            ),
        }
    }
    if batch.is_empty() {
        println!("{} No readable files to upload", style("!").yellow());
        return Ok(());
    }

    let store = open_store(settings)?;
    let categorizer = open_categorizer(settings);
    let extractor: Arc<dyn ContentExtractor> = if no_ocr || !settings.extraction.enabled {
        Arc::new(NoopExtractor)
    } else {
        Arc::new(OcrContentExtractor::new(
            settings.extraction.clone(),
            categorizer.clone(),
        ))
    };
    let recent = Arc::new(RecentUploads::load(
        settings.recent_uploads_path(),
        settings.upload.max_recent_uploads,
    ));

    let coordinator = UploadCoordinator::new(
        store,
        categorizer,
        extractor,
        recent,
        settings.upload.clone(),
    );
    let options = UploadOptions {
        category,
        award_type,
    };

    if !json {
        println!(
            "{} Uploading {} file(s), {}",
            style("→").cyan(),
            batch.len(),
            format_size(batch.total_bytes())
        );
    }

    let (event_tx, mut event_rx) = mpsc::channel::<UploadEvent>(100);

    // Spawn event handler for UI
    let event_handler = tokio::spawn(async move {
        let mut pb: Option<ProgressBar> = None;

        while let Some(event) = event_rx.recv().await {
            if json {
                continue;
            }
            match event {
                UploadEvent::BatchStarted { total } => {
                    let progress = ProgressBar::new(total as u64);
                    if let Ok(bar_style) = ProgressStyle::default_bar()
                        .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
                    {
                        progress.set_style(bar_style.progress_chars("█▓░"));
                    }
                    progress.set_message("Uploading...");
                    pb = Some(progress);
                }
                UploadEvent::Renamed {
                    original, resolved, ..
                } => {
                    let line = format!(
                        "  {} {} already exists, uploading as {}",
                        style("i").blue(),
                        original,
                        style(&resolved).bold()
                    );
                    match &pb {
                        Some(p) => p.println(line),
                        None => println!("{}", line),
                    }
                }
                UploadEvent::StateChanged { name, state, .. } => {
                    if let Some(p) = &pb {
                        p.set_message(format!("{} {}", state.as_str(), truncate(&name, 40)));
                    }
                }
                UploadEvent::Classified { .. } => {}
                UploadEvent::Succeeded { .. } | UploadEvent::Failed { .. } => {
                    if let Some(p) = &pb {
                        p.inc(1);
                    }
                }
                UploadEvent::BatchComplete { .. } => {
                    if let Some(p) = pb.take() {
                        p.finish_and_clear();
                    }
                }
            }
        }
    });

    let result = coordinator.submit_batch(batch, &options, event_tx).await;
    let _ = event_handler.await;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    for outcome in &result.outcomes {
        let category = match (&outcome.category, outcome.source) {
            (Some(c), ClassificationSource::Manual) => format!("{} (manual)", c),
            (Some(c), source) => format!("{} ({}, {})", c, source.as_str(), percent(outcome.confidence)),
            (None, _) => "Uncategorized".to_string(),
        };
        if outcome.ok {
            println!(
                "  {} {:<40} {}",
                style("✓").green(),
                truncate(&outcome.name, 40),
                style(category).dim()
            );
        } else {
            println!(
                "  {} {:<40} {}",
                style("✗").red(),
                truncate(&outcome.name, 40),
                style(outcome.error.as_deref().unwrap_or("failed")).red()
            );
        }
    }

    let summary = result.summary();
    if result.failed == 0 {
        println!("{} {}", style("✓").green(), summary);
    } else {
        println!("{} {}", style("!").yellow(), summary);
    }
    if let Some(stats) = &result.stats {
        println!(
            "  {} documents in archive, {} added in the last 30 days",
            stats.total, stats.recent
        );
    }

    Ok(())
}
