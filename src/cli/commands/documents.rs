//! Document listing, statistics and recent uploads.

use chrono::Utc;
use console::style;

use crate::cli::helpers::{open_store, truncate};
use crate::config::Settings;
use crate::models::DocumentFilter;
use crate::storage::RecentUploads;
use crate::utils::{format_age, format_size};

/// List archived documents.
pub async fn cmd_list(
    settings: &Settings,
    page: u32,
    limit: u32,
    search: Option<String>,
    category: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let store = open_store(settings)?;
    let filter = DocumentFilter {
        page,
        limit,
        search,
        category,
    };
    let result = store.list_documents(&filter).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if result.documents.is_empty() {
        println!("{} No documents found", style("!").yellow());
        return Ok(());
    }

    let now = Utc::now();
    println!(
        "{:<8} {:<40} {:<22} {:>10} Uploaded",
        "ID", "Name", "Category", "Size"
    );
    println!("{}", "-".repeat(95));
    for doc in &result.documents {
        println!(
            "{:<8} {:<40} {:<22} {:>10} {}",
            truncate(&doc.id, 8),
            truncate(&doc.name, 40),
            truncate(doc.category.as_deref().unwrap_or("-"), 22),
            format_size(doc.file_size),
            format_age(doc.uploaded_at, now)
        );
    }

    let p = &result.pagination;
    println!(
        "\n{}",
        style(format!(
            "Page {} of {} ({} documents)",
            p.page, p.total_pages, p.total
        ))
        .dim()
    );

    Ok(())
}

/// Show archive statistics.
pub async fn cmd_stats(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let store = open_store(settings)?;
    let stats = store.get_stats().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("\n{}", style("Archive Statistics").bold());
    println!("{}", "-".repeat(40));
    println!("{:<28} {:>10}", "Total documents", stats.total);
    println!("{:<28} {:>10}", "Added in last 30 days", stats.recent);

    if !stats.by_category.is_empty() {
        println!("\n{}", style("By category:").cyan());
        for (category, count) in &stats.by_category {
            println!("  {:<26} {:>10}", truncate(category, 26), count);
        }
    }

    Ok(())
}

/// Show or edit the recent uploads list.
pub fn cmd_recent(settings: &Settings, remove: Option<&str>, clear: bool) -> anyhow::Result<()> {
    let recent = RecentUploads::load(
        settings.recent_uploads_path(),
        settings.upload.max_recent_uploads,
    );

    if clear {
        recent.clear()?;
        println!("{} Cleared recent uploads", style("✓").green());
        return Ok(());
    }
    if let Some(name) = remove {
        if recent.remove(name)? {
            println!("{} Removed '{}'", style("✓").green(), name);
        } else {
            println!("{} '{}' is not in the list", style("!").yellow(), name);
        }
        return Ok(());
    }

    let entries = recent.list();
    if entries.is_empty() {
        println!("{} No recent uploads", style("!").yellow());
        return Ok(());
    }

    let now = Utc::now();
    for entry in entries {
        println!(
            "  {:<40} {:<6} {:>10}  {}",
            truncate(&entry.name, 40),
            entry.file_type,
            format_size(entry.file_size),
            style(format_age(entry.upload_timestamp, now)).dim()
        );
    }

    Ok(())
}
