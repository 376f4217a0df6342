//! Trash lifecycle commands.

use std::io::{self, Write};

use chrono::Utc;
use console::style;

use crate::cli::helpers::{open_store, truncate};
use crate::config::Settings;
use crate::models::EntityKind;
use crate::services::{BulkOutcome, LifecycleManager};
use crate::utils::format_age;

fn manager(settings: &Settings) -> anyhow::Result<LifecycleManager> {
    Ok(LifecycleManager::new(
        open_store(settings)?,
        &settings.lifecycle,
    ))
}

fn confirm(prompt: &str) -> anyhow::Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

fn print_bulk(outcome: &BulkOutcome) {
    for item in &outcome.outcomes {
        if item.ok {
            println!("  {} {}: {}", style("✓").green(), item.id, item.message);
        } else {
            println!("  {} {}: {}", style("✗").red(), item.id, style(&item.message).red());
        }
    }
    let mark = if outcome.failed() == 0 {
        style("✓").green()
    } else {
        style("!").yellow()
    };
    println!("{} {}", mark, outcome.summary());
}

/// Move records to the trash.
pub async fn cmd_delete(settings: &Settings, kind: EntityKind, ids: &[String]) -> anyhow::Result<()> {
    let lifecycle = manager(settings)?;
    if let [id] = ids {
        let message = lifecycle.delete(kind, id).await?;
        println!("{} {}", style("✓").green(), message);
        return Ok(());
    }
    print_bulk(&lifecycle.bulk_delete(kind, ids).await);
    Ok(())
}

/// Restore a trashed record.
pub async fn cmd_restore(settings: &Settings, kind: EntityKind, trash_id: &str) -> anyhow::Result<()> {
    let message = manager(settings)?.restore(kind, trash_id).await?;
    println!("{} {}", style("✓").green(), message);
    Ok(())
}

/// Permanently delete a trashed record.
pub async fn cmd_purge(
    settings: &Settings,
    kind: EntityKind,
    trash_id: &str,
    yes: bool,
) -> anyhow::Result<()> {
    if !yes && !confirm(&format!("Permanently delete {} {}?", kind, trash_id))? {
        println!("Cancelled.");
        return Ok(());
    }
    let message = manager(settings)?.purge(kind, trash_id).await?;
    println!("{} {}", style("✓").green(), message);
    Ok(())
}

/// List trashed records.
pub async fn cmd_trash_list(settings: &Settings, kind: EntityKind) -> anyhow::Result<()> {
    let entries = manager(settings)?.list_trash(kind).await?;
    if entries.is_empty() {
        println!("{} Trash is empty", style("!").yellow());
        return Ok(());
    }

    let now = Utc::now();
    println!(
        "{:<12} {:<10} {:<36} {:<20} Deleted",
        "Trash ID", "ID", "Name", "Category"
    );
    println!("{}", "-".repeat(95));
    for entry in &entries {
        println!(
            "{:<12} {:<10} {:<36} {:<20} {}",
            truncate(&entry.trash_id, 12),
            truncate(&entry.original_id, 10),
            truncate(&entry.name, 36),
            truncate(entry.category.as_deref().unwrap_or("-"), 20),
            format_age(entry.deleted_at, now)
        );
    }
    Ok(())
}

/// Permanently delete every trashed record of a kind.
pub async fn cmd_trash_empty(settings: &Settings, kind: EntityKind, yes: bool) -> anyhow::Result<()> {
    if !yes && !confirm(&format!("Permanently delete every trashed {}?", kind))? {
        println!("Cancelled.");
        return Ok(());
    }
    let outcome = manager(settings)?.empty_trash(kind).await?;
    if outcome.is_empty() {
        println!("{} Trash is empty", style("!").yellow());
        return Ok(());
    }
    print_bulk(&outcome);
    Ok(())
}
