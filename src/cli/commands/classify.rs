//! Classification and rule inspection commands.

use std::path::Path;

use console::style;

use crate::cli::helpers::{open_categorizer, percent};
use crate::config::Settings;
use crate::models::UploadFile;
use crate::services::{ContentExtractor, OcrContentExtractor};

/// Show which category a file would be assigned.
pub async fn cmd_classify(
    settings: &Settings,
    file: &Path,
    text: Option<&str>,
    ocr: bool,
) -> anyhow::Result<()> {
    let categorizer = open_categorizer(settings);
    let filename = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());

    let mut content = text.unwrap_or_default().to_string();
    if ocr && content.is_empty() {
        let upload = UploadFile::from_path(file).await?;
        let extractor = OcrContentExtractor::new(settings.extraction.clone(), categorizer.clone());
        let extraction = extractor.extract(&upload).await;
        if extraction.is_empty() {
            println!(
                "{} No text extracted; classifying by name only",
                style("!").yellow()
            );
        } else {
            println!(
                "{} Extracted {} characters",
                style("→").cyan(),
                extraction.excerpt.chars().count()
            );
        }
        content = extraction.excerpt;
    }

    let classification = categorizer.classify(&filename, &content);
    match &classification.category {
        Some(category) => {
            let matched_by = classification
                .matched_by
                .map(|m| format!("{:?}", m).to_lowercase())
                .unwrap_or_default();
            println!(
                "{} {} {} ({} match, {})",
                style("✓").green(),
                filename,
                style(category).bold(),
                matched_by,
                percent(classification.confidence)
            );
            if let Some(date) = &classification.matched_date {
                println!("  {} {}", style("Date:").dim(), date);
            }
        }
        None => println!("{} {} Uncategorized", style("○").yellow(), filename),
    }

    Ok(())
}

/// List rules in evaluation order.
pub fn cmd_rules_list(settings: &Settings) -> anyhow::Result<()> {
    let categorizer = open_categorizer(settings);
    let rules = categorizer.rules();

    println!("\n{}", style("Category Rules").bold());
    println!("{}", "-".repeat(60));
    println!("{:<30} {:>8} {:>9} {:>9}", "Name", "Priority", "Keywords", "Patterns");
    println!("{}", "-".repeat(60));
    for rule in &rules {
        println!(
            "{:<30} {:>8} {:>9} {:>9}",
            rule.name,
            rule.priority,
            rule.keywords.len(),
            rule.patterns.len()
        );
    }

    let invalid = categorizer.invalid_rules();
    if !invalid.is_empty() {
        println!("\n{}", style("Skipped rules:").yellow());
        for err in invalid {
            println!("  {} {}", style("✗").red(), err);
        }
    }

    Ok(())
}

/// Show one rule.
pub fn cmd_rules_show(settings: &Settings, name: &str) -> anyhow::Result<()> {
    let categorizer = open_categorizer(settings);
    let Some(rule) = categorizer.rule(name) else {
        println!("{} No rule named '{}'", style("✗").red(), name);
        return Ok(());
    };

    println!("\n{}", style(&rule.name).bold());
    if let Some(description) = &rule.description {
        println!("  {}", style(description).dim());
    }
    println!("  {:<14} {}", "Priority:", rule.priority);
    println!("  {:<14} {}", "Keywords:", rule.keywords.join(", "));
    println!("  {:<14} {}", "Patterns:", rule.patterns.join("  "));
    if !rule.date_patterns.is_empty() {
        println!("  {:<14} {}", "Date patterns:", rule.date_patterns.join("  "));
    }

    Ok(())
}
