//! OCR tool availability check.

use console::style;

use crate::config::Settings;
use crate::ocr::OcrEngine;

/// Check whether the OCR tools used for content extraction are installed.
pub fn cmd_ocr_check(settings: &Settings) -> anyhow::Result<()> {
    println!("\n{}", style("OCR Tool Status").bold());
    println!("{}", "-".repeat(50));

    let tools = OcrEngine::tool_status(&settings.extraction.ocr_config());
    for tool in &tools {
        let status = if tool.available {
            style("✓ found").green()
        } else {
            style("✗ not found").red()
        };
        println!("  {:<15} {}", tool.name, status);
        if !tool.available {
            println!("                  {}", style(&tool.hint).dim());
        }
    }

    println!();
    if !settings.extraction.enabled {
        println!(
            "{} Content extraction is disabled in config; files are classified by name",
            style("!").yellow()
        );
    } else if tools.iter().all(|t| t.available) {
        println!("{} Images and PDFs will be read before classification", style("✓").green());
    } else if tools.first().is_some_and(|t| t.available) {
        println!(
            "{} Images will be read; PDFs are classified by name",
            style("!").yellow()
        );
    } else {
        println!(
            "{} Files will be classified by name only",
            style("!").yellow()
        );
    }

    Ok(())
}
