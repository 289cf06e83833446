//! One-shot analysis command.

use std::path::{Path, PathBuf};

use anyhow::Context;
use console::style;

use crate::config::Settings;
use crate::models::{AnalysisRequest, AnalysisResponse, EvidenceStatus, InputFile};
use crate::services::AnalysisPipeline;

/// Analyze local files and texts, then print the sheet.
pub async fn cmd_analyze(
    settings: &Settings,
    files: &[PathBuf],
    texts: Vec<String>,
    json: bool,
) -> anyhow::Result<()> {
    let mut inputs = Vec::with_capacity(files.len());
    for path in files {
        let content = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        inputs.push(InputFile::new(display_name(path), content));
    }

    let request = AnalysisRequest::new(inputs, texts);
    if request.is_empty() {
        anyhow::bail!("Nothing to analyze: pass at least one file or --text");
    }

    if !json {
        println!(
            "{} Analyzing {} item(s)...",
            style("→").cyan(),
            request.len()
        );
    }

    let pipeline = AnalysisPipeline::from_settings(settings).await?;
    let response = pipeline.analyze(&request).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_report(&response);
    }
    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn print_report(response: &AnalysisResponse) {
    println!("\n{}", style("Evidence").bold());
    println!("{}", "-".repeat(50));
    for item in &response.evidence {
        let status = match (&item.error, item.status()) {
            (Some(e), _) => style(format!("✗ {}", e)).red(),
            (None, EvidenceStatus::Extracted) => {
                style(format!("✓ {} chars", item.text.chars().count())).green()
            }
            (None, EvidenceStatus::NoUsableText) => style("○ no usable text".to_string()).yellow(),
        };
        println!("  {:<6} {:<40} {}", item.kind.as_str(), truncate(&item.label, 40), status);
    }

    if let Some(ref e) = response.fusion_error {
        println!("\n{} {}", style("✗").red(), e);
    }

    let sheet = &response.sheet;
    println!("\n{}", style("Product Sheet").bold());
    println!("{}", "-".repeat(50));
    println!("  {:<14} {}", "Title", sheet.title);
    println!("  {:<14} {}", "Description", sheet.description);

    let attributes = [
        ("Brand", &sheet.brand),
        ("Model", &sheet.model),
        ("Power", &sheet.power),
        ("Dimensions", &sheet.dimensions),
        ("IP rating", &sheet.ip_rating),
        ("Serial number", &sheet.serial_number),
        ("Certifications", &sheet.certifications),
        ("Made in", &sheet.country_of_manufacture),
    ];
    for (label, value) in attributes {
        match value {
            Some(v) => println!("  {:<14} {}", label, v),
            None => println!("  {:<14} {}", label, style("-").dim()),
        }
    }

    if !response.technical_sheet.is_empty() {
        println!("\n{}", style("Technical Sheet").bold());
        println!("{}", response.technical_sheet);
    }
}

/// Truncate to at most `max` characters, marking the cut with "...".
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let kept: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("https://shop.example/a/very/long/path", 12), "https://s...");
    }

    #[test]
    fn test_display_name_uses_file_name() {
        assert_eq!(display_name(Path::new("/tmp/photos/plaque.jpg")), "plaque.jpg");
    }
}
