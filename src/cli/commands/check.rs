//! Tool and service availability check.

use console::style;

use crate::config::Settings;
use crate::llm::LlmClient;
use crate::ocr::{check_binary, OCRMYPDF, PDFTOTEXT, TESSERACT};
use crate::services::build_ocr_manager;

/// Report which external tools and services are usable.
pub async fn cmd_check(settings: &Settings) -> anyhow::Result<()> {
    println!("\n{}", style("Extraction Tools").bold());
    println!("{}", "-".repeat(50));

    let mut all_found = true;
    for tool in [TESSERACT, PDFTOTEXT, OCRMYPDF] {
        if check_binary(tool.program) {
            println!("  {:<15} {}", tool.program, style("✓ found").green());
        } else {
            all_found = false;
            println!("  {:<15} {}", tool.program, style("✗ not found").red());
            println!("                  {}", style(tool.install_hint).dim());
        }
    }

    println!("\n{}", style("OCR Engine").bold());
    println!("{}", "-".repeat(50));
    let manager = build_ocr_manager(&settings.ocr).await;
    match manager.primary() {
        Some(backend) if backend.is_available() => {
            println!(
                "  {:<15} {}",
                backend.backend_type().as_str(),
                style("✓ available").green()
            );
        }
        Some(backend) => {
            all_found = false;
            println!(
                "  {:<15} {}",
                backend.backend_type().as_str(),
                style("✗ not available").red()
            );
            println!("                  {}", style(backend.availability_hint()).dim());
        }
        None => {
            all_found = false;
            println!(
                "  {:<15} {}",
                manager.primary_type().as_str(),
                style("✗ not loaded").red()
            );
            #[cfg(not(feature = "ocr-ocrs"))]
            println!(
                "                  {}",
                style("not compiled (enable ocr-ocrs feature)").dim()
            );
        }
    }

    println!("\n{}", style("Completion Service").bold());
    println!("{}", "-".repeat(50));
    let llm = &settings.llm;
    let client = LlmClient::new(llm.clone())?;
    let label = format!("{} ({})", llm.provider.as_str(), llm.model);
    if !llm.enabled {
        println!("  {:<30} {}", label, style("○ disabled").yellow());
    } else if client.is_available().await {
        println!("  {:<30} {}", label, style("✓ reachable").green());
    } else {
        all_found = false;
        println!("  {:<30} {}", label, style("✗ unreachable").red());
        println!("                  {}", style(&llm.endpoint).dim());
    }

    println!();
    if all_found {
        println!("{} Ready to analyze", style("✓").green());
    } else {
        println!(
            "{} Some components are missing; affected evidence will report errors",
            style("!").yellow()
        );
    }
    Ok(())
}
