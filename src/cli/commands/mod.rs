//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod analyze;
mod check;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Settings;

#[derive(Parser)]
#[command(name = "fichetech")]
#[command(about = "Build product technical sheets from photos, PDFs, links and notes")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze files and texts about one product and print its sheet
    Analyze {
        /// Image (.jpg, .jpeg, .png) and PDF files
        files: Vec<PathBuf>,
        /// Free text or product page URL (repeatable)
        #[arg(short, long = "text")]
        texts: Vec<String>,
        /// Print the full response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check if required OCR tools and the completion service are available
    Check,

    /// Start the HTTP analysis server
    Serve {
        /// Address to bind to: PORT, HOST, or HOST:PORT (default: 127.0.0.1:8000)
        #[arg(default_value = "127.0.0.1:8000")]
        bind: String,
    },
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Analyze { files, texts, json } => {
            analyze::cmd_analyze(&settings, &files, texts, json).await
        }
        Commands::Check => check::cmd_check(&settings).await,
        Commands::Serve { bind } => serve::cmd_serve(&settings, &bind).await,
    }
}
