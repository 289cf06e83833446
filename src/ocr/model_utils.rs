//! Shared utilities for OCR backends.
//!
//! Provides common functionality for:
//! - Checking for CLI tool availability
//! - Downloading and locating OCR models (neural engine only)

use std::process::Command;

#[cfg(feature = "ocr-ocrs")]
pub use models::{ensure_model_file, ModelDirConfig, ModelSpec};

/// Check if a binary is available in PATH.
pub fn check_binary(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

#[cfg(feature = "ocr-ocrs")]
mod models {
    use std::path::{Path, PathBuf};

    use tracing::info;

    use super::super::backend::OcrError;

    /// Model file specification for downloading.
    pub struct ModelSpec {
        /// URL to download from.
        pub url: &'static str,
        /// Filename to save as.
        pub filename: &'static str,
        /// Human-readable size for progress messages.
        pub size_hint: &'static str,
    }

    /// Configuration for model directory management.
    pub struct ModelDirConfig {
        /// Subdirectory name under data_dir (e.g., "ocrs").
        pub subdir: &'static str,
        /// Required model files to check for presence.
        pub required_files: &'static [&'static str],
    }

    impl ModelDirConfig {
        /// Get the default model directory for this backend.
        pub fn default_dir(&self) -> PathBuf {
            dirs::data_dir()
                .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
                .join("fichetech")
                .join(self.subdir)
        }

        /// Get standard candidate directories to search for models.
        pub fn candidate_dirs(&self) -> Vec<PathBuf> {
            [
                Some(self.default_dir()),
                dirs::home_dir().map(|d| d.join(format!(".{}", self.subdir)).join("models")),
                Some(PathBuf::from(format!("/usr/share/{}/models", self.subdir))),
                Some(PathBuf::from(format!("./models/{}", self.subdir))),
            ]
            .into_iter()
            .flatten()
            .collect()
        }

        /// Check if a directory contains all required model files.
        pub fn has_required_files(&self, dir: &Path) -> bool {
            self.required_files
                .iter()
                .all(|file| dir.join(file).exists())
        }
    }

    /// Download a model file if it doesn't exist.
    pub async fn ensure_model_file(spec: &ModelSpec, model_dir: &Path) -> Result<(), OcrError> {
        let dest = model_dir.join(spec.filename);
        if dest.exists() {
            return Ok(());
        }

        info!("Downloading {} (~{})", spec.filename, spec.size_hint);
        let response = reqwest::get(spec.url)
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| OcrError::ModelNotFound(format!("{}: {}", spec.url, e)))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| OcrError::ModelNotFound(format!("{}: {}", spec.url, e)))?;

        // Write to a sibling temp name so a partial download never looks complete.
        let partial = dest.with_extension("part");
        tokio::fs::write(&partial, &bytes).await?;
        tokio::fs::rename(&partial, &dest).await?;
        info!("Downloaded {}", spec.filename);
        Ok(())
    }
}
