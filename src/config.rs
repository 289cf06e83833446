//! Configuration management for fichetech using the prefer crate.
//!
//! A config file (TOML or JSON) is discovered by prefer under the name
//! `fichetech`, or given explicitly. Every field has a default and
//! environment variables override whatever the file says.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::llm::LlmConfig;
use crate::ocr::{OcrBackendType, PreprocessProfile};

/// Errors loading a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {format} config: {message}")]
    Parse {
        format: &'static str,
        message: String,
    },
}

/// Image OCR settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrSettings {
    /// Engine to run: "tesseract" or "ocrs"
    #[serde(default)]
    pub engine: OcrBackendType,
    /// Preprocessing profile: "simple" or "enhanced"
    #[serde(default)]
    pub profile: PreprocessProfile,
    /// Tesseract language(s), e.g. "fra" or "fra+eng"
    #[serde(default = "default_language")]
    pub language: String,
    /// Tesseract page segmentation mode
    #[serde(default = "default_page_segmentation")]
    pub page_segmentation: u8,
    #[serde(default = "default_ocr_timeout_secs")]
    pub timeout_secs: u64,
    /// Directory holding the neural engine models
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_path: Option<PathBuf>,
}

/// PDF extraction settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfSettings {
    /// Timeout for reading a text layer
    #[serde(default = "default_pdf_text_timeout_secs")]
    pub text_timeout_secs: u64,
    /// Timeout for the forced-OCR re-render
    #[serde(default = "default_pdf_ocr_timeout_secs")]
    pub ocr_timeout_secs: u64,
    /// Where temporary files go (system temp dir when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<PathBuf>,
}

/// URL scraping settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeSettings {
    #[serde(default = "default_scrape_timeout_secs")]
    pub timeout_secs: u64,
    /// None, "impersonate", or a custom user agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// Batch processing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Inputs extracted at once
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

fn default_language() -> String {
    "fra".to_string()
}

fn default_page_segmentation() -> u8 {
    6
}

fn default_ocr_timeout_secs() -> u64 {
    60
}

fn default_pdf_text_timeout_secs() -> u64 {
    30
}

fn default_pdf_ocr_timeout_secs() -> u64 {
    300
}

fn default_scrape_timeout_secs() -> u64 {
    5
}

fn default_max_concurrency() -> usize {
    4
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            engine: OcrBackendType::default(),
            profile: PreprocessProfile::default(),
            language: default_language(),
            page_segmentation: default_page_segmentation(),
            timeout_secs: default_ocr_timeout_secs(),
            model_path: None,
        }
    }
}

impl Default for PdfSettings {
    fn default() -> Self {
        Self {
            text_timeout_secs: default_pdf_text_timeout_secs(),
            ocr_timeout_secs: default_pdf_ocr_timeout_secs(),
            scratch_dir: None,
        }
    }
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_scrape_timeout_secs(),
            user_agent: None,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
        }
    }
}

/// All settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub ocr: OcrSettings,
    #[serde(default)]
    pub pdf: PdfSettings,
    #[serde(default)]
    pub scrape: ScrapeSettings,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Settings {
    /// Load settings: explicit path if given, otherwise prefer discovery,
    /// otherwise defaults. Environment overrides are applied last.
    pub async fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let settings = match explicit {
            Some(path) => Self::load_from_path(path).await?,
            None => match prefer::load("fichetech").await {
                Ok(found) => match found.source_path() {
                    Some(path) => Self::load_from_path(path).await?,
                    None => Self::default(),
                },
                Err(_) => {
                    debug!("No fichetech config file found, using defaults");
                    Self::default()
                }
            },
        };
        Ok(settings.with_env_overrides())
    }

    /// Load a config file, parsed by extension (TOML, otherwise JSON).
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let mut settings = Self::parse(&contents, path)?;
        settings.source_path = Some(path.to_path_buf());
        debug!("Loaded config from {}", path.display());
        Ok(settings)
    }

    fn parse(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|e| e.to_str()).unwrap_or("json") {
            "toml" => toml::from_str(contents).map_err(|e| ConfigError::Parse {
                format: "TOML",
                message: e.to_string(),
            }),
            _ => serde_json::from_str(contents).map_err(|e| ConfigError::Parse {
                format: "JSON",
                message: e.to_string(),
            }),
        }
    }

    /// Apply environment variable overrides.
    pub fn with_env_overrides(self) -> Self {
        self.with_env(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// Supported vars: `OCR_ENGINE`, `OCR_PROFILE`, `OCR_LANGUAGE`,
    /// `OCR_TIMEOUT_SECS`, `OCR_MODEL_PATH`, `PDF_TEXT_TIMEOUT_SECS`,
    /// `PDF_OCR_TIMEOUT_SECS`, `SCRAPE_TIMEOUT_SECS`, `SCRAPE_USER_AGENT`,
    /// `PIPELINE_MAX_CONCURRENCY`, plus the `LLM_*` family.
    pub fn with_env<F>(mut self, var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(engine) = var("OCR_ENGINE").and_then(|v| OcrBackendType::from_str(&v)) {
            self.ocr.engine = engine;
        }
        if let Some(profile) = var("OCR_PROFILE").and_then(|v| PreprocessProfile::from_str(&v)) {
            self.ocr.profile = profile;
        }
        if let Some(language) = var("OCR_LANGUAGE") {
            self.ocr.language = language;
        }
        if let Some(secs) = var("OCR_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.ocr.timeout_secs = secs;
        }
        if let Some(path) = var("OCR_MODEL_PATH") {
            self.ocr.model_path = Some(PathBuf::from(path));
        }
        if let Some(secs) = var("PDF_TEXT_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.pdf.text_timeout_secs = secs;
        }
        if let Some(secs) = var("PDF_OCR_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.pdf.ocr_timeout_secs = secs;
        }
        if let Some(secs) = var("SCRAPE_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.scrape.timeout_secs = secs;
        }
        if let Some(agent) = var("SCRAPE_USER_AGENT") {
            self.scrape.user_agent = Some(agent);
        }
        if let Some(n) = var("PIPELINE_MAX_CONCURRENCY").and_then(|v| v.parse().ok()) {
            self.pipeline.max_concurrency = n;
        }
        self.llm = self.llm.with_env(&var);
        self
    }
}
