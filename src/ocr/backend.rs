//! OCR backend abstraction.
//!
//! Two interchangeable engines sit behind [`OcrBackend`]:
//! - Tesseract: deterministic, layout-aware recognizer via command-line (default)
//! - Ocrs: neural scene-text recognizer in pure Rust (feature: ocr-ocrs)
//!
//! The engine is chosen by configuration; engines are alternatives, not a
//! fallback chain.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::GrayImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::tool::ToolError;

/// Errors from OCR backends.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("OCR timed out after {0}s")]
    Timeout(u64),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    ImageError(String),
}

impl From<ToolError> for OcrError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::NotFound(hint) => OcrError::BackendNotAvailable(hint),
            ToolError::TimedOut { secs, .. } => OcrError::Timeout(secs),
            ToolError::Io(e) => OcrError::Io(e),
            other => OcrError::OcrFailed(other.to_string()),
        }
    }
}

impl From<image::ImageError> for OcrError {
    fn from(err: image::ImageError) -> Self {
        OcrError::ImageError(err.to_string())
    }
}

/// Result of OCR processing.
#[derive(Debug, Clone)]
pub struct OcrResult {
    /// Extracted text content.
    pub text: String,
    /// Confidence score (0.0 - 1.0), if available.
    pub confidence: Option<f32>,
    /// Which backend produced this result.
    pub backend: OcrBackendType,
    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

/// Available OCR backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrBackendType {
    /// Tesseract OCR via command-line.
    #[default]
    Tesseract,
    /// Pure Rust neural OCR engine (ocrs crate).
    Ocrs,
}

impl OcrBackendType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OcrBackendType::Tesseract => "tesseract",
            OcrBackendType::Ocrs => "ocrs",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "tesseract" => Some(OcrBackendType::Tesseract),
            "ocrs" | "neural" => Some(OcrBackendType::Ocrs),
            _ => None,
        }
    }
}

impl std::fmt::Display for OcrBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Trait for OCR backends.
#[async_trait]
pub trait OcrBackend: Send + Sync {
    /// Get the backend type.
    fn backend_type(&self) -> OcrBackendType;

    /// Check if this backend is available (dependencies installed, models present).
    fn is_available(&self) -> bool;

    /// Get a description of what's needed to make this backend available.
    fn availability_hint(&self) -> String;

    /// Run OCR on a preprocessed image.
    async fn ocr_image(&self, image: &GrayImage) -> Result<OcrResult, OcrError>;
}

/// Outcome of recognizing one image. Never an `Err`: failures are values.
#[derive(Debug)]
pub enum Recognition {
    /// Non-empty text was recognized.
    Text(OcrResult),
    /// The engine ran but found nothing usable.
    Empty,
    /// The engine could not run or crashed.
    Failed(OcrError),
}

/// A backend plus its availability, probed once at registration.
struct Registered {
    backend: Arc<dyn OcrBackend>,
    /// Availability hint when the backend was unusable at registration.
    unavailable: Option<String>,
}

/// Holds the registered backends and resolves the configured one.
///
/// Availability checks may spawn processes, so they run once in
/// [`register`](Self::register) and never on the recognition path.
pub struct OcrManager {
    backends: Vec<Registered>,
    primary: OcrBackendType,
    timeout: Duration,
}

impl OcrManager {
    /// Create a new OCR manager with the specified primary backend.
    pub fn new(primary: OcrBackendType, timeout: Duration) -> Self {
        Self {
            backends: Vec::new(),
            primary,
            timeout,
        }
    }

    /// Register a backend.
    pub fn register(&mut self, backend: Arc<dyn OcrBackend>) {
        let unavailable = (!backend.is_available()).then(|| backend.availability_hint());
        if let Some(ref hint) = unavailable {
            debug!("{} registered but not available: {}", backend.backend_type(), hint);
        }
        self.backends.push(Registered {
            backend,
            unavailable,
        });
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_backend(mut self, backend: Arc<dyn OcrBackend>) -> Self {
        self.register(backend);
        self
    }

    pub fn primary_type(&self) -> OcrBackendType {
        self.primary
    }

    /// Get the primary backend.
    pub fn primary(&self) -> Option<&dyn OcrBackend> {
        self.get(self.primary)
    }

    /// Get a specific backend by type.
    pub fn get(&self, backend_type: OcrBackendType) -> Option<&dyn OcrBackend> {
        self.find(backend_type).map(|r| r.backend.as_ref())
    }

    /// List all registered backends.
    pub fn backends(&self) -> impl Iterator<Item = &dyn OcrBackend> {
        self.backends.iter().map(|r| r.backend.as_ref())
    }

    fn find(&self, backend_type: OcrBackendType) -> Option<&Registered> {
        self.backends
            .iter()
            .find(|r| r.backend.backend_type() == backend_type)
    }

    /// Get the primary backend, validated and ready to use.
    fn get_ready_primary(&self) -> Result<&dyn OcrBackend, OcrError> {
        let registered = self.find(self.primary).ok_or_else(|| {
            OcrError::BackendNotAvailable(format!(
                "Primary backend {} not registered",
                self.primary
            ))
        })?;
        if let Some(ref hint) = registered.unavailable {
            return Err(OcrError::BackendNotAvailable(hint.clone()));
        }
        Ok(registered.backend.as_ref())
    }

    /// Run the primary backend with the configured timeout.
    pub async fn ocr_image(&self, image: &GrayImage) -> Result<OcrResult, OcrError> {
        let backend = self.get_ready_primary()?;
        match tokio::time::timeout(self.timeout, backend.ocr_image(image)).await {
            Ok(result) => result,
            Err(_) => Err(OcrError::Timeout(self.timeout.as_secs())),
        }
    }

    /// Recognize text, folding every failure into the returned value.
    pub async fn recognize(&self, image: &GrayImage) -> Recognition {
        match self.ocr_image(image).await {
            Ok(result) if result.text.trim().is_empty() => {
                debug!("{} found no text", result.backend);
                Recognition::Empty
            }
            Ok(result) => {
                debug!(
                    "{} recognized {} chars in {}ms",
                    result.backend,
                    result.text.len(),
                    result.processing_time_ms
                );
                Recognition::Text(result)
            }
            Err(e) => {
                warn!("OCR backend {} failed: {}", self.primary, e);
                Recognition::Failed(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedBackend {
        text: &'static str,
        available: bool,
        delay: Duration,
    }

    #[async_trait]
    impl OcrBackend for FixedBackend {
        fn backend_type(&self) -> OcrBackendType {
            OcrBackendType::Tesseract
        }

        fn is_available(&self) -> bool {
            self.available
        }

        fn availability_hint(&self) -> String {
            "fixed backend disabled".to_string()
        }

        async fn ocr_image(&self, _image: &GrayImage) -> Result<OcrResult, OcrError> {
            tokio::time::sleep(self.delay).await;
            Ok(OcrResult {
                text: self.text.to_string(),
                confidence: None,
                backend: OcrBackendType::Tesseract,
                processing_time_ms: 0,
            })
        }
    }

    fn manager(text: &'static str, available: bool, delay: Duration) -> OcrManager {
        OcrManager::new(OcrBackendType::Tesseract, Duration::from_millis(200)).with_backend(
            Arc::new(FixedBackend {
                text,
                available,
                delay,
            }),
        )
    }

    fn blank() -> GrayImage {
        GrayImage::new(4, 4)
    }

    #[test]
    fn test_backend_type_parsing() {
        assert_eq!(
            OcrBackendType::from_str("Tesseract"),
            Some(OcrBackendType::Tesseract)
        );
        assert_eq!(OcrBackendType::from_str("neural"), Some(OcrBackendType::Ocrs));
        assert_eq!(OcrBackendType::from_str("paddle"), None);
    }

    #[tokio::test]
    async fn test_recognize_text() {
        let m = manager("IP24 1000W", true, Duration::ZERO);
        match m.recognize(&blank()).await {
            Recognition::Text(r) => assert_eq!(r.text, "IP24 1000W"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_whitespace_is_empty_not_failure() {
        let m = manager(" \n ", true, Duration::ZERO);
        assert!(matches!(m.recognize(&blank()).await, Recognition::Empty));
    }

    #[tokio::test]
    async fn test_unavailable_backend_is_failure() {
        let m = manager("text", false, Duration::ZERO);
        match m.recognize(&blank()).await {
            Recognition::Failed(OcrError::BackendNotAvailable(hint)) => {
                assert!(hint.contains("disabled"))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unregistered_primary_is_failure() {
        let m = OcrManager::new(OcrBackendType::Ocrs, Duration::from_secs(1));
        assert!(matches!(
            m.recognize(&blank()).await,
            Recognition::Failed(OcrError::BackendNotAvailable(_))
        ));
    }

    struct CountingBackend {
        checks: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl OcrBackend for CountingBackend {
        fn backend_type(&self) -> OcrBackendType {
            OcrBackendType::Tesseract
        }

        fn is_available(&self) -> bool {
            self.checks
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            true
        }

        fn availability_hint(&self) -> String {
            String::new()
        }

        async fn ocr_image(&self, _image: &GrayImage) -> Result<OcrResult, OcrError> {
            Ok(OcrResult {
                text: "SN 42".to_string(),
                confidence: None,
                backend: OcrBackendType::Tesseract,
                processing_time_ms: 0,
            })
        }
    }

    #[tokio::test]
    async fn test_availability_checked_once_at_registration() {
        let backend = Arc::new(CountingBackend {
            checks: std::sync::atomic::AtomicUsize::new(0),
        });
        let m = OcrManager::new(OcrBackendType::Tesseract, Duration::from_secs(1))
            .with_backend(backend.clone());

        for _ in 0..3 {
            assert!(matches!(m.recognize(&blank()).await, Recognition::Text(_)));
        }
        assert_eq!(backend.checks.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stalled_backend_times_out() {
        let m = manager("late", true, Duration::from_secs(5));
        assert!(matches!(
            m.recognize(&blank()).await,
            Recognition::Failed(OcrError::Timeout(_))
        ));
    }
}
