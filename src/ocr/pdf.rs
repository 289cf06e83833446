//! PDF text extraction with forced-OCR escalation.
//!
//! The embedded text layer is read first (pdftotext, all pages in order).
//! Only when that text is empty after trimming is the document re-rendered
//! with `ocrmypdf --force-ocr` and the new text layer read back.
//!
//! All intermediate files live in one scoped temporary directory that is
//! removed when extraction returns, whatever the outcome, or when the
//! future is dropped.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tracing::{debug, info, warn};

use super::tool::{ToolError, OCRMYPDF, PDFTOTEXT};
use crate::models::EvidenceError;

/// External tools that read and re-render PDFs.
#[async_trait]
pub trait PdfToolchain: Send + Sync {
    /// Text layer of every page, concatenated in page order.
    async fn text_layer(&self, pdf: &Path) -> Result<String, ToolError>;

    /// Write a copy of `input` with a freshly recognized text layer to `output`.
    async fn force_ocr(&self, input: &Path, output: &Path) -> Result<(), ToolError>;
}

/// pdftotext + ocrmypdf.
#[derive(Debug, Clone)]
pub struct PopplerToolchain {
    language: String,
    text_timeout: Duration,
    ocr_timeout: Duration,
}

impl PopplerToolchain {
    pub fn new(language: &str, text_timeout: Duration, ocr_timeout: Duration) -> Self {
        Self {
            language: language.to_string(),
            text_timeout,
            ocr_timeout,
        }
    }
}

impl Default for PopplerToolchain {
    fn default() -> Self {
        Self::new("fra", Duration::from_secs(30), Duration::from_secs(300))
    }
}

#[async_trait]
impl PdfToolchain for PopplerToolchain {
    async fn text_layer(&self, pdf: &Path) -> Result<String, ToolError> {
        let args = [
            OsStr::new("-layout"),
            OsStr::new("-enc"),
            OsStr::new("UTF-8"),
            pdf.as_os_str(),
            OsStr::new("-"),
        ];
        PDFTOTEXT.run(args, None, self.text_timeout).await
    }

    async fn force_ocr(&self, input: &Path, output: &Path) -> Result<(), ToolError> {
        let args = [
            OsStr::new("--force-ocr"),
            OsStr::new("-l"),
            OsStr::new(&self.language),
            input.as_os_str(),
            output.as_os_str(),
        ];
        OCRMYPDF.run(args, None, self.ocr_timeout).await?;
        Ok(())
    }
}

/// Extracts text from PDF bytes.
#[derive(Clone)]
pub struct PdfTextExtractor {
    toolchain: Arc<dyn PdfToolchain>,
    scratch_dir: Option<PathBuf>,
}

impl PdfTextExtractor {
    pub fn new(toolchain: Arc<dyn PdfToolchain>) -> Self {
        Self {
            toolchain,
            scratch_dir: None,
        }
    }

    /// Create temporary files under `dir` instead of the system temp dir.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    fn scratch(&self) -> std::io::Result<TempDir> {
        match self.scratch_dir {
            Some(ref dir) => tempfile::Builder::new().prefix("fichetech-").tempdir_in(dir),
            None => tempfile::Builder::new().prefix("fichetech-").tempdir(),
        }
    }

    /// Extract text, escalating to forced OCR only on an empty text layer.
    pub async fn extract(&self, label: &str, bytes: &[u8]) -> Result<String, EvidenceError> {
        let scratch = self
            .scratch()
            .map_err(|e| EvidenceError::PdfExtractionFailure(e.to_string()))?;
        let original = scratch.path().join("input.pdf");
        tokio::fs::write(&original, bytes)
            .await
            .map_err(|e| EvidenceError::PdfExtractionFailure(e.to_string()))?;

        let text = self
            .toolchain
            .text_layer(&original)
            .await
            .map_err(|e| EvidenceError::PdfExtractionFailure(e.to_string()))?;

        if !text.trim().is_empty() {
            debug!("{}: text layer has {} chars", label, text.len());
            return Ok(text);
        }

        info!("{}: empty text layer, forcing OCR", label);
        let result = self.escalate(&scratch, &original).await;
        if let Err(ref e) = result {
            warn!("{}: {}", label, e);
        }
        result
    }

    async fn escalate(&self, scratch: &TempDir, original: &Path) -> Result<String, EvidenceError> {
        let ocr_copy = scratch.path().join("ocr.pdf");
        self.toolchain
            .force_ocr(original, &ocr_copy)
            .await
            .map_err(|e| EvidenceError::PdfOcrEscalationFailure(e.to_string()))?;
        self.toolchain
            .text_layer(&ocr_copy)
            .await
            .map_err(|e| EvidenceError::PdfOcrEscalationFailure(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns `first` for the original document and `after_ocr` for the OCR'd copy.
    struct FakeToolchain {
        first: Result<&'static str, &'static str>,
        after_ocr: &'static str,
        ocr_fails: bool,
        ocr_calls: AtomicUsize,
    }

    impl FakeToolchain {
        fn new(first: Result<&'static str, &'static str>, after_ocr: &'static str) -> Self {
            Self {
                first,
                after_ocr,
                ocr_fails: false,
                ocr_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PdfToolchain for FakeToolchain {
        async fn text_layer(&self, pdf: &Path) -> Result<String, ToolError> {
            assert!(pdf.exists());
            if pdf.ends_with("ocr.pdf") {
                return Ok(self.after_ocr.to_string());
            }
            self.first.map(str::to_string).map_err(|e| ToolError::Failed {
                tool: "pdftotext".to_string(),
                stderr: e.to_string(),
            })
        }

        async fn force_ocr(&self, input: &Path, output: &Path) -> Result<(), ToolError> {
            self.ocr_calls.fetch_add(1, Ordering::SeqCst);
            if self.ocr_fails {
                return Err(ToolError::Failed {
                    tool: "ocrmypdf".to_string(),
                    stderr: "render error".to_string(),
                });
            }
            tokio::fs::copy(input, output).await?;
            Ok(())
        }
    }

    fn extractor(toolchain: Arc<FakeToolchain>, scratch: &TempDir) -> PdfTextExtractor {
        PdfTextExtractor::new(toolchain).with_scratch_dir(scratch.path())
    }

    fn is_empty_dir(dir: &TempDir) -> bool {
        std::fs::read_dir(dir.path()).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn test_text_layer_skips_escalation() {
        let scratch = TempDir::new().unwrap();
        let tools = Arc::new(FakeToolchain::new(Ok("Puissance 1000W"), "unused"));
        let text = extractor(tools.clone(), &scratch)
            .extract("doc.pdf", b"%PDF-1.4")
            .await
            .unwrap();
        assert_eq!(text, "Puissance 1000W");
        assert_eq!(tools.ocr_calls.load(Ordering::SeqCst), 0);
        assert!(is_empty_dir(&scratch));
    }

    #[tokio::test]
    async fn test_partial_text_never_escalates() {
        let scratch = TempDir::new().unwrap();
        let tools = Arc::new(FakeToolchain::new(Ok("  x  "), "unused"));
        extractor(tools.clone(), &scratch)
            .extract("doc.pdf", b"%PDF-1.4")
            .await
            .unwrap();
        assert_eq!(tools.ocr_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_text_layer_escalates() {
        let scratch = TempDir::new().unwrap();
        let tools = Arc::new(FakeToolchain::new(Ok(" \n\x0c"), "Marque ACME"));
        let text = extractor(tools.clone(), &scratch)
            .extract("scan.pdf", b"%PDF-1.4")
            .await
            .unwrap();
        assert_eq!(text, "Marque ACME");
        assert_eq!(tools.ocr_calls.load(Ordering::SeqCst), 1);
        assert!(is_empty_dir(&scratch));
    }

    #[tokio::test]
    async fn test_escalation_failure_cleans_up() {
        let scratch = TempDir::new().unwrap();
        let mut tools = FakeToolchain::new(Ok(""), "unused");
        tools.ocr_fails = true;
        let err = extractor(Arc::new(tools), &scratch)
            .extract("scan.pdf", b"%PDF-1.4")
            .await
            .unwrap_err();
        assert!(matches!(err, EvidenceError::PdfOcrEscalationFailure(_)));
        assert!(is_empty_dir(&scratch));
    }

    #[tokio::test]
    async fn test_text_layer_failure_is_extraction_failure() {
        let scratch = TempDir::new().unwrap();
        let tools = Arc::new(FakeToolchain::new(Err("corrupt"), "unused"));
        let err = extractor(tools.clone(), &scratch)
            .extract("bad.pdf", b"garbage")
            .await
            .unwrap_err();
        assert!(matches!(err, EvidenceError::PdfExtractionFailure(ref m) if m.contains("corrupt")));
        assert_eq!(tools.ocr_calls.load(Ordering::SeqCst), 0);
        assert!(is_empty_dir(&scratch));
    }
}
