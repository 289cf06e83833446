//! Tesseract OCR backend implementation.
//!
//! Uses Tesseract via command-line, fed with a PNG on stdin. Configured for
//! single-column, label-like text blocks (page segmentation mode 6 by default).

use std::io::Cursor;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use image::{GrayImage, ImageFormat};

use super::backend::{OcrBackend, OcrBackendType, OcrError, OcrResult};
use super::model_utils::check_binary;
use super::tool::TESSERACT;

/// Tesseract OCR backend.
pub struct TesseractBackend {
    language: String,
    page_segmentation: u8,
    timeout: Duration,
}

impl TesseractBackend {
    pub fn new(language: &str, page_segmentation: u8, timeout: Duration) -> Self {
        Self {
            language: language.to_string(),
            page_segmentation,
            timeout,
        }
    }

    /// Arguments for a stdin-to-stdout run.
    fn args(&self) -> Vec<String> {
        vec![
            "stdin".to_string(),
            "stdout".to_string(),
            "-l".to_string(),
            self.language.clone(),
            "--psm".to_string(),
            self.page_segmentation.to_string(),
        ]
    }
}

impl Default for TesseractBackend {
    fn default() -> Self {
        Self::new("fra", 6, Duration::from_secs(60))
    }
}

#[async_trait]
impl OcrBackend for TesseractBackend {
    fn backend_type(&self) -> OcrBackendType {
        OcrBackendType::Tesseract
    }

    fn is_available(&self) -> bool {
        check_binary("tesseract")
    }

    fn availability_hint(&self) -> String {
        if !check_binary("tesseract") {
            "Tesseract not installed. Install with: apt install tesseract-ocr".to_string()
        } else {
            format!(
                "Tesseract is available (language data '{}' required)",
                self.language
            )
        }
    }

    async fn ocr_image(&self, image: &GrayImage) -> Result<OcrResult, OcrError> {
        let start = Instant::now();

        let mut png = Vec::new();
        image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

        let text = TESSERACT.run(self.args(), Some(&png), self.timeout).await?;

        Ok(OcrResult {
            text,
            confidence: None,
            backend: OcrBackendType::Tesseract,
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_use_stdin_and_psm() {
        let backend = TesseractBackend::new("fra+eng", 4, Duration::from_secs(1));
        assert_eq!(
            backend.args(),
            vec!["stdin", "stdout", "-l", "fra+eng", "--psm", "4"]
        );
    }

    #[test]
    fn test_availability_hint_mentions_tesseract() {
        let hint = TesseractBackend::default().availability_hint();
        assert!(hint.contains("Tesseract"));
    }
}
