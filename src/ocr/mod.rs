//! OCR and document text extraction.
//!
//! Extracts text from product evidence using:
//! - Image preprocessing (grayscale, equalization, adaptive threshold)
//! - Tesseract OCR for photos and scans (default)
//! - OCRS for pure-Rust neural OCR (feature: ocr-ocrs)
//! - pdftotext for PDF text layers, with ocrmypdf forced-OCR escalation
//!
//! ## OCR Backends
//!
//! Tesseract and OCRS are alternatives selected by configuration, not a
//! fallback chain. Use `OcrManager` to resolve the configured one.

mod backend;
mod model_utils;
mod pdf;
mod preprocess;
mod tesseract;
mod tool;

#[cfg(feature = "ocr-ocrs")]
mod ocrs_backend;

pub use backend::{OcrBackend, OcrBackendType, OcrError, OcrManager, OcrResult, Recognition};
pub use model_utils::check_binary;
pub use pdf::{PdfTextExtractor, PdfToolchain, PopplerToolchain};
pub use preprocess::{ImagePreprocessor, PreprocessProfile};
pub use tesseract::TesseractBackend;
pub use tool::{Tool, ToolError, OCRMYPDF, PDFTOTEXT, TESSERACT};

#[cfg(feature = "ocr-ocrs")]
pub use ocrs_backend::OcrsBackend;
