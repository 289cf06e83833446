//! Evidence aggregation.
//!
//! Classifies every input, dispatches it to its extractor and returns one
//! [`EvidenceItem`] per input in submission order: files first, then texts.
//! Extraction runs concurrently up to a configured limit; failures are
//! recorded on the item and never stop the batch.

use std::path::Path;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use super::tokenizer::important_tokens;
use crate::models::{
    AnalysisRequest, EvidenceDetails, EvidenceError, EvidenceItem, InputFile, SourceKind,
};
use crate::ocr::{ImagePreprocessor, OcrManager, PdfTextExtractor, Recognition};
use crate::scrapers::UrlScraper;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Classify an uploaded file by its filename suffix.
pub fn classify_file(filename: &str) -> SourceKind {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match extension.as_deref() {
        Some(ext) if IMAGE_EXTENSIONS.contains(&ext) => SourceKind::Image,
        Some("pdf") => SourceKind::Pdf,
        _ => SourceKind::Unsupported,
    }
}

/// Classify a text entry: URL when it starts with an http(s) scheme.
pub fn classify_text(text: &str) -> SourceKind {
    let trimmed = text.trim_start();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        SourceKind::Url
    } else {
        SourceKind::Text
    }
}

enum Input<'a> {
    File(&'a InputFile),
    Text(&'a str),
}

/// Runs the per-input extractors.
pub struct EvidenceAggregator {
    preprocessor: ImagePreprocessor,
    ocr: Arc<OcrManager>,
    pdf: PdfTextExtractor,
    scraper: UrlScraper,
    max_concurrency: usize,
}

impl EvidenceAggregator {
    pub fn new(
        preprocessor: ImagePreprocessor,
        ocr: Arc<OcrManager>,
        pdf: PdfTextExtractor,
        scraper: UrlScraper,
    ) -> Self {
        Self {
            preprocessor,
            ocr,
            pdf,
            scraper,
            max_concurrency: 4,
        }
    }

    /// Limit the number of inputs extracted at once (minimum 1).
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Extract every input of the request.
    pub async fn aggregate(&self, request: &AnalysisRequest) -> Vec<EvidenceItem> {
        info!(
            "Aggregating {} files and {} texts",
            request.files.len(),
            request.texts.len()
        );

        let inputs = request
            .files
            .iter()
            .map(Input::File)
            .chain(request.texts.iter().map(|t| Input::Text(t.as_str())));

        // `buffered` yields in input order regardless of completion order.
        let extractions: Vec<_> = inputs.map(|input| self.extract(input)).collect();
        stream::iter(extractions)
            .buffered(self.max_concurrency)
            .collect()
            .await
    }

    async fn extract(&self, input: Input<'_>) -> EvidenceItem {
        let item = match input {
            Input::File(file) => match classify_file(&file.filename) {
                SourceKind::Image => self.extract_image(file).await,
                SourceKind::Pdf => self.extract_pdf(file).await,
                _ => EvidenceItem::failed(
                    SourceKind::Unsupported,
                    &file.filename,
                    EvidenceError::UnsupportedInputType(format!(
                        "{}: only .jpg, .jpeg, .png and .pdf files are supported",
                        file.filename
                    )),
                ),
            },
            Input::Text(text) => match classify_text(text) {
                SourceKind::Url => self.extract_url(text.trim()).await,
                _ => extract_text(text),
            },
        };

        match item.error {
            Some(ref e) => warn!("{} ({}): {}", item.label, item.kind, e),
            None => debug!(
                "{} ({}): {} chars",
                item.label,
                item.kind,
                item.text.len()
            ),
        }
        item
    }

    async fn extract_image(&self, file: &InputFile) -> EvidenceItem {
        let preprocessor = self.preprocessor;
        let bytes = file.content.clone();
        let prepared = tokio::task::spawn_blocking(move || preprocessor.from_bytes(&bytes)).await;

        let image = match prepared {
            Ok(Ok(image)) => image,
            Ok(Err(e)) => {
                return EvidenceItem::failed(
                    SourceKind::Image,
                    &file.filename,
                    EvidenceError::OcrEngineFailure(e.to_string()),
                )
            }
            Err(e) => {
                return EvidenceItem::failed(
                    SourceKind::Image,
                    &file.filename,
                    EvidenceError::OcrEngineFailure(format!("preprocessing task failed: {}", e)),
                )
            }
        };

        match self.ocr.recognize(&image).await {
            Recognition::Text(result) => {
                EvidenceItem::extracted(SourceKind::Image, &file.filename, result.text)
            }
            Recognition::Empty => EvidenceItem::extracted(SourceKind::Image, &file.filename, ""),
            Recognition::Failed(e) => EvidenceItem::failed(
                SourceKind::Image,
                &file.filename,
                EvidenceError::OcrEngineFailure(e.to_string()),
            ),
        }
    }

    async fn extract_pdf(&self, file: &InputFile) -> EvidenceItem {
        match self.pdf.extract(&file.filename, &file.content).await {
            Ok(text) => EvidenceItem::extracted(SourceKind::Pdf, &file.filename, text),
            Err(e) => EvidenceItem::failed(SourceKind::Pdf, &file.filename, e),
        }
    }

    async fn extract_url(&self, url: &str) -> EvidenceItem {
        match self.scraper.scrape(url).await {
            Ok(info) => EvidenceItem::extracted(SourceKind::Url, url, info.to_evidence_text())
                .with_details(EvidenceDetails::Url(info)),
            Err(e) => EvidenceItem::failed(SourceKind::Url, url, e),
        }
    }
}

fn extract_text(text: &str) -> EvidenceItem {
    EvidenceItem::extracted(SourceKind::Text, text, text).with_details(EvidenceDetails::Text {
        original_text: text.to_string(),
        important_tokens: important_tokens(text),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_file_by_suffix() {
        assert_eq!(classify_file("plaque.JPG"), SourceKind::Image);
        assert_eq!(classify_file("photo.jpeg"), SourceKind::Image);
        assert_eq!(classify_file("scan.png"), SourceKind::Image);
        assert_eq!(classify_file("notice.pdf"), SourceKind::Pdf);
        assert_eq!(classify_file("notes.docx"), SourceKind::Unsupported);
        assert_eq!(classify_file("README"), SourceKind::Unsupported);
    }

    #[test]
    fn test_classify_text_by_scheme() {
        assert_eq!(classify_text("https://shop.example/p"), SourceKind::Url);
        assert_eq!(classify_text("http://shop.example/p"), SourceKind::Url);
        assert_eq!(classify_text("ftp://shop.example/p"), SourceKind::Text);
        assert_eq!(classify_text("Voir https://shop.example"), SourceKind::Text);
    }

    #[test]
    fn test_free_text_keeps_original_and_tokens() {
        let item = extract_text("Chauffe-eau 200L");
        assert_eq!(item.text, "Chauffe-eau 200L");
        match item.details {
            Some(EvidenceDetails::Text {
                ref important_tokens,
                ..
            }) => assert_eq!(important_tokens, &vec!["Chauffe-eau", "200L"]),
            ref other => panic!("unexpected {:?}", other),
        }
    }
}
