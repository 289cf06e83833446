//! Evidence records produced by the extraction stage.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of input an evidence item was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Image,
    Pdf,
    Url,
    Text,
    /// A file whose suffix is neither an image nor a PDF.
    Unsupported,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Image => "image",
            SourceKind::Pdf => "pdf",
            SourceKind::Url => "url",
            SourceKind::Text => "text",
            SourceKind::Unsupported => "unsupported",
        }
    }

    /// Whether this kind comes from an uploaded file rather than a text entry.
    pub fn is_file(&self) -> bool {
        matches!(
            self,
            SourceKind::Image | SourceKind::Pdf | SourceKind::Unsupported
        )
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reason an evidence item has no (or only partial) text.
///
/// Serialized as `{"kind": "...", "message": "..."}` so callers can branch on
/// the kind and show the message.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum EvidenceError {
    #[error("Unsupported input type: {0}")]
    UnsupportedInputType(String),

    #[error("OCR engine failure: {0}")]
    OcrEngineFailure(String),

    #[error("PDF extraction failure: {0}")]
    PdfExtractionFailure(String),

    #[error("PDF OCR escalation failure: {0}")]
    PdfOcrEscalationFailure(String),

    #[error("Network fetch failure: {0}")]
    NetworkFetchFailure(String),

    #[error("Scrape parse failure: {0}")]
    ScrapeParseFailure(String),

    #[error("Completion service failure: {0}")]
    CompletionServiceFailure(String),
}

/// Extraction status reported per item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceStatus {
    Extracted,
    NoUsableText,
}

/// Information scraped from a URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlInfo {
    pub url: String,
    /// Page title, or the URL itself when the page has no title element.
    pub title: String,
    pub description: Option<String>,
}

impl UrlInfo {
    /// Render as the text submitted for fusion.
    pub fn to_evidence_text(&self) -> String {
        let mut text = self.title.clone();
        if let Some(ref description) = self.description {
            if !description.is_empty() {
                text.push('\n');
                text.push_str(description);
            }
        }
        text.push_str("\nSource: ");
        text.push_str(&self.url);
        text
    }
}

/// Kind-specific details attached to an evidence item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EvidenceDetails {
    Url(UrlInfo),
    Text {
        original_text: String,
        important_tokens: Vec<String>,
    },
}

/// One unit of extracted (or failed-to-extract) text from a single input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub kind: SourceKind,
    /// Filename for files, the raw entry for texts.
    pub label: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<EvidenceError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<EvidenceDetails>,
}

impl EvidenceItem {
    /// Item carrying extracted text.
    pub fn extracted(kind: SourceKind, label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
            text: text.into(),
            error: None,
            details: None,
        }
    }

    /// Item whose extraction failed.
    pub fn failed(kind: SourceKind, label: impl Into<String>, error: EvidenceError) -> Self {
        Self {
            kind,
            label: label.into(),
            text: String::new(),
            error: Some(error),
            details: None,
        }
    }

    pub fn with_details(mut self, details: EvidenceDetails) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_error(mut self, error: EvidenceError) -> Self {
        self.error = Some(error);
        self
    }

    /// Whether the text is worth sending to fusion.
    pub fn has_usable_text(&self) -> bool {
        !self.text.trim().is_empty()
    }

    pub fn status(&self) -> EvidenceStatus {
        if self.has_usable_text() {
            EvidenceStatus::Extracted
        } else {
            EvidenceStatus::NoUsableText
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serializes_with_kind_and_message() {
        let err = EvidenceError::NetworkFetchFailure("dns error".to_string());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "network_fetch_failure");
        assert_eq!(json["message"], "dns error");
    }

    #[test]
    fn test_whitespace_text_is_not_usable() {
        let item = EvidenceItem::extracted(SourceKind::Image, "label.jpg", "  \n\t ");
        assert_eq!(item.status(), EvidenceStatus::NoUsableText);
        assert!(item.error.is_none());
    }

    #[test]
    fn test_failed_item_keeps_label() {
        let item = EvidenceItem::failed(
            SourceKind::Unsupported,
            "notes.docx",
            EvidenceError::UnsupportedInputType("docx".to_string()),
        );
        assert_eq!(item.label, "notes.docx");
        assert_eq!(item.status(), EvidenceStatus::NoUsableText);
        assert!(item.kind.is_file());
    }

    #[test]
    fn test_url_evidence_text() {
        let info = UrlInfo {
            url: "https://example.com/p".to_string(),
            title: "Radiateur 1000W".to_string(),
            description: Some("Convecteur mural".to_string()),
        };
        assert_eq!(
            info.to_evidence_text(),
            "Radiateur 1000W\nConvecteur mural\nSource: https://example.com/p"
        );

        let bare = UrlInfo {
            description: None,
            ..info
        };
        assert_eq!(
            bare.to_evidence_text(),
            "Radiateur 1000W\nSource: https://example.com/p"
        );
    }
}
