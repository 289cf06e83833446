//! Inbound request and outbound response of one analysis.

use serde::{Deserialize, Serialize};

use super::evidence::{EvidenceDetails, EvidenceError, EvidenceItem, EvidenceStatus, SourceKind};
use super::sheet::ProductSheet;

/// One uploaded file.
#[derive(Debug, Clone)]
pub struct InputFile {
    pub filename: String,
    pub content: Vec<u8>,
}

impl InputFile {
    pub fn new(filename: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content,
        }
    }
}

/// A batch of evidence about a single product.
#[derive(Debug, Clone, Default)]
pub struct AnalysisRequest {
    pub files: Vec<InputFile>,
    pub texts: Vec<String>,
}

impl AnalysisRequest {
    pub fn new(files: Vec<InputFile>, texts: Vec<String>) -> Self {
        Self { files, texts }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.texts.is_empty()
    }

    /// Number of evidence items this request will produce.
    pub fn len(&self) -> usize {
        self.files.len() + self.texts.len()
    }
}

/// Per-file entry of the response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    pub filename: String,
    pub kind: SourceKind,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    pub status: EvidenceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<EvidenceError>,
}

/// Per-text entry of the response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextReport {
    pub kind: SourceKind,
    pub parsed_info: serde_json::Value,
    pub status: EvidenceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<EvidenceError>,
}

/// Full result of one analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub files: Vec<FileReport>,
    pub texts: Vec<TextReport>,
    /// All evidence in submission order (files, then texts).
    pub evidence: Vec<EvidenceItem>,
    pub sheet: ProductSheet,
    /// Raw Technical Sheet block of the narrative.
    pub technical_sheet: String,
    pub narrative: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fusion_error: Option<EvidenceError>,
}

impl AnalysisResponse {
    /// Build the response, splitting evidence into file and text reports.
    pub fn new(
        evidence: Vec<EvidenceItem>,
        sheet: ProductSheet,
        technical_sheet: String,
        narrative: String,
        fusion_error: Option<EvidenceError>,
    ) -> Self {
        let mut files = Vec::new();
        let mut texts = Vec::new();

        for item in &evidence {
            if item.kind.is_file() {
                files.push(FileReport {
                    filename: item.label.clone(),
                    kind: item.kind,
                    text: item.text.clone(),
                    status: item.status(),
                    error: item.error.clone(),
                });
            } else {
                texts.push(TextReport {
                    kind: item.kind,
                    parsed_info: parsed_info(item),
                    status: item.status(),
                    error: item.error.clone(),
                });
            }
        }

        Self {
            files,
            texts,
            evidence,
            sheet,
            technical_sheet,
            narrative,
            fusion_error,
        }
    }
}

fn parsed_info(item: &EvidenceItem) -> serde_json::Value {
    match (&item.details, &item.error) {
        (Some(EvidenceDetails::Url(info)), _) => serde_json::json!({
            "url": info.url,
            "title": info.title,
            "description": info.description,
        }),
        (Some(EvidenceDetails::Text {
            original_text,
            important_tokens,
        }), _) => serde_json::json!({
            "original_text": original_text,
            "important_tokens": important_tokens,
        }),
        (None, Some(err)) => serde_json::json!({
            "url": item.label,
            "error": err.to_string(),
        }),
        (None, None) => serde_json::json!({ "original_text": item.label }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UrlInfo;

    #[test]
    fn test_response_splits_files_and_texts() {
        let evidence = vec![
            EvidenceItem::extracted(SourceKind::Image, "plaque.jpg", "BOSCH 1000W"),
            EvidenceItem::failed(
                SourceKind::Url,
                "https://unreachable.invalid",
                EvidenceError::NetworkFetchFailure("dns".to_string()),
            ),
            EvidenceItem::extracted(SourceKind::Text, "Puissance 1000W", "Puissance 1000W")
                .with_details(EvidenceDetails::Text {
                    original_text: "Puissance 1000W".to_string(),
                    important_tokens: vec!["Puissance".to_string(), "1000W".to_string()],
                }),
        ];

        let resp = AnalysisResponse::new(
            evidence,
            ProductSheet::default(),
            String::new(),
            String::new(),
            None,
        );

        assert_eq!(resp.files.len(), 1);
        assert_eq!(resp.texts.len(), 2);
        assert_eq!(resp.evidence.len(), 3);
        assert_eq!(resp.texts[0].parsed_info["url"], "https://unreachable.invalid");
        assert!(resp.texts[0].parsed_info["error"]
            .as_str()
            .unwrap()
            .contains("dns"));
        assert_eq!(resp.texts[1].parsed_info["important_tokens"][1], "1000W");
    }

    #[test]
    fn test_url_parsed_info() {
        let item = EvidenceItem::extracted(SourceKind::Url, "https://example.com", "Example")
            .with_details(EvidenceDetails::Url(UrlInfo {
                url: "https://example.com".to_string(),
                title: "Example".to_string(),
                description: None,
            }));
        let info = parsed_info(&item);
        assert_eq!(info["title"], "Example");
        assert!(info["description"].is_null());
    }
}
