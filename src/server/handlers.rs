//! API endpoint handlers.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use super::AppState;
use crate::models::{AnalysisRequest, InputFile};
use crate::services::PipelineError;

/// Health check endpoint for container orchestration.
pub async fn health() -> impl IntoResponse {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

/// Analyze one product from a multipart form.
///
/// `files` parts must carry a filename; `texts` fields are URLs or free
/// text. Other fields are ignored.
pub async fn analyse(State(state): State<AppState>, multipart: Multipart) -> Response {
    let request = match read_request(multipart).await {
        Ok(request) => request,
        Err(response) => return response,
    };

    match state.pipeline.analyze(&request).await {
        Ok(analysis) => axum::Json(analysis).into_response(),
        Err(e @ PipelineError::EmptyRequest) => error_response(StatusCode::BAD_REQUEST, e),
    }
}

async fn read_request(mut multipart: Multipart) -> Result<AnalysisRequest, Response> {
    let mut request = AnalysisRequest::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(error_response(e.status(), e.body_text())),
        };

        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "files" => {
                let Some(filename) = field.file_name().map(str::to_string) else {
                    return Err(error_response(
                        StatusCode::BAD_REQUEST,
                        "files part is missing a filename",
                    ));
                };
                let content = field
                    .bytes()
                    .await
                    .map_err(|e| error_response(e.status(), e.body_text()))?;
                debug!("Received file {} ({} bytes)", filename, content.len());
                request.files.push(InputFile::new(filename, content.to_vec()));
            }
            "texts" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| error_response(e.status(), e.body_text()))?;
                request.texts.push(text);
            }
            other => warn!("Ignoring unknown form field: {}", other),
        }
    }

    Ok(request)
}

fn error_response(status: StatusCode, message: impl ToString) -> Response {
    (
        status,
        axum::Json(serde_json::json!({ "error": message.to_string() })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use crate::llm::LlmError;
    use crate::ocr::{
        ImagePreprocessor, OcrBackendType, OcrManager, PdfTextExtractor, PopplerToolchain,
        PreprocessProfile,
    };
    use crate::scrapers::UrlScraper;
    use crate::server::{create_router, AppState};
    use crate::services::{
        AnalysisPipeline, ChatTurn, CompletionService, EvidenceAggregator, FusionOrchestrator,
    };
    use std::time::Duration;

    struct CannedCompletion;

    #[async_trait]
    impl CompletionService for CannedCompletion {
        async fn complete(&self, _model: &str, turns: &[ChatTurn]) -> Result<String, LlmError> {
            Ok(format!(
                "Titre : Perceuse\nDescription : {} evidence turns\nFiche Technique :\n- Marque : Bosch",
                turns.len() - 1
            ))
        }
    }

    async fn spawn_app() -> String {
        let aggregator = EvidenceAggregator::new(
            ImagePreprocessor::new(PreprocessProfile::Enhanced),
            Arc::new(OcrManager::new(OcrBackendType::Tesseract, Duration::from_secs(5))),
            PdfTextExtractor::new(Arc::new(PopplerToolchain::default())),
            UrlScraper::new(Duration::from_secs(2), None).unwrap(),
        );
        let fusion = FusionOrchestrator::new(Arc::new(CannedCompletion), "test-model");
        let state = AppState::with_pipeline(AnalysisPipeline::new(aggregator, fusion));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, create_router(state)).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_health() {
        let base = spawn_app().await;
        let body: serde_json::Value = reqwest::get(format!("{}/health", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_analyse_texts_and_unsupported_file() {
        let base = spawn_app().await;
        let form = reqwest::multipart::Form::new()
            .part(
                "files",
                reqwest::multipart::Part::bytes(b"hello".to_vec()).file_name("notes.docx"),
            )
            .text("texts", "Perceuse sans fil 18V");

        let resp = reqwest::Client::new()
            .post(format!("{}/analyse", base))
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);

        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["files"][0]["filename"], "notes.docx");
        assert_eq!(body["files"][0]["error"]["kind"], "unsupported_input_type");
        assert_eq!(body["texts"][0]["kind"], "text");
        assert_eq!(body["texts"][0]["parsed_info"]["important_tokens"][0], "Perceuse");
        assert_eq!(body["sheet"]["title"], "Perceuse");
        assert_eq!(body["sheet"]["description"], "1 evidence turns");
        assert_eq!(body["sheet"]["brand"], "Bosch");
    }

    #[tokio::test]
    async fn test_empty_form_is_bad_request() {
        let base = spawn_app().await;
        let form = reqwest::multipart::Form::new().text("comment", "nothing here");

        let resp = reqwest::Client::new()
            .post(format!("{}/analyse", base))
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("no files"));
    }
}
