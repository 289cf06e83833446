//! End-to-end analysis: aggregate, fuse, parse.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use super::aggregator::EvidenceAggregator;
use super::fusion::FusionOrchestrator;
use super::narrative::NarrativeParser;
use crate::config::{OcrSettings, Settings};
use crate::llm::LlmClient;
use crate::models::{AnalysisRequest, AnalysisResponse};
use crate::ocr::{ImagePreprocessor, OcrManager, PdfTextExtractor, PopplerToolchain, TesseractBackend};
use crate::scrapers::UrlScraper;

/// Errors that fail a whole analysis.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Request contains no files and no texts")]
    EmptyRequest,
}

/// The full extraction and fusion pipeline.
pub struct AnalysisPipeline {
    aggregator: EvidenceAggregator,
    fusion: FusionOrchestrator,
    parser: NarrativeParser,
}

impl AnalysisPipeline {
    pub fn new(aggregator: EvidenceAggregator, fusion: FusionOrchestrator) -> Self {
        Self {
            aggregator,
            fusion,
            parser: NarrativeParser,
        }
    }

    /// Assemble the production pipeline from settings.
    pub async fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let ocr = build_ocr_manager(&settings.ocr).await;

        let toolchain = PopplerToolchain::new(
            &settings.ocr.language,
            Duration::from_secs(settings.pdf.text_timeout_secs),
            Duration::from_secs(settings.pdf.ocr_timeout_secs),
        );
        let mut pdf = PdfTextExtractor::new(Arc::new(toolchain));
        if let Some(ref dir) = settings.pdf.scratch_dir {
            pdf = pdf.with_scratch_dir(dir);
        }

        let scraper = UrlScraper::new(
            Duration::from_secs(settings.scrape.timeout_secs),
            settings.scrape.user_agent.as_deref(),
        )?;

        let aggregator = EvidenceAggregator::new(
            ImagePreprocessor::new(settings.ocr.profile),
            Arc::new(ocr),
            pdf,
            scraper,
        )
        .with_max_concurrency(settings.pipeline.max_concurrency);

        let client = LlmClient::new(settings.llm.clone())?;
        let fusion = FusionOrchestrator::new(Arc::new(client), &settings.llm.model)
            .with_system_prompt(settings.llm.get_system_prompt());

        Ok(Self::new(aggregator, fusion))
    }

    /// Analyze one batch. Only an empty request is an error; every other
    /// failure is reported inside the response.
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse, PipelineError> {
        if request.is_empty() {
            return Err(PipelineError::EmptyRequest);
        }

        let evidence = self.aggregator.aggregate(request).await;
        let fusion = self.fusion.fuse(&evidence).await;
        let parsed = self.parser.parse(&fusion.narrative);
        let technical_sheet = parsed.technical_sheet.clone();
        let sheet = parsed.into_sheet(&fusion.narrative);

        info!(
            "Analysis complete: {} evidence items, {} known attributes",
            evidence.len(),
            sheet.known_attributes()
        );

        Ok(AnalysisResponse::new(
            evidence,
            sheet,
            technical_sheet,
            fusion.narrative,
            fusion.error,
        ))
    }
}

/// Register the OCR engines for the configured settings.
///
/// Tesseract is always registered. The neural engine is loaded only when it
/// is the selected engine; if loading fails the engine stays unregistered
/// and image items report the failure.
pub async fn build_ocr_manager(settings: &OcrSettings) -> OcrManager {
    let timeout = Duration::from_secs(settings.timeout_secs);
    let mut manager = OcrManager::new(settings.engine, timeout);
    manager.register(Arc::new(TesseractBackend::new(
        &settings.language,
        settings.page_segmentation,
        timeout,
    )));

    #[cfg(feature = "ocr-ocrs")]
    if settings.engine == crate::ocr::OcrBackendType::Ocrs {
        match crate::ocr::OcrsBackend::load(settings.model_path.clone()).await {
            Ok(backend) => manager.register(Arc::new(backend)),
            Err(e) => tracing::warn!("OCRS engine could not be loaded: {}", e),
        }
    }

    manager
}
