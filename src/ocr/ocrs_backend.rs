//! OCRS OCR backend implementation.
//!
//! Pure-Rust neural recognizer for scene text (labels photographed at an
//! angle, embossed plates). Models are downloaded on first load from
//! https://ocrs-models.s3-accelerate.amazonaws.com/ and the engine is built
//! once, then shared by every request.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use image::{DynamicImage, GrayImage};
use tracing::info;

use super::backend::{OcrBackend, OcrBackendType, OcrError, OcrResult};
use super::model_utils::{ensure_model_file, ModelDirConfig, ModelSpec};

const MODEL_CONFIG: ModelDirConfig = ModelDirConfig {
    subdir: "ocrs",
    required_files: &["text-detection.rten", "text-recognition.rten"],
};

const DETECTION_MODEL: ModelSpec = ModelSpec {
    url: "https://ocrs-models.s3-accelerate.amazonaws.com/text-detection.rten",
    filename: "text-detection.rten",
    size_hint: "2.5 MB",
};

const RECOGNITION_MODEL: ModelSpec = ModelSpec {
    url: "https://ocrs-models.s3-accelerate.amazonaws.com/text-recognition.rten",
    filename: "text-recognition.rten",
    size_hint: "10 MB",
};

/// OCRS OCR backend (pure Rust).
pub struct OcrsBackend {
    engine: Arc<ocrs::OcrEngine>,
    model_dir: PathBuf,
}

impl OcrsBackend {
    /// Locate (or download) the models and build the engine.
    pub async fn load(model_path: Option<PathBuf>) -> Result<Self, OcrError> {
        let model_dir = Self::ensure_models(model_path).await?;
        let dir = model_dir.clone();

        let engine = tokio::task::spawn_blocking(move || {
            let detection_model = rten::Model::load_file(dir.join(DETECTION_MODEL.filename))
                .map_err(|e| {
                    OcrError::ModelNotFound(format!("Failed to load detection model: {}", e))
                })?;
            let recognition_model = rten::Model::load_file(dir.join(RECOGNITION_MODEL.filename))
                .map_err(|e| {
                    OcrError::ModelNotFound(format!("Failed to load recognition model: {}", e))
                })?;

            ocrs::OcrEngine::new(ocrs::OcrEngineParams {
                detection_model: Some(detection_model),
                recognition_model: Some(recognition_model),
                ..Default::default()
            })
            .map_err(|e| OcrError::OcrFailed(format!("Failed to create OCR engine: {}", e)))
        })
        .await
        .map_err(|e| OcrError::OcrFailed(format!("Model loading task failed: {}", e)))??;

        info!("OCRS engine loaded from {:?}", model_dir);
        Ok(Self {
            engine: Arc::new(engine),
            model_dir,
        })
    }

    async fn ensure_models(model_path: Option<PathBuf>) -> Result<PathBuf, OcrError> {
        if let Some(path) = model_path.filter(|p| MODEL_CONFIG.has_required_files(p)) {
            return Ok(path);
        }
        if let Some(dir) = MODEL_CONFIG
            .candidate_dirs()
            .into_iter()
            .find(|dir| MODEL_CONFIG.has_required_files(dir))
        {
            return Ok(dir);
        }

        let model_dir = MODEL_CONFIG.default_dir();
        tokio::fs::create_dir_all(&model_dir).await?;
        ensure_model_file(&DETECTION_MODEL, &model_dir).await?;
        ensure_model_file(&RECOGNITION_MODEL, &model_dir).await?;
        Ok(model_dir)
    }
}

fn run_ocrs(engine: &ocrs::OcrEngine, image: GrayImage) -> Result<String, OcrError> {
    let rgb = DynamicImage::ImageLuma8(image).to_rgb8();
    let (width, height) = rgb.dimensions();

    let source = ocrs::ImageSource::from_bytes(rgb.as_raw(), (width, height))
        .map_err(|e| OcrError::ImageError(format!("Failed to convert image: {}", e)))?;
    let input = engine
        .prepare_input(source)
        .map_err(|e| OcrError::OcrFailed(format!("Failed to prepare input: {}", e)))?;
    engine
        .get_text(&input)
        .map_err(|e| OcrError::OcrFailed(format!("Failed to extract text: {}", e)))
}

#[async_trait]
impl OcrBackend for OcrsBackend {
    fn backend_type(&self) -> OcrBackendType {
        OcrBackendType::Ocrs
    }

    fn is_available(&self) -> bool {
        // Models are loaded before the backend can be constructed.
        true
    }

    fn availability_hint(&self) -> String {
        format!("OCRS models loaded from {:?}", self.model_dir)
    }

    async fn ocr_image(&self, image: &GrayImage) -> Result<OcrResult, OcrError> {
        let start = Instant::now();
        let engine = Arc::clone(&self.engine);
        let image = image.clone();

        let text = tokio::task::spawn_blocking(move || run_ocrs(&engine, image))
            .await
            .map_err(|e| OcrError::OcrFailed(format!("OCR task failed: {}", e)))??;

        Ok(OcrResult {
            text,
            confidence: None,
            backend: OcrBackendType::Ocrs,
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}
