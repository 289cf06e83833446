//! Image normalization ahead of OCR.

use image::{DynamicImage, GrayImage, Luma};
use imageproc::contrast::{adaptive_threshold, equalize_histogram};
use imageproc::filter::{gaussian_blur_f32, median_filter};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::backend::OcrError;

/// Pixels strictly below this become black in the simple profile.
const SIMPLE_THRESHOLD: u8 = 128;

/// Sigma giving an effective 3x3 kernel.
const BLUR_SIGMA: f32 = 0.8;

/// Block radius for adaptive thresholding (25px neighborhood).
const ADAPTIVE_BLOCK_RADIUS: u32 = 12;

/// Preprocessing profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreprocessProfile {
    /// Grayscale then fixed-threshold binarization.
    Simple,
    /// Grayscale, histogram equalization, blur, adaptive threshold, denoise.
    #[default]
    Enhanced,
}

impl PreprocessProfile {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "simple" => Some(Self::Simple),
            "enhanced" => Some(Self::Enhanced),
            _ => None,
        }
    }
}

/// Turns raw images into binarized grayscale images for OCR.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImagePreprocessor {
    profile: PreprocessProfile,
}

impl ImagePreprocessor {
    pub fn new(profile: PreprocessProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> PreprocessProfile {
        self.profile
    }

    /// Decode raw bytes and preprocess them.
    pub fn from_bytes(&self, bytes: &[u8]) -> Result<GrayImage, OcrError> {
        let img = image::load_from_memory(bytes)?;
        Ok(self.preprocess(&img))
    }

    /// Produce a new preprocessed image; the input is left untouched.
    pub fn preprocess(&self, img: &DynamicImage) -> GrayImage {
        let gray = img.to_luma8();
        debug!(
            "Preprocessing {}x{} image ({:?})",
            gray.width(),
            gray.height(),
            self.profile
        );
        match self.profile {
            PreprocessProfile::Simple => binarize(&gray, SIMPLE_THRESHOLD),
            PreprocessProfile::Enhanced => enhance(&gray),
        }
    }
}

fn binarize(gray: &GrayImage, threshold: u8) -> GrayImage {
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        if gray.get_pixel(x, y)[0] < threshold {
            Luma([0])
        } else {
            Luma([255])
        }
    })
}

fn enhance(gray: &GrayImage) -> GrayImage {
    let equalized = equalize_histogram(gray);
    let blurred = gaussian_blur_f32(&equalized, BLUR_SIGMA);
    let thresholded = adaptive_threshold(&blurred, ADAPTIVE_BLOCK_RADIUS);
    median_filter(&thresholded, 1, 1)
}
