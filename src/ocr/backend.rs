//! OCR backend abstraction.
//!
//! Two interchangeable engines sit behind [`OcrBackend`]:
//! - Tesseract: classical OCR via the command-line binary (CPU)
//! - Ocrs: pure Rust neural OCR with auto-downloaded models (feature: ocr-ocrs)
//!
//! The page processor only ever talks to the trait, so the engine is a
//! configuration-time choice.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::language::Languages;
use crate::raster::RasterImage;

/// Errors from OCR backends.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    ImageError(String),
}

/// Available OCR backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrBackendType {
    /// Tesseract OCR via command-line.
    #[default]
    Tesseract,
    /// Pure Rust OCR engine (ocrs crate).
    Ocrs,
}

impl OcrBackendType {
    pub const ALL: [OcrBackendType; 2] = [OcrBackendType::Tesseract, OcrBackendType::Ocrs];

    pub fn as_str(&self) -> &'static str {
        match self {
            OcrBackendType::Tesseract => "tesseract",
            OcrBackendType::Ocrs => "ocrs",
        }
    }
}

impl FromStr for OcrBackendType {
    type Err = OcrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tesseract" | "classical" => Ok(OcrBackendType::Tesseract),
            "ocrs" | "neural" => Ok(OcrBackendType::Ocrs),
            other => Err(OcrError::BackendNotAvailable(format!(
                "unknown backend '{}'. Available: tesseract, ocrs",
                other
            ))),
        }
    }
}

impl fmt::Display for OcrBackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of a backend availability probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    /// Backend is ready; `detail` describes what was found (version, model dir).
    Available { detail: String },
    /// Backend cannot run; `reason` says what is missing.
    Unavailable { reason: String },
}

/// A single recognized text line with optional geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedLine {
    pub text: String,
    /// Confidence score (0.0 - 1.0), if the engine reports one.
    pub confidence: Option<f32>,
    /// Bounding box as (left, top, right, bottom) in image pixels.
    pub bounds: Option<(i32, i32, i32, i32)>,
}

/// Collapse recognized lines to plain text, one line per row.
pub fn join_lines(lines: &[RecognizedLine]) -> String {
    lines
        .iter()
        .map(|line| line.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Trait for OCR backends.
pub trait OcrBackend: Send + Sync {
    /// Get the backend type.
    fn backend_type(&self) -> OcrBackendType;

    /// Check that the backend can run, without processing any page.
    ///
    /// May be expensive: the neural backend loads (and on first use downloads)
    /// its models here.
    fn probe(&self) -> Availability;

    /// Recognize text in a page image.
    ///
    /// Returns an empty string when no text is detected.
    fn recognize(&self, image: &RasterImage, languages: &Languages) -> Result<String, OcrError>;

    /// Upper bound on concurrent `recognize` calls this backend tolerates.
    fn max_concurrency(&self, requested: usize) -> usize {
        requested.max(1)
    }
}
