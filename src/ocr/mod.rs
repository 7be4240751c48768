//! OCR module.
//!
//! Recognizes text in rasterized pages using:
//! - Tesseract OCR via its command-line binary (default)
//! - OCRS for pure-Rust neural OCR (feature: ocr-ocrs)
//!
//! Use [`build_backend`] to turn configuration into a ready backend.

mod backend;
mod language;
mod model_utils;
mod tesseract;

#[cfg(feature = "ocr-ocrs")]
mod ocrs_backend;

use std::sync::Arc;

pub use backend::{
    join_lines, Availability, OcrBackend, OcrBackendType, OcrError, RecognizedLine,
};
pub use language::{LanguageCode, Languages};
pub use tesseract::TesseractBackend;

#[cfg(feature = "ocr-ocrs")]
pub use ocrs_backend::OcrsBackend;

use crate::config::ExtractConfig;

/// Construct the backend selected by the configuration.
///
/// Construction is cheap; expensive setup (model download, engine load)
/// happens in [`OcrBackend::probe`].
pub fn build_backend(config: &ExtractConfig) -> Result<Arc<dyn OcrBackend>, OcrError> {
    match config.backend {
        OcrBackendType::Tesseract => {
            let mut backend = TesseractBackend::new();
            if let Some(ref path) = config.tesseract_path {
                backend = backend.with_binary_path(path);
            }
            Ok(Arc::new(backend))
        }
        #[cfg(feature = "ocr-ocrs")]
        OcrBackendType::Ocrs => {
            let mut backend = OcrsBackend::new(config.languages.clone()).with_gpu(config.gpu);
            if let Some(ref dir) = config.model_dir {
                backend = backend.with_model_dir(dir);
            }
            Ok(Arc::new(backend))
        }
        #[cfg(not(feature = "ocr-ocrs"))]
        OcrBackendType::Ocrs => Err(OcrError::BackendNotAvailable(
            "OCRS not compiled (enable ocr-ocrs feature)".to_string(),
        )),
    }
}
