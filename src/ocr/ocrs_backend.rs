//! OCRS OCR backend implementation.
//!
//! Uses the ocrs crate for pure-Rust neural OCR without external binaries.
//! Models are automatically downloaded on first use from:
//! https://ocrs-models.s3-accelerate.amazonaws.com/

use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Instant;

use ocrs::TextItem;

use super::backend::{join_lines, Availability, OcrBackend, OcrBackendType, OcrError, RecognizedLine};
use super::language::Languages;
use super::model_utils::{
    ensure_models_present, model_availability_hint, ModelDirConfig, ModelSpec,
};
use crate::raster::RasterImage;

/// Model directory configuration for OCRS.
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

/// Languages covered by the Latin-alphabet recognition model.
const SUPPORTED_LANGUAGES: &[&str] = &["en", "it", "fr", "de", "es", "pt", "nl"];

/// OCRS OCR backend (pure Rust).
pub struct OcrsBackend {
    model_path: Option<PathBuf>,
    use_gpu: bool,
    languages: Languages,
    engine: OnceLock<ocrs::OcrEngine>,
}

impl OcrsBackend {
    /// Create a new OCRS backend for the given languages.
    pub fn new(languages: Languages) -> Self {
        Self {
            model_path: None,
            use_gpu: false,
            languages,
            engine: OnceLock::new(),
        }
    }

    /// Look for (and download into) a specific model directory.
    pub fn with_model_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = Some(path.into());
        self
    }

    /// Request GPU execution. Inference still runs on the CPU via rten, but
    /// the backend then allows only one recognition call at a time.
    pub fn with_gpu(mut self, use_gpu: bool) -> Self {
        self.use_gpu = use_gpu;
        self
    }

    /// Human-readable model location hint.
    pub fn availability_hint(&self) -> String {
        model_availability_hint(self.model_path.as_deref(), &MODEL_CONFIG, "OCRS", "12 MB")
    }

    /// Validate the languages without loading the engine or downloading
    /// models. Returns the model location hint on success.
    pub fn check_settings(&self) -> Result<String, OcrError> {
        Self::check_languages(&self.languages)?;
        Ok(self.availability_hint())
    }

    fn check_languages(languages: &Languages) -> Result<(), OcrError> {
        let unsupported: Vec<String> = languages
            .iter()
            .filter(|code| {
                code.iso_code()
                    .map(|iso| !SUPPORTED_LANGUAGES.contains(&iso))
                    .unwrap_or(true)
            })
            .map(|code| code.to_string())
            .collect();

        if unsupported.is_empty() {
            Ok(())
        } else {
            Err(OcrError::UnsupportedLanguage(format!(
                "ocrs has no model for: {}",
                unsupported.join(", ")
            )))
        }
    }

    /// Get or initialize the cached OCR engine.
    fn get_or_init_engine(&self) -> Result<&ocrs::OcrEngine, OcrError> {
        if let Some(engine) = self.engine.get() {
            return Ok(engine);
        }

        let model_dir = ensure_models_present(
            self.model_path.as_deref(),
            &MODEL_CONFIG,
            &[&DETECTION_MODEL, &RECOGNITION_MODEL],
        )?;

        let detection_path = model_dir.join(DETECTION_MODEL.filename);
        let recognition_path = model_dir.join(RECOGNITION_MODEL.filename);

        let detection_model = rten::Model::load_file(&detection_path).map_err(|e| {
            OcrError::ModelNotFound(format!("failed to load detection model: {}", e))
        })?;
        let recognition_model = rten::Model::load_file(&recognition_path).map_err(|e| {
            OcrError::ModelNotFound(format!("failed to load recognition model: {}", e))
        })?;

        let engine = ocrs::OcrEngine::new(ocrs::OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|e| OcrError::OcrFailed(format!("failed to create OCR engine: {}", e)))?;

        tracing::info!("OCRS engine loaded from {}", model_dir.display());

        // If another thread beat us, keep theirs
        let _ = self.engine.set(engine);
        self.engine
            .get()
            .ok_or_else(|| OcrError::OcrFailed("failed to cache OCR engine".to_string()))
    }

    /// Detect and recognize text lines, keeping geometry.
    pub fn recognize_lines(&self, image: &RasterImage) -> Result<Vec<RecognizedLine>, OcrError> {
        let engine = self.get_or_init_engine()?;

        let rgb = image.image.to_rgb8();
        let (width, height) = rgb.dimensions();
        let source = ocrs::ImageSource::from_bytes(rgb.as_raw(), (width, height))
            .map_err(|e| OcrError::ImageError(format!("failed to convert image: {}", e)))?;

        let input = engine
            .prepare_input(source)
            .map_err(|e| OcrError::OcrFailed(format!("failed to prepare input: {}", e)))?;
        let words = engine
            .detect_words(&input)
            .map_err(|e| OcrError::OcrFailed(format!("word detection failed: {}", e)))?;
        let line_rects = engine.find_text_lines(&input, &words);
        let lines = engine
            .recognize_text(&input, &line_rects)
            .map_err(|e| OcrError::OcrFailed(format!("line recognition failed: {}", e)))?;

        Ok(lines
            .iter()
            .flatten()
            .filter_map(|line| {
                let text = line.to_string();
                if text.trim().is_empty() {
                    return None;
                }
                let rect = line.bounding_rect();
                Some(RecognizedLine {
                    text,
                    confidence: None,
                    bounds: Some((
                        rect.left() as i32,
                        rect.top() as i32,
                        rect.right() as i32,
                        rect.bottom() as i32,
                    )),
                })
            })
            .collect())
    }
}

impl OcrBackend for OcrsBackend {
    fn backend_type(&self) -> OcrBackendType {
        OcrBackendType::Ocrs
    }

    fn probe(&self) -> Availability {
        if let Err(e) = Self::check_languages(&self.languages) {
            return Availability::Unavailable {
                reason: e.to_string(),
            };
        }
        if self.use_gpu {
            tracing::warn!("ocrs runs on CPU; --gpu only serializes recognition");
        }
        match self.get_or_init_engine() {
            Ok(_) => Availability::Available {
                detail: self.availability_hint(),
            },
            Err(e) => Availability::Unavailable {
                reason: e.to_string(),
            },
        }
    }

    fn recognize(&self, image: &RasterImage, languages: &Languages) -> Result<String, OcrError> {
        Self::check_languages(languages)?;

        let start = Instant::now();
        let lines = self.recognize_lines(image)?;
        tracing::debug!(
            "ocrs page {}: {} lines in {}ms",
            image.page,
            lines.len(),
            start.elapsed().as_millis()
        );
        Ok(join_lines(&lines))
    }

    fn max_concurrency(&self, requested: usize) -> usize {
        if self.use_gpu {
            1
        } else {
            requested.max(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gpu_serializes_recognition() {
        let cpu = OcrsBackend::new(Languages::default());
        assert_eq!(cpu.max_concurrency(4), 4);

        let gpu = OcrsBackend::new(Languages::default()).with_gpu(true);
        assert_eq!(gpu.max_concurrency(4), 1);
    }

    #[test]
    fn test_unsupported_language_is_unavailable() {
        let backend = OcrsBackend::new(Languages::parse("chi_sim"));
        match backend.probe() {
            Availability::Unavailable { reason } => assert!(reason.contains("chi_sim")),
            other => panic!("expected unavailable, got {:?}", other),
        }
    }

    #[test]
    fn test_check_settings_rejects_unsupported_language() {
        let backend = OcrsBackend::new(Languages::parse("eng,jpn"));
        let err = backend.check_settings().unwrap_err();
        assert!(matches!(err, OcrError::UnsupportedLanguage(_)));

        let latin = OcrsBackend::new(Languages::parse("eng"));
        assert!(latin.check_settings().is_ok());
        assert!(latin.engine.get().is_none());
    }

    #[test]
    fn test_latin_languages_accepted() {
        assert!(OcrsBackend::check_languages(&Languages::parse("ita,eng,fr")).is_ok());
    }
}
