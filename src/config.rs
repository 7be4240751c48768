//! Configuration for scanocr.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! environment and command-line overrides (applied by the CLI). The result is
//! an immutable [`ExtractConfig`] shared by every pipeline stage.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ocr::{Languages, OcrBackendType};

/// Config file name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "scanocr.toml";

/// Default rasterization resolution.
pub const DEFAULT_DPI: u32 = 300;

/// Default number of pages rasterized at once.
pub const DEFAULT_RASTERIZATION_CONCURRENCY: usize = 4;

/// Default number of concurrent recognition calls.
pub const DEFAULT_OCR_WORKERS: usize = 2;

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse TOML config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Settings for one extraction run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Rasterization resolution in dots per inch.
    pub dpi: u32,
    /// Languages handed to the OCR engine, in priority order.
    pub languages: Languages,
    /// Which OCR engine to use.
    pub backend: OcrBackendType,
    /// Upper bound on pages rasterized concurrently.
    pub rasterization_concurrency: usize,
    /// Requested concurrent recognition calls (the backend may lower it).
    pub ocr_workers: usize,
    /// Ask the neural backend for GPU execution.
    pub gpu: bool,
    /// Explicit tesseract binary.
    pub tesseract_path: Option<PathBuf>,
    /// Directory holding (or receiving) neural OCR models.
    pub model_dir: Option<PathBuf>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_DPI,
            languages: Languages::default(),
            backend: OcrBackendType::default(),
            rasterization_concurrency: DEFAULT_RASTERIZATION_CONCURRENCY,
            ocr_workers: DEFAULT_OCR_WORKERS,
            gpu: false,
            tesseract_path: None,
            model_dir: None,
        }
    }
}

impl ExtractConfig {
    /// Overlay values present in a config file.
    pub fn merge_file(mut self, file: &FileConfig) -> Self {
        if let Some(dpi) = file.dpi {
            self.dpi = dpi;
        }
        if let Some(ref languages) = file.languages {
            self.languages = Languages::new(languages);
        }
        if let Some(backend) = file.backend {
            self.backend = backend;
        }
        if let Some(n) = file.rasterization_concurrency {
            self.rasterization_concurrency = n;
        }
        if let Some(n) = file.ocr_workers {
            self.ocr_workers = n;
        }
        if let Some(gpu) = file.gpu {
            self.gpu = gpu;
        }
        if let Some(ref path) = file.tesseract_path {
            self.tesseract_path = Some(path.clone());
        }
        if let Some(ref dir) = file.model_dir {
            self.model_dir = Some(dir.clone());
        }
        self
    }

    /// Check invariants. Called once before a run starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dpi == 0 {
            return Err(ConfigError::Invalid("dpi must be a positive integer".into()));
        }
        if self.languages.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one OCR language is required".into(),
            ));
        }
        if self.rasterization_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "rasterization_concurrency must be at least 1".into(),
            ));
        }
        if self.ocr_workers == 0 {
            return Err(ConfigError::Invalid("ocr_workers must be at least 1".into()));
        }
        if self.gpu && self.backend == OcrBackendType::Tesseract {
            tracing::warn!("gpu is ignored by the tesseract backend");
        }
        if !(150..=600).contains(&self.dpi) {
            tracing::warn!(
                "dpi {} is outside the usual 150-600 range for OCR",
                self.dpi
            );
        }
        Ok(())
    }
}

/// Config file contents. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub dpi: Option<u32>,
    pub languages: Option<Vec<String>>,
    pub backend: Option<OcrBackendType>,
    pub rasterization_concurrency: Option<usize>,
    pub ocr_workers: Option<usize>,
    pub gpu: Option<bool>,
    pub tesseract_path: Option<PathBuf>,
    pub model_dir: Option<PathBuf>,
    /// Where the file was loaded from (not part of the file).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl FileConfig {
    /// Load configuration from a specific TOML file.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config: FileConfig =
            toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        // Relative paths in the file are relative to the file itself
        if let Some(base) = path.parent() {
            config.tesseract_path = config.tesseract_path.map(|p| resolve_path(base, p));
            config.model_dir = config.model_dir.map(|p| resolve_path(base, p));
        }
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Candidate config file locations, in lookup order.
    pub fn candidate_paths() -> Vec<PathBuf> {
        [
            Some(PathBuf::from(CONFIG_FILE_NAME)),
            dirs::config_dir().map(|d| d.join("scanocr").join("config.toml")),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Load the explicit file if given, otherwise the first file found in the
    /// standard locations. Missing standard files are not an error.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_from_path(path);
        }

        match Self::candidate_paths().into_iter().find(|p| p.is_file()) {
            Some(path) => {
                tracing::debug!("Using config file {}", path.display());
                Self::load_from_path(&path)
            }
            None => Ok(Self::default()),
        }
    }
}

fn resolve_path(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

/// Input and output locations for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractJob {
    pub input: PathBuf,
    pub output: PathBuf,
}

impl ExtractJob {
    /// Output defaults to the input path with a `.txt` extension.
    pub fn new(input: impl Into<PathBuf>, output: Option<PathBuf>) -> Self {
        let input = input.into();
        let output = output.unwrap_or_else(|| input.with_extension("txt"));
        Self { input, output }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = ExtractConfig::default();
        assert_eq!(config.dpi, 300);
        assert_eq!(config.languages.tesseract_arg(), "ita+eng");
        assert_eq!(config.backend, OcrBackendType::Tesseract);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = ExtractConfig {
            dpi: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = ExtractConfig {
            languages: Languages::parse(""),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ExtractConfig {
            rasterization_concurrency: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_and_merge_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scanocr.toml");
        std::fs::write(
            &path,
            "dpi = 400\nlanguages = [\"it\"]\nbackend = \"ocrs\"\ngpu = true\nmodel_dir = \"models\"\n",
        )
        .unwrap();

        let file = FileConfig::load_from_path(&path).unwrap();
        assert_eq!(file.source_path.as_deref(), Some(path.as_path()));
        assert_eq!(file.model_dir, Some(dir.path().join("models")));

        let config = ExtractConfig::default().merge_file(&file);
        assert_eq!(config.dpi, 400);
        assert_eq!(config.languages.tesseract_arg(), "ita");
        assert_eq!(config.backend, OcrBackendType::Ocrs);
        assert!(config.gpu);
        assert_eq!(config.ocr_workers, DEFAULT_OCR_WORKERS);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "resolution = 300\n").unwrap();
        assert!(matches!(
            FileConfig::load_from_path(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_discover_explicit_missing_is_error() {
        let err = FileConfig::discover(Some(Path::new("/no/such/scanocr.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_job_default_output() {
        let job = ExtractJob::new("scans/report.pdf", None);
        assert_eq!(job.output, PathBuf::from("scans/report.txt"));
    }
}
