//! Downloading and locating OCR models.

// Model helpers are only used when the ocr-ocrs feature is enabled
#![cfg_attr(not(feature = "ocr-ocrs"), allow(dead_code))]

use std::path::{Path, PathBuf};
use std::process::Command;

use super::backend::OcrError;

/// Model file specification for downloading.
pub struct ModelSpec {
    /// URL to download from.
    pub url: &'static str,
    /// Filename to save as.
    pub filename: &'static str,
    /// Human-readable size for progress messages.
    pub size_hint: &'static str,
}

/// Configuration for model directory management.
pub struct ModelDirConfig {
    /// Subdirectory name under data_dir (e.g., "ocrs").
    pub subdir: &'static str,
    /// Required model files to check for presence.
    pub required_files: &'static [&'static str],
}

impl ModelDirConfig {
    /// Get the default model directory for this backend.
    pub fn default_dir(&self) -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
            .join(self.subdir)
            .join("models")
    }

    /// Get standard candidate directories to search for models.
    pub fn candidate_dirs(&self) -> Vec<PathBuf> {
        [
            dirs::data_dir().map(|d| d.join(self.subdir).join("models")),
            dirs::cache_dir().map(|d| d.join(self.subdir)),
            dirs::home_dir().map(|d| d.join(format!(".{}", self.subdir)).join("models")),
            Some(PathBuf::from(format!("/usr/share/{}/models", self.subdir))),
            Some(PathBuf::from(format!("./models/{}", self.subdir))),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Check if a directory contains all required model files.
    pub fn has_required_files(&self, dir: &Path) -> bool {
        self.required_files
            .iter()
            .all(|file| dir.join(file).exists())
    }
}

/// Download a file from a URL to a local path using curl or wget.
pub fn download_file(url: &str, dest: &Path) -> Result<(), OcrError> {
    let status = Command::new("curl")
        .args(["-fSL", "--silent", "--show-error", "-o"])
        .arg(dest)
        .arg(url)
        .status();

    match status {
        Ok(status) if status.success() => Ok(()),
        Ok(_) => {
            let _ = std::fs::remove_file(dest);
            Err(OcrError::ModelNotFound(format!("failed to download {}", url)))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            // Try wget as fallback
            let status = Command::new("wget")
                .args(["-q", "-O"])
                .arg(dest)
                .arg(url)
                .status();

            match status {
                Ok(status) if status.success() => Ok(()),
                Ok(_) => {
                    let _ = std::fs::remove_file(dest);
                    Err(OcrError::ModelNotFound(format!("failed to download {}", url)))
                }
                Err(_) => Err(OcrError::BackendNotAvailable(
                    "Neither curl nor wget found. Install one to download models.".to_string(),
                )),
            }
        }
        Err(e) => Err(OcrError::Io(e)),
    }
}

/// Download a model file if it doesn't exist.
pub fn ensure_model_file(spec: &ModelSpec, model_dir: &Path) -> Result<(), OcrError> {
    let dest = model_dir.join(spec.filename);
    if !dest.exists() {
        tracing::warn!("Downloading {} (~{})...", spec.filename, spec.size_hint);
        download_file(spec.url, &dest)?;
        tracing::info!("Downloaded {} to {}", spec.filename, model_dir.display());
    }
    Ok(())
}

/// Find model directory by checking config path first, then standard locations.
pub fn find_model_dir(config_path: Option<&Path>, model_config: &ModelDirConfig) -> Option<PathBuf> {
    if let Some(path) = config_path {
        if model_config.has_required_files(path) {
            return Some(path.to_path_buf());
        }
    }

    model_config
        .candidate_dirs()
        .into_iter()
        .find(|dir| model_config.has_required_files(dir))
}

/// Ensure models are present, downloading if necessary.
///
/// Downloads go to the configured path when one is given, otherwise to the
/// backend's default data directory.
pub fn ensure_models_present(
    config_path: Option<&Path>,
    model_config: &ModelDirConfig,
    model_specs: &[&ModelSpec],
) -> Result<PathBuf, OcrError> {
    if let Some(dir) = find_model_dir(config_path, model_config) {
        return Ok(dir);
    }

    let model_dir = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| model_config.default_dir());
    std::fs::create_dir_all(&model_dir)?;

    for spec in model_specs {
        ensure_model_file(spec, &model_dir)?;
    }

    Ok(model_dir)
}

/// Format availability hint for a model-based backend.
pub fn model_availability_hint(
    config_path: Option<&Path>,
    model_config: &ModelDirConfig,
    backend_name: &str,
    total_size: &str,
) -> String {
    match find_model_dir(config_path, model_config) {
        Some(path) => format!("{} models found at {}", backend_name, path.display()),
        None => format!(
            "{} models will be auto-downloaded on first use (~{}) to {}",
            backend_name,
            total_size,
            config_path
                .map(Path::to_path_buf)
                .unwrap_or_else(|| model_config.default_dir())
                .display()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TEST_CONFIG: ModelDirConfig = ModelDirConfig {
        subdir: "scanocr-test-models",
        required_files: &["a.rten", "b.rten"],
    };

    #[test]
    fn test_has_required_files() {
        let dir = TempDir::new().unwrap();
        assert!(!TEST_CONFIG.has_required_files(dir.path()));

        std::fs::write(dir.path().join("a.rten"), b"x").unwrap();
        assert!(!TEST_CONFIG.has_required_files(dir.path()));

        std::fs::write(dir.path().join("b.rten"), b"x").unwrap();
        assert!(TEST_CONFIG.has_required_files(dir.path()));
    }

    #[test]
    fn test_find_model_dir_prefers_config_path() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.rten"), b"x").unwrap();
        std::fs::write(dir.path().join("b.rten"), b"x").unwrap();

        let found = find_model_dir(Some(dir.path()), &TEST_CONFIG);
        assert_eq!(found.as_deref(), Some(dir.path()));
    }

    #[test]
    fn test_ensure_models_present_skips_download_when_found() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.rten"), b"x").unwrap();
        std::fs::write(dir.path().join("b.rten"), b"x").unwrap();

        // No specs: nothing could be downloaded, so success means the lookup hit
        let found = ensure_models_present(Some(dir.path()), &TEST_CONFIG, &[]).unwrap();
        assert_eq!(found, dir.path());
    }

    #[test]
    fn test_hint_mentions_download_target() {
        let dir = TempDir::new().unwrap();
        let hint = model_availability_hint(Some(dir.path()), &TEST_CONFIG, "OCRS", "12 MB");
        assert!(hint.contains("auto-downloaded"));
        assert!(hint.contains("12 MB"));
    }
}
