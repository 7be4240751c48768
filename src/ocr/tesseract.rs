//! Tesseract OCR backend implementation.
//!
//! Uses Tesseract OCR via command-line for text extraction. Each page is
//! written to a temporary PNG and handed to a separate `tesseract` process,
//! so calls can run in parallel.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;
use std::time::Instant;

use tempfile::TempDir;

use super::backend::{Availability, OcrBackend, OcrBackendType, OcrError};
use super::language::Languages;
use crate::raster::RasterImage;

/// Places Tesseract installers put the binary when it is not on PATH.
fn well_known_locations() -> Vec<PathBuf> {
    if cfg!(windows) {
        let mut paths = vec![
            PathBuf::from(r"C:\Program Files\Tesseract-OCR\tesseract.exe"),
            PathBuf::from(r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe"),
        ];
        if let Some(local) = dirs::data_local_dir() {
            paths.push(local.join("Programs").join("Tesseract-OCR").join("tesseract.exe"));
        }
        paths
    } else {
        vec![
            PathBuf::from("/usr/bin/tesseract"),
            PathBuf::from("/usr/local/bin/tesseract"),
            PathBuf::from("/opt/homebrew/bin/tesseract"),
            PathBuf::from("/opt/local/bin/tesseract"),
        ]
    }
}

/// Extract the version number from `tesseract --version` output.
fn parse_version(output: &str) -> Option<String> {
    output
        .lines()
        .find(|line| line.trim_start().starts_with("tesseract"))
        .and_then(|line| line.split_whitespace().nth(1))
        .map(|v| v.trim_start_matches('v').to_string())
}

/// Tesseract OCR backend.
pub struct TesseractBackend {
    binary_override: Option<PathBuf>,
    binary: OnceLock<Option<PathBuf>>,
}

impl TesseractBackend {
    /// Create a new Tesseract backend that searches the usual locations.
    pub fn new() -> Self {
        Self {
            binary_override: None,
            binary: OnceLock::new(),
        }
    }

    /// Use a specific tesseract binary when it exists.
    pub fn with_binary_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.binary_override = Some(path.into());
        self
    }

    /// Locate the tesseract binary.
    ///
    /// Order: the configured override when it exists, then `PATH`, then the
    /// well-known install locations. An existing override always wins, even
    /// over a standard install; a missing one is logged and skipped.
    pub fn locate(&self) -> Option<&Path> {
        self.binary
            .get_or_init(|| {
                if let Some(ref path) = self.binary_override {
                    if path.is_file() {
                        return Some(path.clone());
                    }
                    tracing::warn!(
                        "Configured tesseract path {} does not exist, searching defaults",
                        path.display()
                    );
                }
                which::which("tesseract")
                    .ok()
                    .or_else(|| well_known_locations().into_iter().find(|p| p.is_file()))
            })
            .as_deref()
    }

    /// Query the binary's version string.
    pub fn version(&self) -> Result<String, OcrError> {
        let binary = self.locate().ok_or_else(|| {
            OcrError::BackendNotAvailable(
                "Tesseract not installed. Install with: apt install tesseract-ocr".to_string(),
            )
        })?;

        let output = Command::new(binary).arg("--version").output()?;
        if !output.status.success() {
            return Err(OcrError::BackendNotAvailable(format!(
                "{} --version exited with {}",
                binary.display(),
                output.status
            )));
        }

        // Tesseract 3.x prints its version to stderr
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        parse_version(&stdout)
            .or_else(|| parse_version(&stderr))
            .ok_or_else(|| {
                OcrError::BackendNotAvailable(format!(
                    "could not read version from {}",
                    binary.display()
                ))
            })
    }

    /// Run Tesseract on an image file.
    fn run_tesseract(&self, image_path: &Path, languages: &Languages) -> Result<String, OcrError> {
        let binary = self.locate().ok_or_else(|| {
            OcrError::BackendNotAvailable("tesseract not found (install tesseract-ocr)".to_string())
        })?;

        let output = Command::new(binary)
            .arg(image_path)
            .arg("stdout")
            .args(["-l", &languages.tesseract_arg()])
            .output();

        match output {
            Ok(output) => {
                if output.status.success() {
                    Ok(String::from_utf8_lossy(&output.stdout).to_string())
                } else {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    Err(OcrError::OcrFailed(format!("tesseract failed: {}", stderr.trim())))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(
                OcrError::BackendNotAvailable("tesseract not found (install tesseract-ocr)".to_string()),
            ),
            Err(e) => Err(OcrError::Io(e)),
        }
    }
}

impl Default for TesseractBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrBackend for TesseractBackend {
    fn backend_type(&self) -> OcrBackendType {
        OcrBackendType::Tesseract
    }

    fn probe(&self) -> Availability {
        match self.version() {
            Ok(version) => Availability::Available {
                detail: format!(
                    "tesseract {} at {}",
                    version,
                    self.locate().map(|p| p.display().to_string()).unwrap_or_default()
                ),
            },
            Err(e) => Availability::Unavailable {
                reason: e.to_string(),
            },
        }
    }

    fn recognize(&self, image: &RasterImage, languages: &Languages) -> Result<String, OcrError> {
        let start = Instant::now();

        let temp_dir = TempDir::new()?;
        let image_path = temp_dir.path().join(format!("page-{}.png", image.page));
        image
            .image
            .save(&image_path)
            .map_err(|e| OcrError::ImageError(format!("failed to write page image: {}", e)))?;

        let text = self.run_tesseract(&image_path, languages)?;
        tracing::debug!(
            "tesseract page {}: {} chars in {}ms",
            image.page,
            text.len(),
            start.elapsed().as_millis()
        );
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version() {
        let out = "tesseract 5.3.0\n leptonica-1.82.0\n  libgif 5.2.1\n";
        assert_eq!(parse_version(out), Some("5.3.0".to_string()));
        assert_eq!(parse_version("tesseract v4.1.1\n"), Some("4.1.1".to_string()));
        assert_eq!(parse_version("leptonica-1.82.0"), None);
    }

    #[test]
    fn test_missing_override_falls_back() {
        let backend = TesseractBackend::new().with_binary_path("/no/such/tesseract");
        // Either a system tesseract is found, or nothing is; never the bogus path
        assert_ne!(backend.locate(), Some(Path::new("/no/such/tesseract")));
    }

    #[test]
    fn test_existing_override_wins() {
        let dir = tempfile::TempDir::new().unwrap();
        let pinned = dir.path().join("tesseract");
        std::fs::write(&pinned, b"").unwrap();

        let backend = TesseractBackend::new().with_binary_path(&pinned);
        assert_eq!(backend.locate(), Some(pinned.as_path()));
    }

    #[test]
    fn test_well_known_locations_not_empty() {
        assert!(!well_known_locations().is_empty());
    }
}
