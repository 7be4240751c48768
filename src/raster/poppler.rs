//! Rasterizer backed by Poppler's `pdfinfo` and `pdftoppm` tools.

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

use super::{check_pdf_file, PdfDocument, RasterError, RasterImage, Rasterizer};

/// Handle command output, extracting stdout on success or returning appropriate error.
fn handle_cmd_output(
    result: std::io::Result<std::process::Output>,
    tool_name: &str,
) -> Result<String, String> {
    match result {
        Ok(output) => {
            if output.status.success() {
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            } else {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(format!("{} failed: {}", tool_name, stderr.trim()))
            }
        }
        Err(e) => Err(format!("{}: {}", tool_name, e)),
    }
}

/// Parse the `Pages:` line of `pdfinfo` output.
fn parse_page_count(pdfinfo_stdout: &str) -> Option<u32> {
    pdfinfo_stdout
        .lines()
        .find(|line| line.starts_with("Pages:"))
        .and_then(|line| line.split(':').nth(1))
        .and_then(|count| count.trim().parse().ok())
}

/// Rasterizer that shells out to Poppler.
#[derive(Debug, Clone)]
pub struct PopplerRasterizer {
    pdfinfo: PathBuf,
    pdftoppm: PathBuf,
}

impl Default for PopplerRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl PopplerRasterizer {
    /// Use `pdfinfo` and `pdftoppm` from `PATH`.
    pub fn new() -> Self {
        Self {
            pdfinfo: PathBuf::from("pdfinfo"),
            pdftoppm: PathBuf::from("pdftoppm"),
        }
    }

    /// Report which Poppler tools can be found.
    pub fn check_tools(&self) -> Vec<(String, bool)> {
        [&self.pdfinfo, &self.pdftoppm]
            .iter()
            .map(|tool| (tool.display().to_string(), which::which(tool).is_ok()))
            .collect()
    }

    fn tool_missing(tool: &Path, e: &std::io::Error) -> bool {
        e.kind() == std::io::ErrorKind::NotFound && which::which(tool).is_err()
    }
}

impl Rasterizer for PopplerRasterizer {
    fn open(&self, path: &Path) -> Result<PdfDocument, RasterError> {
        check_pdf_file(path)?;

        let output = Command::new(&self.pdfinfo).arg(path).output();
        if let Err(ref e) = output {
            if Self::tool_missing(&self.pdfinfo, e) {
                return Err(RasterError::ToolNotFound(
                    "pdfinfo (install poppler-utils)".to_string(),
                ));
            }
        }
        let stdout = handle_cmd_output(output, "pdfinfo").map_err(RasterError::OpenFailed)?;

        let page_count = parse_page_count(&stdout).ok_or_else(|| {
            RasterError::OpenFailed(format!("no page count reported for {}", path.display()))
        })?;

        tracing::debug!("Opened {} ({} pages)", path.display(), page_count);
        Ok(PdfDocument::new(path, page_count))
    }

    fn rasterize_page(
        &self,
        document: &PdfDocument,
        page: u32,
        dpi: u32,
    ) -> Result<RasterImage, RasterError> {
        if dpi == 0 {
            return Err(RasterError::InvalidDpi(dpi));
        }

        let temp_dir = TempDir::new()?;
        let output_prefix = temp_dir.path().join("page");
        let page_str = page.to_string();
        let dpi_str = dpi.to_string();

        // -singlefile writes exactly <prefix>.png with no page-number suffix
        let status = Command::new(&self.pdftoppm)
            .args(["-png", "-singlefile", "-r", &dpi_str, "-f", &page_str, "-l", &page_str])
            .arg(document.path())
            .arg(&output_prefix)
            .output();

        if let Err(ref e) = status {
            if Self::tool_missing(&self.pdftoppm, e) {
                return Err(RasterError::ToolNotFound(
                    "pdftoppm (install poppler-utils)".to_string(),
                ));
            }
        }
        handle_cmd_output(status, "pdftoppm")
            .map_err(|reason| RasterError::ConversionFailed { page, reason })?;

        let image_path = output_prefix.with_extension("png");
        if !image_path.exists() {
            return Err(RasterError::ConversionFailed {
                page,
                reason: "no image generated".to_string(),
            });
        }

        let image = image::open(&image_path)
            .map_err(|e| RasterError::ImageError(format!("page {}: {}", page, e)))?;

        tracing::debug!(
            "Rasterized page {} at {} DPI ({}x{})",
            page,
            dpi,
            image.width(),
            image.height()
        );
        Ok(RasterImage::new(page, dpi, image))
    }
}
