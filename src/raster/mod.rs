//! PDF page rasterization.
//!
//! A [`Rasterizer`] opens a PDF once to learn its page count, then converts
//! individual pages to pixel buffers on demand. Pages are independent, so
//! callers may rasterize several at once.

#[cfg(feature = "raster-mupdf")]
mod mupdf_raster;
mod poppler;

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::DynamicImage;
use thiserror::Error;

#[cfg(feature = "raster-mupdf")]
pub use mupdf_raster::MupdfRasterizer;
pub use poppler::PopplerRasterizer;

const PDF_MIME: &str = "application/pdf";

/// Errors that can occur while opening or rasterizing a PDF.
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("PDF file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Not a PDF file: {}", .0.display())]
    NotAPdf(PathBuf),

    #[error("External tool not found: {0}")]
    ToolNotFound(String),

    #[error("Cannot open PDF: {0}")]
    OpenFailed(String),

    #[error("Page {page} conversion failed: {reason}")]
    ConversionFailed { page: u32, reason: String },

    #[error("Invalid DPI: {0}")]
    InvalidDpi(u32),

    #[error("Image error: {0}")]
    ImageError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// An opened PDF. The page count is fixed for the lifetime of the value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfDocument {
    path: PathBuf,
    page_count: u32,
}

impl PdfDocument {
    pub fn new(path: impl Into<PathBuf>, page_count: u32) -> Self {
        Self {
            path: path.into(),
            page_count,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Page indices in ascending order, 1-based.
    pub fn pages(&self) -> impl Iterator<Item = u32> {
        1..=self.page_count
    }
}

/// A rendered page. Lives only as long as one recognition call needs it.
#[derive(Debug, Clone)]
pub struct RasterImage {
    pub page: u32,
    pub dpi: u32,
    pub image: DynamicImage,
}

impl RasterImage {
    pub fn new(page: u32, dpi: u32, image: DynamicImage) -> Self {
        Self { page, dpi, image }
    }
}

/// Converts PDF pages into raster images.
pub trait Rasterizer: Send + Sync {
    /// Open a PDF and determine its page count.
    ///
    /// Errors here are fatal for a run: the file is missing, is not a PDF,
    /// or the rasterizer tooling is unusable.
    fn open(&self, path: &Path) -> Result<PdfDocument, RasterError>;

    /// Rasterize one page (1-based) at the given DPI.
    fn rasterize_page(
        &self,
        document: &PdfDocument,
        page: u32,
        dpi: u32,
    ) -> Result<RasterImage, RasterError>;
}

/// The rasterizer this build prefers: MuPDF in-process when compiled in,
/// otherwise Poppler's `pdfinfo`/`pdftoppm`.
pub fn default_rasterizer() -> Arc<dyn Rasterizer> {
    #[cfg(feature = "raster-mupdf")]
    {
        tracing::debug!("Rasterizing with MuPDF");
        Arc::new(MupdfRasterizer::new())
    }
    #[cfg(not(feature = "raster-mupdf"))]
    {
        tracing::debug!("Rasterizing with Poppler");
        Arc::new(PopplerRasterizer::new())
    }
}

/// Name of the rasterizer [`default_rasterizer`] returns.
pub fn default_rasterizer_name() -> &'static str {
    if cfg!(feature = "raster-mupdf") {
        "mupdf"
    } else {
        "poppler"
    }
}

/// Check that `path` is an existing file with a PDF signature.
pub(crate) fn check_pdf_file(path: &Path) -> Result<(), RasterError> {
    if !path.is_file() {
        return Err(RasterError::FileNotFound(path.to_path_buf()));
    }

    let mut file = File::open(path)?;
    let mut buffer = [0u8; 8192];
    let bytes_read = file.read(&mut buffer)?;

    match infer::get(&buffer[..bytes_read]) {
        Some(kind) if kind.mime_type() == PDF_MIME => Ok(()),
        _ => Err(RasterError::NotAPdf(path.to_path_buf())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_check_pdf_file() {
        let dir = TempDir::new().unwrap();
        let pdf = dir.path().join("doc.pdf");
        std::fs::write(&pdf, b"%PDF-1.4\n%%EOF\n").unwrap();
        assert!(check_pdf_file(&pdf).is_ok());

        let text = dir.path().join("doc.txt");
        std::fs::write(&text, b"hello").unwrap();
        assert!(matches!(check_pdf_file(&text), Err(RasterError::NotAPdf(_))));

        assert!(matches!(
            check_pdf_file(&dir.path().join("missing.pdf")),
            Err(RasterError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_default_rasterizer_name() {
        let expected = if cfg!(feature = "raster-mupdf") { "mupdf" } else { "poppler" };
        assert_eq!(default_rasterizer_name(), expected);
    }
}
