//! In-process rasterizer backed by MuPDF (feature: raster-mupdf).
//!
//! Needs no external tools. MuPDF contexts are not thread-safe, so every
//! call opens its own document instance; pages can still be rendered from
//! several threads at once.

use std::path::Path;

use image::{DynamicImage, GrayImage, RgbImage};
use mupdf::{Colorspace, Document, Matrix, Pixmap};

use super::{check_pdf_file, PdfDocument, RasterError, RasterImage, Rasterizer};

/// PDF user space is measured in points, 72 per inch.
const POINTS_PER_INCH: f32 = 72.0;

/// Rasterizer that renders pages with the MuPDF library.
#[derive(Debug, Clone, Copy, Default)]
pub struct MupdfRasterizer;

impl MupdfRasterizer {
    pub fn new() -> Self {
        Self
    }

    fn load(path: &Path) -> Result<Document, RasterError> {
        let path_str = path.to_str().ok_or_else(|| {
            RasterError::OpenFailed(format!("path is not valid UTF-8: {}", path.display()))
        })?;
        Document::open(path_str).map_err(|e| RasterError::OpenFailed(e.to_string()))
    }
}

/// Copy pixmap samples into an owned image, dropping any alpha channel.
fn pixmap_to_image(pixmap: &Pixmap) -> Option<DynamicImage> {
    let width = pixmap.width() as u32;
    let height = pixmap.height() as u32;
    let n = pixmap.n() as usize;
    let pixels = width as usize * height as usize;
    let samples = pixmap.samples();

    if n == 0 || samples.len() < pixels * n {
        return None;
    }

    if n < 3 {
        let gray: Vec<u8> = samples.chunks_exact(n).take(pixels).map(|px| px[0]).collect();
        return GrayImage::from_raw(width, height, gray).map(DynamicImage::ImageLuma8);
    }

    let mut rgb = Vec::with_capacity(pixels * 3);
    for px in samples.chunks_exact(n).take(pixels) {
        rgb.extend_from_slice(&px[..3]);
    }
    RgbImage::from_raw(width, height, rgb).map(DynamicImage::ImageRgb8)
}

impl Rasterizer for MupdfRasterizer {
    fn open(&self, path: &Path) -> Result<PdfDocument, RasterError> {
        check_pdf_file(path)?;

        let document = Self::load(path)?;
        let count = document
            .page_count()
            .map_err(|e| RasterError::OpenFailed(e.to_string()))?;
        let page_count = u32::try_from(count)
            .map_err(|_| RasterError::OpenFailed(format!("invalid page count {}", count)))?;

        tracing::debug!("Opened {} with MuPDF ({} pages)", path.display(), page_count);
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
        if page == 0 || page > document.page_count() {
            return Err(RasterError::ConversionFailed {
                page,
                reason: format!("page out of range 1..={}", document.page_count()),
            });
        }
        let failed = |e: mupdf::Error| RasterError::ConversionFailed {
            page,
            reason: e.to_string(),
        };

        let pdf = Self::load(document.path())?;
        let index = i32::try_from(page - 1).map_err(|_| RasterError::ConversionFailed {
            page,
            reason: "page index too large".to_string(),
        })?;
        let mupdf_page = pdf.load_page(index).map_err(failed)?;

        let scale = dpi as f32 / POINTS_PER_INCH;
        let matrix = Matrix::new_scale(scale, scale);
        let pixmap = mupdf_page
            .to_pixmap(&matrix, &Colorspace::device_rgb(), false, true)
            .map_err(failed)?;

        let image = pixmap_to_image(&pixmap).ok_or_else(|| {
            RasterError::ImageError(format!("page {}: unexpected pixmap layout", page))
        })?;

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

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// One blank 144x72pt page. MuPDF rebuilds the missing xref table.
    const ONE_PAGE_PDF: &[u8] = b"%PDF-1.4
1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj
2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj
3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 144 72] >> endobj
trailer << /Root 1 0 R >>
%%EOF
";

    fn write_pdf(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join("blank.pdf");
        std::fs::write(&path, ONE_PAGE_PDF).unwrap();
        path
    }

    #[test]
    fn test_open_reports_page_count() {
        let dir = TempDir::new().unwrap();
        let document = MupdfRasterizer::new().open(&write_pdf(&dir)).unwrap();
        assert_eq!(document.page_count(), 1);
    }

    #[test]
    fn test_render_scales_with_dpi() {
        let dir = TempDir::new().unwrap();
        let rasterizer = MupdfRasterizer::new();
        let document = rasterizer.open(&write_pdf(&dir)).unwrap();

        let image = rasterizer.rasterize_page(&document, 1, 144).unwrap();
        assert_eq!(image.page, 1);
        assert_eq!(image.image.width(), 288);
        assert_eq!(image.image.height(), 144);
    }

    #[test]
    fn test_page_out_of_range() {
        let dir = TempDir::new().unwrap();
        let rasterizer = MupdfRasterizer::new();
        let document = rasterizer.open(&write_pdf(&dir)).unwrap();

        let err = rasterizer.rasterize_page(&document, 2, 72).unwrap_err();
        assert!(matches!(err, RasterError::ConversionFailed { page: 2, .. }));
    }

    #[test]
    fn test_open_missing_file() {
        let err = MupdfRasterizer::new()
            .open(Path::new("/definitely/not/here.pdf"))
            .unwrap_err();
        assert!(matches!(err, RasterError::FileNotFound(_)));
    }
}
