//! scanocr - OCR text extraction for scanned PDF documents.
//!
//! Rasterizes each page of an image-only PDF, runs it through a pluggable
//! OCR engine (Tesseract or OCRS) and writes one text file with a
//! `=== PAGE <n> ===` marker per page that produced text.

pub mod cli;
pub mod config;
pub mod ocr;
pub mod raster;
pub mod services;

pub use config::{ExtractConfig, ExtractJob};
pub use services::{ExtractError, ExtractService, RunOutcome, RunSummary};
