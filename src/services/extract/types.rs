//! Extraction service types, outcomes and progress callbacks.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;
use crate::ocr::{OcrBackendType, OcrError};
use crate::raster::RasterError;

/// Fatal errors. Any of these ends the run before or instead of writing output.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("Cannot open input: {0}")]
    Input(#[source] RasterError),

    #[error("OCR backend {backend} is unavailable: {reason}")]
    BackendUnavailable {
        backend: OcrBackendType,
        reason: String,
    },

    #[error(transparent)]
    Backend(#[from] OcrError),

    #[error("Cannot write output {}: {source}", path.display())]
    Output {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Final state of a single page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// Recognition ran; text may be empty.
    Done { page: u32, text: String },
    /// Rasterization or recognition failed for this page only.
    Skipped { page: u32, reason: String },
}

impl PageOutcome {
    pub fn page(&self) -> u32 {
        match self {
            PageOutcome::Done { page, .. } | PageOutcome::Skipped { page, .. } => *page,
        }
    }

    /// True for a `Done` page with non-whitespace text.
    pub fn has_text(&self) -> bool {
        matches!(self, PageOutcome::Done { text, .. } if !text.trim().is_empty())
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, PageOutcome::Skipped { .. })
    }
}

/// Per-run page counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PageStats {
    pub total_pages: u32,
    pub attempted: u32,
    pub with_text: u32,
    pub skipped: u32,
}

impl PageStats {
    pub fn new(total_pages: u32) -> Self {
        Self {
            total_pages,
            ..Default::default()
        }
    }

    pub fn record(&mut self, outcome: &PageOutcome) {
        self.attempted += 1;
        if outcome.has_text() {
            self.with_text += 1;
        }
        if outcome.is_skipped() {
            self.skipped += 1;
        }
    }
}

/// Summary reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub input: PathBuf,
    /// Set only when a file was written.
    pub output: Option<PathBuf>,
    pub backend: String,
    #[serde(flatten)]
    pub pages: PageStats,
    pub characters_written: usize,
}

/// How a run that did not fail ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Text found and written.
    Written(RunSummary),
    /// Every page processed, none yielded text. Nothing was written.
    NoText(RunSummary),
}

impl RunOutcome {
    pub fn summary(&self) -> &RunSummary {
        match self {
            RunOutcome::Written(summary) | RunOutcome::NoText(summary) => summary,
        }
    }
}

/// Receives page progress. All methods default to doing nothing.
///
/// Calls arrive from the coordinating task, one at a time per run.
pub trait ProgressObserver: Send + Sync {
    fn on_document_opened(&self, _total_pages: u32) {}

    fn on_page_started(&self, _page: u32) {}

    fn on_page_finished(&self, _outcome: &PageOutcome) {}

    fn on_pages_done(&self, _stats: &PageStats) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {}
