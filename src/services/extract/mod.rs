//! OCR extraction service.
//!
//! Runs one document through the pipeline: probe the backend, open the PDF,
//! rasterize and recognize each page, aggregate the text and write it out.
//! Separated from UI concerns - progress goes through [`ProgressObserver`].

mod aggregate;
mod output;
mod types;

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::sync::Semaphore;

use crate::config::{ExtractConfig, ExtractJob};
use crate::ocr::{build_backend, Availability, OcrBackend};
use crate::raster::{default_rasterizer, PdfDocument, RasterError, Rasterizer};

pub use aggregate::AggregatedDocument;
pub use output::{prepare_output, write_document};
pub use types::{
    ExtractError, NoopObserver, PageOutcome, PageStats, ProgressObserver, RunOutcome, RunSummary,
};

/// Service for OCR extraction of scanned PDFs.
pub struct ExtractService {
    config: Arc<ExtractConfig>,
    rasterizer: Arc<dyn Rasterizer>,
    backend: Arc<dyn OcrBackend>,
    observer: Arc<dyn ProgressObserver>,
}

impl ExtractService {
    /// Create a service from explicit stage implementations.
    pub fn new(
        config: ExtractConfig,
        rasterizer: Arc<dyn Rasterizer>,
        backend: Arc<dyn OcrBackend>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            rasterizer,
            backend,
            observer: Arc::new(NoopObserver),
        }
    }

    /// Create a service using the build's preferred rasterizer and the
    /// configured OCR backend.
    pub fn from_config(config: ExtractConfig) -> Result<Self, ExtractError> {
        config.validate()?;
        let backend = build_backend(&config)?;
        Ok(Self::new(config, default_rasterizer(), backend))
    }

    /// Report page progress to an observer.
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// Check the backend without touching any page.
    pub async fn probe(&self) -> Availability {
        let backend = self.backend.clone();
        tokio::task::spawn_blocking(move || backend.probe())
            .await
            .unwrap_or_else(|e| Availability::Unavailable {
                reason: format!("probe panicked: {}", e),
            })
    }

    /// Run a full extraction.
    ///
    /// Fatal conditions (bad config, missing input, unavailable backend,
    /// unwritable output) return `Err` before any page is rasterized.
    /// Page-level failures never do.
    pub async fn run(&self, job: &ExtractJob) -> Result<RunOutcome, ExtractError> {
        self.config.validate()?;

        if !job.input.is_file() {
            return Err(ExtractError::InputNotFound(job.input.clone()));
        }

        let backend_type = self.backend.backend_type();
        match self.probe().await {
            Availability::Available { detail } => {
                tracing::info!("Using {} backend: {}", backend_type, detail);
            }
            Availability::Unavailable { reason } => {
                return Err(ExtractError::BackendUnavailable {
                    backend: backend_type,
                    reason,
                });
            }
        }

        prepare_output(&job.output).await?;

        let document = self.open(job).await?;
        tracing::info!(
            "Extracting {} pages from {} at {} DPI (languages: {})",
            document.page_count(),
            job.input.display(),
            self.config.dpi,
            self.config.languages
        );

        let (outcomes, stats) = self.process_document(document).await;
        let aggregated = AggregatedDocument::from_outcomes(&outcomes);

        let mut summary = RunSummary {
            input: job.input.clone(),
            output: None,
            backend: backend_type.to_string(),
            pages: stats,
            characters_written: 0,
        };

        match write_document(&aggregated, &job.output).await? {
            Some(chars) => {
                summary.output = Some(job.output.clone());
                summary.characters_written = chars;
                Ok(RunOutcome::Written(summary))
            }
            None => {
                tracing::warn!("No text recognized in {}", job.input.display());
                Ok(RunOutcome::NoText(summary))
            }
        }
    }

    async fn open(&self, job: &ExtractJob) -> Result<PdfDocument, ExtractError> {
        let rasterizer = self.rasterizer.clone();
        let input = job.input.clone();
        let opened = tokio::task::spawn_blocking(move || rasterizer.open(&input))
            .await
            .map_err(|e| {
                ExtractError::Input(RasterError::OpenFailed(format!("open task failed: {}", e)))
            })?;

        match opened {
            Ok(document) => Ok(document),
            Err(RasterError::FileNotFound(path)) => Err(ExtractError::InputNotFound(path)),
            Err(e) => Err(ExtractError::Input(e)),
        }
    }

    /// Rasterize and recognize every page, returning outcomes in page order.
    ///
    /// Pages stream through two bounded stages so only a handful of raster
    /// images exist at any time. Outcomes land in a slot per page index, so
    /// completion order never affects the result.
    pub async fn process_document(&self, document: PdfDocument) -> (Vec<PageOutcome>, PageStats) {
        let total = document.page_count();
        let mut stats = PageStats::new(total);
        self.observer.on_document_opened(total);

        let raster_limit = self.config.rasterization_concurrency.max(1);
        let ocr_limit = self.backend.max_concurrency(self.config.ocr_workers);
        let raster_permits = Arc::new(Semaphore::new(raster_limit));
        let ocr_permits = Arc::new(Semaphore::new(ocr_limit));
        tracing::debug!(
            "Page workers: {} rasterizing, {} recognizing",
            raster_limit,
            ocr_limit
        );

        let document = Arc::new(document);
        let mut slots: Vec<Option<PageOutcome>> = (0..total).map(|_| None).collect();

        let mut pending = stream::iter(document.pages())
            .map(|page| {
                self.observer.on_page_started(page);
                let worker = PageWorker {
                    config: self.config.clone(),
                    rasterizer: self.rasterizer.clone(),
                    backend: self.backend.clone(),
                    document: document.clone(),
                    raster_permits: raster_permits.clone(),
                    ocr_permits: ocr_permits.clone(),
                };
                worker.run(page)
            })
            .buffer_unordered(raster_limit + ocr_limit);

        while let Some(outcome) = pending.next().await {
            if let PageOutcome::Skipped { page, reason } = &outcome {
                tracing::warn!("Skipping page {}: {}", page, reason);
            }
            stats.record(&outcome);
            self.observer.on_page_finished(&outcome);

            let index = outcome.page() as usize - 1;
            slots[index] = Some(outcome);
        }

        self.observer.on_pages_done(&stats);

        let outcomes = slots
            .into_iter()
            .enumerate()
            .map(|(i, slot)| {
                slot.unwrap_or_else(|| PageOutcome::Skipped {
                    page: i as u32 + 1,
                    reason: "page was never processed".to_string(),
                })
            })
            .collect();
        (outcomes, stats)
    }
}

/// Everything one page task needs, owned so it can cross into blocking threads.
struct PageWorker {
    config: Arc<ExtractConfig>,
    rasterizer: Arc<dyn Rasterizer>,
    backend: Arc<dyn OcrBackend>,
    document: Arc<PdfDocument>,
    raster_permits: Arc<Semaphore>,
    ocr_permits: Arc<Semaphore>,
}

impl PageWorker {
    async fn run(self, page: u32) -> PageOutcome {
        let skipped = |reason: String| PageOutcome::Skipped { page, reason };

        let image = {
            let _permit = match self.raster_permits.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => return skipped(e.to_string()),
            };
            let rasterizer = self.rasterizer.clone();
            let document = self.document.clone();
            let dpi = self.config.dpi;
            match tokio::task::spawn_blocking(move || rasterizer.rasterize_page(&document, page, dpi))
                .await
            {
                Ok(Ok(image)) => image,
                Ok(Err(e)) => return skipped(format!("rasterization failed: {}", e)),
                Err(e) => return skipped(format!("rasterization task failed: {}", e)),
            }
        };

        let _permit = match self.ocr_permits.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => return skipped(e.to_string()),
        };
        let backend = self.backend.clone();
        let config = self.config.clone();
        // The image moves into the task and is dropped when recognition ends
        let recognized =
            tokio::task::spawn_blocking(move || backend.recognize(&image, &config.languages)).await;

        match recognized {
            Ok(Ok(text)) => {
                tracing::debug!("Page {}: {} chars recognized", page, text.trim().len());
                PageOutcome::Done { page, text }
            }
            Ok(Err(e)) => skipped(format!("recognition failed: {}", e)),
            Err(e) => skipped(format!("recognition task failed: {}", e)),
        }
    }
}
