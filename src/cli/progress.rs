//! Terminal progress reporting for extraction runs.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::services::{PageOutcome, PageStats, ProgressObserver};

/// Shows a progress bar with one tick per finished page.
pub struct ProgressBarObserver {
    bar: ProgressBar,
}

impl ProgressBarObserver {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} pages {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Self { bar }
    }
}

impl Default for ProgressBarObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressObserver for ProgressBarObserver {
    fn on_document_opened(&self, total_pages: u32) {
        self.bar.set_length(u64::from(total_pages));
    }

    fn on_page_finished(&self, outcome: &PageOutcome) {
        match outcome {
            PageOutcome::Done { page, .. } if outcome.has_text() => {
                self.bar.set_message(format!("page {} ok", page));
            }
            PageOutcome::Done { page, .. } => {
                self.bar.set_message(format!("page {} (no text)", page));
            }
            PageOutcome::Skipped { page, reason } => {
                self.bar.println(format!(
                    "{} page {}: {}",
                    style("✗").red(),
                    page,
                    reason
                ));
            }
        }
        self.bar.inc(1);
    }

    fn on_pages_done(&self, stats: &PageStats) {
        self.bar.finish_and_clear();
        tracing::debug!(
            "{} of {} pages yielded text",
            stats.with_text,
            stats.total_pages
        );
    }
}
