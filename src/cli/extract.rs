//! `scanocr extract` command.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Args;
use console::style;

use crate::config::{ExtractConfig, ExtractJob, FileConfig};
use crate::ocr::{Languages, OcrBackendType};
use crate::raster::default_rasterizer_name;
use crate::services::{ExtractService, RunOutcome, RunSummary};

use super::progress::ProgressBarObserver;

/// Exit code for a run that found no text at all.
const EXIT_NO_TEXT: u8 = 2;

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Scanned PDF to read
    pub input: PathBuf,

    /// Output text file [default: input with .txt extension]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Rasterization resolution (higher is slower but more accurate)
    #[arg(long, env = "SCANOCR_DPI")]
    pub dpi: Option<u32>,

    /// OCR languages, comma separated (e.g. "it,en" or "ita,eng")
    #[arg(short, long = "lang", env = "SCANOCR_LANGUAGES")]
    pub languages: Option<String>,

    /// OCR engine: tesseract or ocrs
    #[arg(short, long, env = "SCANOCR_BACKEND")]
    pub backend: Option<OcrBackendType>,

    /// Request GPU execution (ocrs only; limits recognition to one page at a time)
    #[arg(long, env = "SCANOCR_GPU")]
    pub gpu: bool,

    /// Pages rasterized in parallel
    #[arg(long)]
    pub raster_workers: Option<usize>,

    /// Pages recognized in parallel
    #[arg(long)]
    pub ocr_workers: Option<usize>,

    /// Tesseract binary to use instead of searching for one
    #[arg(long, env = "TESSERACT_PATH")]
    pub tesseract_path: Option<PathBuf>,

    /// Directory for ocrs models
    #[arg(long, env = "SCANOCR_MODEL_DIR")]
    pub model_dir: Option<PathBuf>,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

impl ExtractArgs {
    /// Apply command-line and environment overrides on top of file settings.
    fn apply(&self, mut config: ExtractConfig) -> ExtractConfig {
        if let Some(dpi) = self.dpi {
            config.dpi = dpi;
        }
        if let Some(ref languages) = self.languages {
            config.languages = Languages::parse(languages);
        }
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        if self.gpu {
            config.gpu = true;
        }
        if let Some(n) = self.raster_workers {
            config.rasterization_concurrency = n;
        }
        if let Some(n) = self.ocr_workers {
            config.ocr_workers = n;
        }
        if let Some(ref path) = self.tesseract_path {
            config.tesseract_path = Some(path.clone());
        }
        if let Some(ref dir) = self.model_dir {
            config.model_dir = Some(dir.clone());
        }
        config
    }
}

/// Build the effective configuration for a run.
pub fn build_config(config_path: Option<&Path>, args: &ExtractArgs) -> anyhow::Result<ExtractConfig> {
    let file = FileConfig::discover(config_path)?;
    if let Some(ref source) = file.source_path {
        tracing::info!("Loaded config from {}", source.display());
    }
    let config = args.apply(ExtractConfig::default().merge_file(&file));
    config.validate()?;
    Ok(config)
}

pub async fn cmd_extract(config_path: Option<&Path>, args: ExtractArgs) -> anyhow::Result<ExitCode> {
    let config = build_config(config_path, &args)?;
    let job = ExtractJob::new(&args.input, args.output.clone());

    let mut service = ExtractService::from_config(config)?;
    if !args.no_progress && !args.json {
        service = service.with_observer(Arc::new(ProgressBarObserver::new()));
    }

    eprintln!(
        "{} {} ({} rasterizer, {} backend, {} DPI, languages: {})",
        style("→").cyan(),
        job.input.display(),
        default_rasterizer_name(),
        service.config().backend,
        service.config().dpi,
        service.config().languages
    );

    let outcome = service.run(&job).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(outcome.summary())?);
    } else {
        print_summary(&outcome);
    }

    Ok(match outcome {
        RunOutcome::Written(_) => ExitCode::SUCCESS,
        RunOutcome::NoText(_) => ExitCode::from(EXIT_NO_TEXT),
    })
}

fn print_summary(outcome: &RunOutcome) {
    match outcome {
        RunOutcome::Written(summary) => {
            println!(
                "{} Text saved to {}",
                style("✓").green(),
                summary
                    .output
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default()
            );
            print_counts(summary);
        }
        RunOutcome::NoText(summary) => {
            println!(
                "{} No text recognized in {}; no output written",
                style("!").yellow(),
                summary.input.display()
            );
            print_counts(summary);
        }
    }
}

fn print_counts(summary: &RunSummary) {
    let pages = &summary.pages;
    println!(
        "  Pages processed:  {}/{}",
        pages.attempted, pages.total_pages
    );
    println!("  Pages with text:  {}", pages.with_text);
    if pages.skipped > 0 {
        println!(
            "  Pages skipped:    {}",
            style(pages.skipped).yellow()
        );
    }
    println!("  Characters:       {}", summary.characters_written);
}
