//! CLI parser and command dispatch.

mod check;
mod extract;
mod progress;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::ocr::OcrBackendType;

pub use progress::ProgressBarObserver;

#[derive(Parser)]
#[command(name = "scanocr")]
#[command(about = "Extract text from scanned PDF documents with OCR")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true, env = "SCANOCR_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Rasterize a PDF, run OCR on every page and write the text
    Extract(extract::ExtractArgs),

    /// Show whether the rasterizer tools and OCR backends are usable
    Check {
        /// Fully probe one backend (ocrs may download its models)
        #[arg(short, long)]
        backend: Option<OcrBackendType>,
    },
}

/// Parse arguments and run the selected command.
pub async fn run() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Extract(args) => extract::cmd_extract(cli.config.as_deref(), args).await,
        Commands::Check { backend } => {
            check::cmd_check(cli.config.as_deref(), backend).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_extract() {
        let cli = Cli::try_parse_from([
            "scanocr",
            "extract",
            "scan.pdf",
            "-o",
            "out/scan.txt",
            "--dpi",
            "400",
            "--backend",
            "ocrs",
            "--gpu",
        ])
        .unwrap();

        match cli.command {
            Commands::Extract(args) => {
                assert_eq!(args.input, PathBuf::from("scan.pdf"));
                assert_eq!(args.output, Some(PathBuf::from("out/scan.txt")));
                assert_eq!(args.dpi, Some(400));
                assert_eq!(args.backend, Some(OcrBackendType::Ocrs));
                assert!(args.gpu);
            }
            _ => panic!("expected extract"),
        }
    }

    #[test]
    fn test_parse_check() {
        let cli = Cli::try_parse_from(["scanocr", "check", "-b", "tesseract"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Check {
                backend: Some(OcrBackendType::Tesseract)
            }
        ));
    }
}
