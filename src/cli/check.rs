//! `scanocr check`: report rasterizer and OCR backend availability.

use std::path::Path;

use console::style;

use crate::config::{ExtractConfig, FileConfig};
use crate::ocr::{build_backend, Availability, OcrBackendType};
use crate::raster::{default_rasterizer_name, PopplerRasterizer};

/// What `check` could say about one backend.
#[derive(Debug, Clone, PartialEq, Eq)]
enum BackendStatus {
    /// The backend's probe ran.
    Probed(Availability),
    /// Settings look valid but the backend was not loaded.
    NotProbed { hint: Option<String> },
    /// Settings alone rule the backend out.
    Rejected { reason: String },
}

pub async fn cmd_check(
    config_path: Option<&Path>,
    selected: Option<OcrBackendType>,
) -> anyhow::Result<()> {
    let file = FileConfig::discover(config_path)?;
    let base = ExtractConfig::default().merge_file(&file);

    println!("\n{}", style("OCR Tool Status").bold());
    println!("{}", "-".repeat(50));

    println!("\n{}", style("Rasterizer:").cyan());
    let builtin = default_rasterizer_name() == "mupdf";
    if builtin {
        println!("  {:<15} {}", "mupdf", style("✓ built in (used)").green());
    }
    let mut tools_found = true;
    for (tool, available) in PopplerRasterizer::new().check_tools() {
        let status = if available {
            style("✓ found").green()
        } else {
            tools_found = false;
            style("✗ not found").red()
        };
        println!("  {:<15} {}", tool, status);
    }

    println!("\n{}", style("OCR Backends:").cyan());
    for backend_type in OcrBackendType::ALL {
        let config = ExtractConfig {
            backend: backend_type,
            ..base.clone()
        };
        let full_probe = selected.map_or(backend_type == OcrBackendType::Tesseract, |s| {
            s == backend_type
        });

        let status = if full_probe {
            BackendStatus::Probed(probe(&config).await)
        } else {
            describe_without_probe(&config)
        };

        let marker = if backend_type == base.backend {
            style("→").green().to_string()
        } else {
            " ".to_string()
        };
        let name = backend_type.as_str();
        match status {
            BackendStatus::Probed(Availability::Available { detail }) => {
                println!("{} {:<13} {}", marker, name, style("✓ available").green());
                println!("                  {}", style(detail).dim());
            }
            BackendStatus::Probed(Availability::Unavailable { reason })
            | BackendStatus::Rejected { reason } => {
                println!("{} {:<13} {}", marker, name, style("✗ not available").red());
                println!("                  {}", style(reason).dim());
            }
            BackendStatus::NotProbed { hint } => {
                println!("{} {:<13} {}", marker, name, style("- not probed").dim());
                if let Some(hint) = hint {
                    println!("                  {}", style(hint).dim());
                }
            }
        }
    }

    println!();
    if !tools_found && !builtin {
        println!(
            "{} Install poppler-utils for pdfinfo and pdftoppm",
            style("!").yellow()
        );
    }

    Ok(())
}

async fn probe(config: &ExtractConfig) -> Availability {
    match build_backend(config) {
        Ok(backend) => tokio::task::spawn_blocking(move || backend.probe())
            .await
            .unwrap_or_else(|e| Availability::Unavailable {
                reason: e.to_string(),
            }),
        Err(e) => Availability::Unavailable {
            reason: e.to_string(),
        },
    }
}

/// Status for backends we don't load (avoids a model download).
fn describe_without_probe(config: &ExtractConfig) -> BackendStatus {
    match config.backend {
        OcrBackendType::Tesseract => BackendStatus::NotProbed { hint: None },
        #[cfg(feature = "ocr-ocrs")]
        OcrBackendType::Ocrs => {
            let mut backend = crate::ocr::OcrsBackend::new(config.languages.clone());
            if let Some(ref dir) = config.model_dir {
                backend = backend.with_model_dir(dir);
            }
            match backend.check_settings() {
                Ok(hint) => BackendStatus::NotProbed {
                    hint: Some(format!("{} (run `scanocr check -b ocrs` to load)", hint)),
                },
                Err(e) => BackendStatus::Rejected {
                    reason: e.to_string(),
                },
            }
        }
        #[cfg(not(feature = "ocr-ocrs"))]
        OcrBackendType::Ocrs => BackendStatus::Rejected {
            reason: "OCRS not compiled (enable ocr-ocrs feature)".to_string(),
        },
    }
}
