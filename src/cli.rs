//
// cli.rs
// Dicom-Viewer-rs
//
// Defines the CLI surface with Clap and dispatches user-selected commands to the corresponding modules.
//
// Thales Matheus Mendonça Santos - November 2025

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;

use crate::contrast::ContrastMode;
use crate::decoder::DicomDecoder;
use crate::engine::ExternalDecodeEngine;
use crate::overlay::{self, OverlayLabel};
use crate::renderer::{self, ImageRenderer, RenderOptions, DEFAULT_JPEG_QUALITY};
use crate::surface::ImageSurfaceProvider;
use crate::viewer::{DetachedFullscreen, ViewerController};
use crate::window::{Window, WindowSource};
use crate::{batch, metadata, stats, web};

/// Command-line interface glue code: defines the available verbs and dispatches to modules.
#[derive(Parser)]
#[command(name = "dicom-viewer")]
#[command(about = "Visualizador DICOM em Rust", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render a DICOM file to an annotated JPEG
    Render {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        window_center: Option<f64>,
        #[arg(long)]
        window_width: Option<f64>,
        /// Derive the window from the sample range instead of the file
        #[arg(long, conflicts_with_all = ["window_center", "window_width"])]
        auto_window: bool,
        #[arg(long, value_enum, default_value_t = Contrast::Auto)]
        contrast: Contrast,
        #[arg(long)]
        no_overlay: bool,
        #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY)]
        quality: u8,
        /// Skip the dicom-rs engine and use the built-in tag walker only
        #[arg(long)]
        heuristic_only: bool,
        /// Print the metadata map as JSON after saving
        #[arg(long)]
        json: bool,
    },
    /// Show decoded attributes and sample statistics
    Info {
        file: PathBuf,
        #[arg(long)]
        json: bool,
        #[arg(long, default_value_t = 16)]
        bins: usize,
    },
    /// Stretch the contrast of an existing image
    Enhance {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY)]
        quality: u8,
    },
    /// Render every .dcm file below a directory
    Batch {
        #[arg(short, long)]
        directory: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Start the web viewer
    Web {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(short, long, default_value_t = 3000)]
        port: u16,
        #[arg(long, default_value = "target/uploads")]
        upload_dir: PathBuf,
    },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum Contrast {
    Never,
    Auto,
    Always,
}

impl From<Contrast> for ContrastMode {
    fn from(value: Contrast) -> Self {
        match value {
            Contrast::Never => ContrastMode::Never,
            Contrast::Auto => ContrastMode::Auto,
            Contrast::Always => ContrastMode::Always,
        }
    }
}

pub async fn run() -> anyhow::Result<()> {
    // Parse the raw CLI arguments once and dispatch to a subcommand handler.
    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            input,
            output,
            window_center,
            window_width,
            auto_window,
            contrast,
            no_overlay,
            quality,
            heuristic_only,
            json,
        } => {
            let window = match parse_window(window_center, window_width)? {
                Some(window) => WindowSource::Override(window),
                None if auto_window => WindowSource::DisplayRange,
                None => WindowSource::Attributes,
            };
            let options = RenderOptions {
                jpeg_quality: quality,
                overlay: !no_overlay,
                contrast: contrast.into(),
                window,
            };
            render_file(&input, output, options, heuristic_only, json).await?
        }
        Commands::Info { file, json, bins } => info_file(&file, json, bins)?,
        Commands::Enhance {
            input,
            output,
            quality,
        } => enhance_file(&input, output, quality)?,
        Commands::Batch { directory, output } => {
            batch::process_directory(&directory, output.as_deref(), &RenderOptions::default())?;
        }
        Commands::Web {
            host,
            port,
            upload_dir,
        } => web::start_server(&host, port, &upload_dir).await?,
    }

    Ok(())
}

async fn render_file(
    input: &Path,
    output: Option<PathBuf>,
    options: RenderOptions,
    heuristic_only: bool,
    json: bool,
) -> anyhow::Result<()> {
    let engine = if heuristic_only {
        ExternalDecodeEngine::Unavailable
    } else {
        ExternalDecodeEngine::dicom_rs()
    };
    let mut viewer = ViewerController::with_parts(
        DicomDecoder::new(engine),
        ImageRenderer::new(ImageSurfaceProvider::default()),
        options,
        DetachedFullscreen::default(),
    );
    viewer
        .open_path(input)
        .await
        .with_context(|| format!("Failed to render {:?}", input))?;
    let loaded = viewer
        .loaded()
        .ok_or_else(|| anyhow!("Viewer finished without an image"))?;

    let output = output.unwrap_or_else(|| input.with_extension("jpg"));
    tokio::fs::write(&output, &loaded.rendered.bytes)
        .await
        .with_context(|| format!("Failed to save image to {:?}", output))?;
    println!(
        "Image saved to: {:?} ({}x{}, {})",
        output, loaded.rendered.width, loaded.rendered.height, loaded.tier
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&loaded.metadata)?);
    }
    Ok(())
}

fn info_file(path: &Path, as_json: bool, bins: usize) -> anyhow::Result<()> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
    let decoded = DicomDecoder::default().parse(&bytes);
    let label = OverlayLabel::new(overlay::display_name(path), bytes.len() as u64);
    let statistics = stats::sample_statistics(&decoded.pixels);

    if as_json {
        let histogram = stats::sample_histogram(&decoded.pixels, bins);
        let report = json!({
            "metadata": metadata::metadata_map(&decoded.attributes, decoded.tier, &label),
            "statistics": statistics,
            "histogram": histogram,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    metadata::print_info(&decoded.attributes, decoded.tier, &label);
    if let Some(statistics) = &statistics {
        stats::print_statistics(statistics);
    }
    if let Some(histogram) = stats::sample_histogram(&decoded.pixels, bins) {
        let counts: BTreeMap<usize, u64> = histogram.bins.iter().copied().enumerate().collect();
        println!("  Histogram ({} bins): {:?}", histogram.bins.len(), counts);
    }
    Ok(())
}

fn enhance_file(input: &Path, output: Option<PathBuf>, quality: u8) -> anyhow::Result<()> {
    let bytes = std::fs::read(input).with_context(|| format!("Failed to read {:?}", input))?;
    let enhanced = renderer::enhance_encoded(&bytes, quality)
        .with_context(|| format!("Failed to enhance {:?}", input))?;

    let output = output.unwrap_or_else(|| {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        input.with_file_name(format!("{}_enhanced.jpg", stem))
    });
    std::fs::write(&output, &enhanced.bytes)
        .with_context(|| format!("Failed to save image to {:?}", output))?;
    println!("Enhanced image saved to: {:?}", output);
    Ok(())
}

fn parse_window(center: Option<f64>, width: Option<f64>) -> anyhow::Result<Option<Window>> {
    // Window requires both center and width to make sense; reject mismatched input early.
    match (center, width) {
        (Some(c), Some(w)) => Ok(Some(Window::new(c, w))),
        (None, None) => Ok(None),
        _ => Err(anyhow!(
            "Provide both --window-center and --window-width, or neither"
        )),
    }
}
