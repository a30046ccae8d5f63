//
// main.rs
// Dicom-Viewer-rs
//
// Tokio entry point: installs the log subscriber, then hands off execution to the CLI layer.
//
// Thales Matheus Mendonça Santos - November 2025

use dicom_viewer::cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so JSON printed by `info --json` and `render --json` stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    cli::run().await
}
