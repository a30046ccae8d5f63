//
// lib.rs
// Dicom-Viewer-rs
//
// Exposes the crate's modules and re-exports the CLI entry point for both binary and library consumers.
//
// Thales Matheus Mendonça Santos - November 2025

// Decoding pipeline: byte cursor, tag walker, optional dicom-rs engine, synthetic fallback.
pub mod cursor;
pub mod decoder;
pub mod dicom_access;
pub mod engine;
pub mod synth;

// Rendering: window/level, contrast stretch, raster surfaces, overlay captions.
pub mod contrast;
pub mod overlay;
pub mod renderer;
pub mod surface;
pub mod window;

pub mod batch;
pub mod cli;
pub mod error;
pub mod metadata;
pub mod models;
pub mod stats;
pub mod storage;
pub mod viewer;
pub mod web;

pub use cli::{run as run_cli, Cli, Commands};
pub use decoder::DicomDecoder;
pub use error::{ViewerError, ViewerResult};
pub use renderer::{ImageRenderer, RenderOptions};
pub use viewer::{ViewState, ViewerController, ViewerState};
