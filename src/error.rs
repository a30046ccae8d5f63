//
// error.rs
// Dicom-Viewer-rs
//
// Error type for the few failures the viewer propagates; malformed DICOM input is never one of them.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViewerError {
    /// No drawing surface could be obtained for the requested canvas.
    #[error("rendering unavailable for a {width}x{height} canvas: {reason}")]
    RenderingUnavailable {
        width: u32,
        height: u32,
        reason: String,
    },

    /// The file-acquisition layer could not produce bytes.
    #[error("failed to read {path:?}")]
    BufferRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode image")]
    Encode(#[from] image::ImageError),

    #[error("fullscreen request rejected: {0}")]
    Fullscreen(String),
}

pub type ViewerResult<T> = Result<T, ViewerError>;
