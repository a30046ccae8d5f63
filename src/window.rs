//
// window.rs
// Dicom-Viewer-rs
//
// Window/level mapping from rescaled samples to 8-bit grayscale, and the sample range scan.
//
// Thales Matheus Mendonça Santos - November 2025

use serde::{Deserialize, Serialize};

use crate::models::DicomAttributes;

/// Display window in rescaled sample units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub center: f64,
    pub width: f64,
}

impl Window {
    pub fn new(center: f64, width: f64) -> Self {
        Self { center, width }
    }

    pub fn from_attributes(attrs: &DicomAttributes) -> Self {
        Self::new(attrs.window_center, attrs.window_width)
    }

    /// Samples at or below this value map to black.
    pub fn lower_bound(&self) -> f64 {
        self.center - 0.5 - (self.width - 1.0) / 2.0
    }

    /// Samples above this value map to white.
    pub fn upper_bound(&self) -> f64 {
        self.center - 0.5 + (self.width - 1.0) / 2.0
    }

    pub fn apply(&self, sample: f64) -> u8 {
        apply_window_level(sample, self.center, self.width)
    }
}

/// Linear VOI window (PS3.3 C.11.2.1.2.1) onto `0..=255`.
///
/// A width of 1 or less degenerates into a threshold at `center - 0.5`.
pub fn apply_window_level(sample: f64, center: f64, width: f64) -> u8 {
    let shifted_center = center - 0.5;
    let span = width - 1.0;

    if span <= 0.0 {
        return if sample <= shifted_center { 0 } else { 255 };
    }

    let half = span / 2.0;
    if sample <= shifted_center - half {
        0
    } else if sample > shifted_center + half {
        255
    } else {
        (((sample - shifted_center) / span + 0.5) * 255.0)
            .round()
            .clamp(0.0, 255.0) as u8
    }
}

/// True minimum and maximum of a sample buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayRange {
    pub min: f32,
    pub max: f32,
}

impl DisplayRange {
    /// Window spanning the whole range.
    pub fn to_window(&self) -> Window {
        let min = f64::from(self.min);
        let max = f64::from(self.max);
        Window::new((min + max) / 2.0, max - min + 1.0)
    }
}

/// One pass over the samples. `None` for an empty slice.
pub fn compute_display_range(samples: &[f32]) -> Option<DisplayRange> {
    let (first, rest) = samples.split_first()?;
    let (min, max) = rest
        .iter()
        .fold((*first, *first), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    Some(DisplayRange { min, max })
}

/// Where the renderer takes its window from.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum WindowSource {
    /// Window Center / Window Width from the file (or their defaults).
    #[default]
    Attributes,
    Override(Window),
    /// Derived from the sample range.
    DisplayRange,
}

impl WindowSource {
    pub fn resolve(&self, attrs: &DicomAttributes, samples: &[f32]) -> Window {
        match self {
            Self::Attributes => Window::from_attributes(attrs),
            Self::Override(window) => *window,
            Self::DisplayRange => compute_display_range(samples)
                .map(|range| range.to_window())
                .unwrap_or_else(|| Window::from_attributes(attrs)),
        }
    }
}
