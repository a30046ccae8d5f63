//
// contrast.rs
// Dicom-Viewer-rs
//
// Histogram-based contrast stretching on the red channel of a grayscale RGBA canvas.
//
// Thales Matheus Mendonça Santos - November 2025

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

/// Fraction of pixels clipped at each end of the histogram.
pub const CLIP_FRACTION: f64 = 0.001;

/// When the renderer runs the stretch pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContrastMode {
    Never,
    /// Only for synthesized pixel data.
    #[default]
    Auto,
    Always,
}

/// Input levels mapped to 0 and 255 by the stretch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StretchBounds {
    pub low: u8,
    /// May be 256 when the guard bumps a saturated histogram.
    pub high: u16,
}

pub fn red_histogram(image: &RgbaImage) -> [u64; 256] {
    let mut bins = [0u64; 256];
    for pixel in image.pixels() {
        bins[pixel[0] as usize] += 1;
    }
    bins
}

/// Lowest and highest bins at which the cumulative count from that end exceeds the clip threshold.
/// `high` is forced above `low`.
pub fn stretch_bounds(histogram: &[u64; 256], total: u64) -> StretchBounds {
    let threshold = total as f64 * CLIP_FRACTION;

    let mut cumulative = 0u64;
    let mut low = 0u8;
    for (level, &count) in histogram.iter().enumerate() {
        cumulative += count;
        if cumulative as f64 > threshold {
            low = level as u8;
            break;
        }
    }

    cumulative = 0;
    let mut high = 255u16;
    for (level, &count) in histogram.iter().enumerate().rev() {
        cumulative += count;
        if cumulative as f64 > threshold {
            high = level as u16;
            break;
        }
    }

    if high <= u16::from(low) {
        high = u16::from(low) + 1;
    }
    StretchBounds { low, high }
}

/// Remap every pixel so the clipped range fills `0..=255`, writing the result to R, G and B.
pub fn apply_contrast_enhancement(image: &mut RgbaImage) {
    let total = u64::from(image.width()) * u64::from(image.height());
    if total == 0 {
        return;
    }
    let bounds = stretch_bounds(&red_histogram(image), total);
    let low = f64::from(bounds.low);
    let range = f64::from(bounds.high) - low;

    for pixel in image.pixels_mut() {
        let value = (255.0 * (f64::from(pixel[0]) - low) / range)
            .round()
            .clamp(0.0, 255.0) as u8;
        *pixel = Rgba([value, value, value, pixel[3]]);
    }
}
