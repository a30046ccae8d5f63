//
// synth.rs
// Dicom-Viewer-rs
//
// Placeholder "scan" used when a file carries no readable pixel data: a bright disc over low noise.
//
// Thales Matheus Mendonça Santos - November 2025

use rand::Rng;

use crate::models::PixelSampleBuffer;

/// Disc radius as a fraction of the image width.
pub const DISC_RADIUS_RATIO: f64 = 0.4;
pub const DISC_PEAK: f64 = 200.0;
pub const NOISE_AMPLITUDE: f64 = 50.0;

/// Inside the disc: `200 - distance / 2 + noise`. Outside: `noise`. Noise is uniform in `[0, 50)`.
pub fn synthesize_pixels<R: Rng>(width: u32, height: u32, rng: &mut R) -> PixelSampleBuffer {
    let center_x = f64::from(width) / 2.0;
    let center_y = f64::from(height) / 2.0;
    let radius = DISC_RADIUS_RATIO * f64::from(width);

    PixelSampleBuffer::from_fn(width, height, |x, y| {
        let distance = (f64::from(x) - center_x).hypot(f64::from(y) - center_y);
        let noise = rng.gen_range(0.0..NOISE_AMPLITUDE);
        let value = if distance < radius {
            DISC_PEAK - distance / 2.0 + noise
        } else {
            noise
        };
        value as f32
    })
}
