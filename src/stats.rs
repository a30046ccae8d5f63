use ndarray::{ArrayView2, ArrayViewD};

use crate::models::{PixelSampleBuffer, SampleHistogram, SampleStatistics};

/// Min, max, mean and standard deviation of the rescaled samples. `None` for an empty grid.
pub fn sample_statistics(pixels: &PixelSampleBuffer) -> Option<SampleStatistics> {
    let view = grid_view(pixels)?;
    Some(compute_stats(&view.into_dyn()))
}

/// Equal-width histogram between the observed min and max.
pub fn sample_histogram(pixels: &PixelSampleBuffer, bins: usize) -> Option<SampleHistogram> {
    if bins == 0 {
        return None;
    }
    let view = grid_view(pixels)?;
    let min = view.iter().fold(f32::INFINITY, |a, &b| a.min(b));
    let max = view.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));

    let mut counts = vec![0u64; bins];
    let span = max - min;
    for &value in view.iter() {
        let index = if span > 0.0 {
            (((value - min) / span) * bins as f32) as usize
        } else {
            0
        };
        counts[index.min(bins - 1)] += 1;
    }

    Some(SampleHistogram {
        bins: counts,
        min,
        max,
    })
}

fn grid_view(pixels: &PixelSampleBuffer) -> Option<ArrayView2<'_, f32>> {
    if pixels.is_empty() {
        return None;
    }
    let shape = (pixels.height() as usize, pixels.width() as usize);
    ArrayView2::from_shape(shape, pixels.as_slice()).ok()
}

fn compute_stats(array: &ArrayViewD<f32>) -> SampleStatistics {
    let min = array.iter().fold(f32::INFINITY, |a, &b| a.min(b));
    let max = array.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
    let sum: f32 = array.iter().sum();
    let count = array.len() as f32;
    let mean = sum / count;

    let variance = array
        .iter()
        .map(|x| {
            let diff = mean - x;
            diff * diff
        })
        .sum::<f32>()
        / count;

    SampleStatistics {
        min,
        max,
        mean,
        std_dev: variance.sqrt(),
        total_pixels: array.len(),
        shape: array.shape().to_vec(),
    }
}

pub fn print_statistics(stats: &SampleStatistics) {
    println!("\nSAMPLES");
    println!("  Shape: {:?}", stats.shape);
    println!("  Min:   {:.2}", stats.min);
    println!("  Max:   {:.2}", stats.max);
    println!("  Mean:  {:.2}", stats.mean);
    println!("  StdDv: {:.2}", stats.std_dev);
}
