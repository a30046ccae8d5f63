//
// models.rs
// Dicom-Viewer-rs
//
// Defines the decoded attribute set, sample buffers, render artifacts, and serializable statistics.
//
// Thales Matheus Mendonça Santos - November 2025

use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

pub const DEFAULT_DIMENSION: u32 = 512;
pub const DEFAULT_BITS_ALLOCATED: u16 = 16;
pub const DEFAULT_WINDOW_CENTER: f64 = 127.0;
pub const DEFAULT_WINDOW_WIDTH: f64 = 256.0;
pub const UNKNOWN_MODALITY: &str = "Unknown";
pub const ANONYMOUS_PATIENT: &str = "Anonymous";
/// Largest grid the viewer will allocate for samples or a canvas (8192 x 8192).
pub const MAX_PIXELS: u64 = 64 * 1024 * 1024;

/// Signedness of stored pixel samples, from Pixel Representation (0028,0103).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PixelRepresentation {
    #[default]
    Unsigned,
    Signed,
}

impl PixelRepresentation {
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(Self::Unsigned),
            1 => Some(Self::Signed),
            _ => None,
        }
    }
}

impl fmt::Display for PixelRepresentation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsigned => f.write_str("Unsigned"),
            Self::Signed => f.write_str("Signed"),
        }
    }
}

/// Attributes extracted from a DICOM byte stream.
///
/// Every field starts at a placeholder and is only overwritten when the corresponding tag is present
/// and well formed, so a default value may mean "absent", "unparseable", or "really equal to the default".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DicomAttributes {
    pub width: u32,
    pub height: u32,
    pub bits_allocated: u16,
    pub pixel_representation: PixelRepresentation,
    pub rescale_slope: f64,
    pub rescale_intercept: f64,
    pub window_center: f64,
    pub window_width: f64,
    pub modality: String,
    pub patient_name_raw: String,
    /// `YYYY-MM-DD`.
    pub study_date: String,
}

impl Default for DicomAttributes {
    fn default() -> Self {
        Self {
            width: DEFAULT_DIMENSION,
            height: DEFAULT_DIMENSION,
            bits_allocated: DEFAULT_BITS_ALLOCATED,
            pixel_representation: PixelRepresentation::Unsigned,
            rescale_slope: 1.0,
            rescale_intercept: 0.0,
            window_center: DEFAULT_WINDOW_CENTER,
            window_width: DEFAULT_WINDOW_WIDTH,
            modality: UNKNOWN_MODALITY.to_string(),
            patient_name_raw: ANONYMOUS_PATIENT.to_string(),
            study_date: chrono::Local::now().format("%Y-%m-%d").to_string(),
        }
    }
}

impl DicomAttributes {
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Whether the declared grid fits the [`MAX_PIXELS`] budget.
    pub fn fits_pixel_budget(&self) -> bool {
        u64::from(self.width) * u64::from(self.height) <= MAX_PIXELS
    }

    /// Bytes per stored sample, or `None` when the allocation is not one we can decode.
    pub fn bytes_per_sample(&self) -> Option<usize> {
        match self.bits_allocated {
            8 => Some(1),
            16 => Some(2),
            _ => None,
        }
    }

    /// Patient name with DICOM `^` component separators turned into spaces.
    /// Returns `None` for the anonymous placeholder.
    pub fn display_patient_name(&self) -> Option<String> {
        let name = self.patient_name_raw.trim();
        if name.is_empty() || name == ANONYMOUS_PATIENT {
            return None;
        }
        let joined = name
            .split('^')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        (!joined.is_empty()).then_some(joined)
    }
}

/// Rescaled samples in row-major order, `width * height` long.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelSampleBuffer {
    width: u32,
    height: u32,
    samples: Vec<f32>,
}

impl PixelSampleBuffer {
    /// Returns `None` when the sample count does not match the grid.
    pub fn new(width: u32, height: u32, samples: Vec<f32>) -> Option<Self> {
        (samples.len() == width as usize * height as usize).then_some(Self {
            width,
            height,
            samples,
        })
    }

    /// Build a grid by evaluating `f(x, y)` in row-major order.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> f32) -> Self {
        let mut samples = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                samples.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            samples,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.samples
    }

    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.samples
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }
}

/// Which stage of the decode pipeline produced the pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodeTier {
    /// A full DICOM engine parsed the file.
    Structured,
    /// The built-in tag walker and pixel-data scan.
    Heuristic,
    /// Pixels were synthesized; attributes may still come from the tag walk.
    Synthetic,
}

impl fmt::Display for DecodeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Structured => f.write_str("structured"),
            Self::Heuristic => f.write_str("heuristic"),
            Self::Synthetic => f.write_str("synthetic"),
        }
    }
}

/// Output of [`crate::decoder::DicomDecoder::parse`].
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub attributes: DicomAttributes,
    pub pixels: PixelSampleBuffer,
    pub tier: DecodeTier,
}

/// Encoded raster plus the dimensions it was drawn at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl RenderedImage {
    pub const MIME_TYPE: &'static str = "image/jpeg";

    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", Self::MIME_TYPE, BASE64.encode(&self.bytes))
    }
}

/// Aggregate statistics over rescaled samples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleStatistics {
    pub min: f32,
    pub max: f32,
    pub mean: f32,
    pub std_dev: f32,
    pub total_pixels: usize,
    pub shape: Vec<usize>,
}

/// Histogram buckets alongside the observed range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleHistogram {
    pub bins: Vec<u64>,
    pub min: f32,
    pub max: f32,
}
