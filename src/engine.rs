//
// engine.rs
// Dicom-Viewer-rs
//
// Strategy seam for an optional full DICOM decoding engine, with a dicom-rs backed implementation.
//
// Thales Matheus Mendonça Santos - November 2025

use std::borrow::Cow;
use std::fmt;

use anyhow::{Context, Result};
use dicom::object::DefaultDicomObject;
use dicom_pixeldata::PixelDecoder;
use tracing::debug;

use crate::decoder::{self, tags, PREAMBLE_LEN};
use crate::dicom_access::ElementAccess;
use crate::models::{DicomAttributes, PixelSampleBuffer};

/// What a structured engine hands back. Pixels are optional: a file may parse cleanly
/// without carrying a payload the viewer can use.
#[derive(Debug, Clone)]
pub struct EngineOutput {
    pub attributes: DicomAttributes,
    pub pixels: Option<PixelSampleBuffer>,
}

/// A full DICOM parser the decoder may delegate to before using its own tag walk.
pub trait DecodeEngine: Send + Sync {
    fn name(&self) -> &'static str;

    /// Decode a complete file buffer, preamble included.
    fn decode(&self, bytes: &[u8]) -> Result<EngineOutput>;
}

/// Capability check for the structured tier.
pub enum ExternalDecodeEngine {
    Available(Box<dyn DecodeEngine>),
    Unavailable,
}

impl ExternalDecodeEngine {
    pub fn dicom_rs() -> Self {
        Self::Available(Box::new(DicomRsEngine))
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Available(engine) => engine.name(),
            Self::Unavailable => "unavailable",
        }
    }
}

impl fmt::Debug for ExternalDecodeEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available(engine) => f.debug_tuple("Available").field(&engine.name()).finish(),
            Self::Unavailable => f.write_str("Unavailable"),
        }
    }
}

/// Engine backed by `dicom-object` for parsing and `dicom-pixeldata` for the payload, which
/// also covers encapsulated transfer syntaxes the built-in walker cannot read.
#[derive(Debug, Default, Clone, Copy)]
pub struct DicomRsEngine;

impl DecodeEngine for DicomRsEngine {
    fn name(&self) -> &'static str {
        "dicom-rs"
    }

    fn decode(&self, bytes: &[u8]) -> Result<EngineOutput> {
        // dicom-object expects the stream to start at the magic code.
        let stream = bytes
            .get(PREAMBLE_LEN..)
            .context("Buffer shorter than the DICOM preamble")?;
        let obj = dicom::object::from_reader(stream).context("Failed to parse DICOM stream")?;

        let attributes = extract_attributes(&obj);
        let pixels = if obj.has_element(tags::PIXEL_DATA) {
            pixel_payload(&obj).and_then(|raw| decoder::decode_samples(&raw, &attributes))
        } else {
            None
        };

        Ok(EngineOutput { attributes, pixels })
    }
}

/// Same acceptance rules as the tag walk, fed from parsed elements.
pub fn extract_attributes<T: ElementAccess>(obj: &T) -> DicomAttributes {
    let mut attrs = DicomAttributes::default();

    for tag in [
        tags::ROWS,
        tags::COLUMNS,
        tags::BITS_ALLOCATED,
        tags::PIXEL_REPRESENTATION,
    ] {
        if let Some(value) = obj.element_u16(tag) {
            decoder::apply_u16(&mut attrs, tag, value);
        }
    }

    for tag in [
        tags::WINDOW_CENTER,
        tags::WINDOW_WIDTH,
        tags::RESCALE_INTERCEPT,
        tags::RESCALE_SLOPE,
        tags::STUDY_DATE,
        tags::MODALITY,
        tags::PATIENT_NAME,
    ] {
        if let Some(text) = obj.element_str(tag) {
            decoder::apply_text(&mut attrs, tag, &text);
        }
    }

    attrs
}

fn pixel_payload(obj: &DefaultDicomObject) -> Option<Cow<'_, [u8]>> {
    match obj.decode_pixel_data() {
        Ok(decoded) => Some(Cow::Owned(decoded.data().to_vec())),
        Err(err) => {
            // Native payloads are still usable when the pixel module is incomplete.
            debug!(error = %err, "pixel decoder rejected the object, reading raw payload");
            obj.element_bytes(tags::PIXEL_DATA)
        }
    }
}
