//
// decoder.rs
// Dicom-Viewer-rs
//
// Turns a raw .dcm byte stream into attributes and rescaled samples through a three-tier pipeline:
// structured engine, built-in tag walk with pixel-data scan, and synthesized pixels.
//
// Thales Matheus Mendonça Santos - November 2025

use dicom::core::Tag;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::cursor::ByteCursor;
use crate::engine::ExternalDecodeEngine;
use crate::models::{
    DecodeTier, DecodedImage, DicomAttributes, PixelRepresentation, PixelSampleBuffer,
    DEFAULT_DIMENSION,
};
use crate::synth;

pub const PREAMBLE_LEN: usize = 128;
pub const MAGIC: &[u8; 4] = b"DICM";
/// First byte after the preamble and magic code.
pub const DATASET_OFFSET: usize = PREAMBLE_LEN + MAGIC.len();

const UNDEFINED_LENGTH: u32 = 0xFFFF_FFFF;

/// Byte pattern of (7FE0,0010) as it appears in a little-endian stream.
const PIXEL_DATA_PATTERN: [u8; 4] = [0xE0, 0x7F, 0x10, 0x00];

/// Value representations whose length field is 4 bytes preceded by 2 reserved bytes.
const LONG_LENGTH_VRS: [&[u8; 2]; 6] = [b"OB", b"OW", b"OF", b"SQ", b"UT", b"UN"];

/// The attributes the viewer reads. Everything else is skipped.
pub mod tags {
    use dicom::core::Tag;

    pub const STUDY_DATE: Tag = Tag(0x0008, 0x0020);
    pub const MODALITY: Tag = Tag(0x0008, 0x0060);
    pub const PATIENT_NAME: Tag = Tag(0x0010, 0x0010);
    pub const ROWS: Tag = Tag(0x0028, 0x0010);
    pub const COLUMNS: Tag = Tag(0x0028, 0x0011);
    pub const BITS_ALLOCATED: Tag = Tag(0x0028, 0x0100);
    pub const PIXEL_REPRESENTATION: Tag = Tag(0x0028, 0x0103);
    pub const WINDOW_CENTER: Tag = Tag(0x0028, 0x1050);
    pub const WINDOW_WIDTH: Tag = Tag(0x0028, 0x1051);
    pub const RESCALE_INTERCEPT: Tag = Tag(0x0028, 0x1052);
    pub const RESCALE_SLOPE: Tag = Tag(0x0028, 0x1053);
    pub const PIXEL_DATA: Tag = Tag(0x7FE0, 0x0010);
}

/// Result of a single pipeline tier. A tier that cannot help says so instead of failing.
#[derive(Debug, Clone, PartialEq)]
pub enum TierOutcome<T> {
    Decoded(T),
    NotApplicable,
}

impl<T> From<Option<T>> for TierOutcome<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::NotApplicable, Self::Decoded)
    }
}

/// Header of one explicit-VR little-endian element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementHeader {
    pub tag: Tag,
    pub vr: [u8; 2],
    pub length: u32,
}

impl ElementHeader {
    pub fn has_undefined_length(&self) -> bool {
        self.length == UNDEFINED_LENGTH
    }
}

pub fn has_long_length(vr: &[u8; 2]) -> bool {
    LONG_LENGTH_VRS.contains(&vr)
}

/// Read tag, VR, and length. On success the cursor sits on the first value byte.
pub fn read_element_header(cursor: &mut ByteCursor<'_>) -> Option<ElementHeader> {
    let group = cursor.read_u16_le()?;
    let element = cursor.read_u16_le()?;
    let vr = cursor.read_array::<2>()?;
    let length = if has_long_length(&vr) {
        cursor.skip(2)?;
        cursor.read_u32_le()?
    } else {
        u32::from(cursor.read_u16_le()?)
    };
    Some(ElementHeader {
        tag: Tag(group, element),
        vr,
        length,
    })
}

pub fn has_dicm_marker(bytes: &[u8]) -> bool {
    bytes.get(PREAMBLE_LEN..DATASET_OFFSET) == Some(MAGIC.as_slice())
}

/// Decimal string value: first of a backslash-separated list, padding removed.
pub fn parse_decimal_text(text: &str) -> Option<f64> {
    let first = text.split('\\').next()?;
    let value: f64 = trim_padding(first).parse().ok()?;
    value.is_finite().then_some(value)
}

/// `YYYYMMDD` to `YYYY-MM-DD`; anything other than exactly eight ASCII digits is rejected.
pub fn normalize_study_date(text: &str) -> Option<String> {
    let text = trim_padding(text);
    if text.len() != 8 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(format!("{}-{}-{}", &text[..4], &text[4..6], &text[6..]))
}

fn trim_padding(text: &str) -> &str {
    text.trim_matches(|c: char| c.is_whitespace() || c == '\0')
}

/// Record a 16-bit attribute. Zero dimensions and unknown pixel representations are ignored.
pub fn apply_u16(attrs: &mut DicomAttributes, tag: Tag, value: u16) {
    match tag {
        tags::ROWS if value > 0 => attrs.height = u32::from(value),
        tags::COLUMNS if value > 0 => attrs.width = u32::from(value),
        tags::BITS_ALLOCATED if value > 0 => attrs.bits_allocated = value,
        tags::PIXEL_REPRESENTATION => {
            if let Some(repr) = PixelRepresentation::from_code(value) {
                attrs.pixel_representation = repr;
            }
        }
        _ => {}
    }
}

/// Record a text attribute. Malformed values leave the current value in place.
pub fn apply_text(attrs: &mut DicomAttributes, tag: Tag, text: &str) {
    match tag {
        tags::WINDOW_CENTER => {
            if let Some(v) = parse_decimal_text(text) {
                attrs.window_center = v;
            }
        }
        tags::WINDOW_WIDTH => {
            if let Some(v) = parse_decimal_text(text) {
                attrs.window_width = v;
            }
        }
        tags::RESCALE_INTERCEPT => {
            if let Some(v) = parse_decimal_text(text) {
                attrs.rescale_intercept = v;
            }
        }
        tags::RESCALE_SLOPE => {
            if let Some(v) = parse_decimal_text(text) {
                attrs.rescale_slope = v;
            }
        }
        tags::STUDY_DATE => {
            if let Some(date) = normalize_study_date(text) {
                attrs.study_date = date;
            }
        }
        tags::MODALITY => set_trimmed(&mut attrs.modality, text),
        tags::PATIENT_NAME => set_trimmed(&mut attrs.patient_name_raw, text),
        _ => {}
    }
}

fn set_trimmed(field: &mut String, text: &str) {
    let text = trim_padding(text);
    if !text.is_empty() {
        *field = text.to_string();
    }
}

fn is_binary_u16(tag: Tag) -> bool {
    matches!(
        tag,
        tags::ROWS | tags::COLUMNS | tags::BITS_ALLOCATED | tags::PIXEL_REPRESENTATION
    )
}

fn is_text_tag(tag: Tag) -> bool {
    matches!(
        tag,
        tags::WINDOW_CENTER
            | tags::WINDOW_WIDTH
            | tags::RESCALE_INTERCEPT
            | tags::RESCALE_SLOPE
            | tags::STUDY_DATE
            | tags::MODALITY
            | tags::PATIENT_NAME
    )
}

/// Walk the explicit-VR element stream after the magic code and collect the known attributes.
///
/// The walk is partial: unknown elements are skipped by their declared length. It ends at the
/// end of the buffer, at an undefined length, or when a value would run past the end.
pub fn walk_tags(bytes: &[u8]) -> DicomAttributes {
    let mut attrs = DicomAttributes::default();
    let mut cursor = ByteCursor::at(bytes, DATASET_OFFSET);

    while let Some(header) = read_element_header(&mut cursor) {
        if header.has_undefined_length() {
            debug!(tag = ?header.tag, offset = cursor.position(), "undefined length, stopping walk");
            break;
        }
        let Some(value) = cursor.read_bytes(header.length as usize) else {
            debug!(tag = ?header.tag, length = header.length, "value runs past end of buffer");
            break;
        };

        if is_binary_u16(header.tag) {
            if let [lo, hi] = *value {
                apply_u16(&mut attrs, header.tag, u16::from_le_bytes([lo, hi]));
            }
        } else if is_text_tag(header.tag) {
            apply_text(&mut attrs, header.tag, &String::from_utf8_lossy(value));
        }
    }

    attrs
}

/// Find the Pixel Data payload by scanning for its tag bytes rather than walking.
///
/// The first occurrence after the magic code decides. Its declared length must cover the
/// whole grid and the bytes must actually be present.
pub fn find_pixel_data<'a>(bytes: &'a [u8], attrs: &DicomAttributes) -> Option<&'a [u8]> {
    let body = bytes.get(DATASET_OFFSET..)?;
    let found = body
        .windows(PIXEL_DATA_PATTERN.len())
        .position(|w| w == PIXEL_DATA_PATTERN)?;

    let mut cursor = ByteCursor::at(bytes, DATASET_OFFSET + found);
    let header = read_element_header(&mut cursor)?;
    let needed = attrs.pixel_count().checked_mul(attrs.bytes_per_sample()?)?;

    if header.has_undefined_length() || (header.length as usize) < needed {
        debug!(
            length = header.length,
            needed, "pixel data too short or encapsulated"
        );
        return None;
    }
    cursor.read_bytes(needed)
}

/// Decode stored samples and apply the rescale slope and intercept.
pub fn decode_samples(raw: &[u8], attrs: &DicomAttributes) -> Option<PixelSampleBuffer> {
    let bytes_per_sample = attrs.bytes_per_sample()?;
    let count = attrs.pixel_count();
    if raw.len() < count.checked_mul(bytes_per_sample)? {
        return None;
    }

    let slope = attrs.rescale_slope;
    let intercept = attrs.rescale_intercept;
    let signed = attrs.pixel_representation == PixelRepresentation::Signed;

    let samples = raw
        .chunks_exact(bytes_per_sample)
        .take(count)
        .map(|chunk| {
            let stored = match *chunk {
                [b] => f64::from(b),
                [lo, hi] if signed => f64::from(i16::from_le_bytes([lo, hi])),
                [lo, hi] => f64::from(u16::from_le_bytes([lo, hi])),
                _ => 0.0,
            };
            (stored * slope + intercept) as f32
        })
        .collect();

    PixelSampleBuffer::new(attrs.width, attrs.height, samples)
}

/// Tier 2: built-in pixel-data scan, given attributes from the tag walk.
pub fn heuristic_pixels(bytes: &[u8], attrs: &DicomAttributes) -> TierOutcome<PixelSampleBuffer> {
    find_pixel_data(bytes, attrs)
        .and_then(|raw| decode_samples(raw, attrs))
        .into()
}

/// Decoder front end. Never fails: every malformed input degrades to defaults or synthesized pixels.
pub struct DicomDecoder {
    engine: ExternalDecodeEngine,
}

impl Default for DicomDecoder {
    fn default() -> Self {
        Self::new(ExternalDecodeEngine::dicom_rs())
    }
}

impl DicomDecoder {
    pub fn new(engine: ExternalDecodeEngine) -> Self {
        Self { engine }
    }

    /// Decoder that relies on the built-in walker only.
    pub fn heuristic_only() -> Self {
        Self::new(ExternalDecodeEngine::Unavailable)
    }

    pub fn engine(&self) -> &ExternalDecodeEngine {
        &self.engine
    }

    pub fn parse(&self, bytes: &[u8]) -> DecodedImage {
        self.parse_with_rng(bytes, &mut rand::thread_rng())
    }

    /// Same as [`parse`](Self::parse) with an explicit noise source for the synthetic tier.
    pub fn parse_with_rng<R: Rng>(&self, bytes: &[u8], rng: &mut R) -> DecodedImage {
        if !has_dicm_marker(bytes) {
            debug!(len = bytes.len(), "no DICM marker at offset 128");
            return synthetic_fallback(DicomAttributes::default(), rng);
        }

        if let TierOutcome::Decoded(image) = self.structured_decode(bytes) {
            debug!(engine = self.engine.name(), "structured decode succeeded");
            return image;
        }

        let attributes = walk_tags(bytes);
        match heuristic_pixels(bytes, &attributes) {
            TierOutcome::Decoded(pixels) => {
                debug!(
                    width = attributes.width,
                    height = attributes.height,
                    "heuristic decode succeeded"
                );
                DecodedImage {
                    attributes,
                    pixels,
                    tier: DecodeTier::Heuristic,
                }
            }
            TierOutcome::NotApplicable => synthetic_fallback(attributes, rng),
        }
    }

    /// Tier 1: the external engine, when one is available and yields pixel data.
    fn structured_decode(&self, bytes: &[u8]) -> TierOutcome<DecodedImage> {
        let ExternalDecodeEngine::Available(engine) = &self.engine else {
            return TierOutcome::NotApplicable;
        };

        match engine.decode(bytes) {
            Ok(output) => match output.pixels {
                Some(pixels) => TierOutcome::Decoded(DecodedImage {
                    attributes: output.attributes,
                    pixels,
                    tier: DecodeTier::Structured,
                }),
                None => {
                    debug!(engine = engine.name(), "engine found no usable pixel data");
                    TierOutcome::NotApplicable
                }
            },
            Err(err) => {
                warn!(engine = engine.name(), error = %format!("{err:#}"), "structured decode failed, falling back");
                TierOutcome::NotApplicable
            }
        }
    }
}

/// Tier 3: keep the attributes and synthesize a placeholder scan. A grid over the pixel
/// budget counts as malformed and falls back to the default dimensions.
fn synthetic_fallback<R: Rng>(mut attributes: DicomAttributes, rng: &mut R) -> DecodedImage {
    if !attributes.fits_pixel_budget() {
        warn!(
            width = attributes.width,
            height = attributes.height,
            "declared grid exceeds pixel budget, using default dimensions"
        );
        attributes.width = DEFAULT_DIMENSION;
        attributes.height = DEFAULT_DIMENSION;
    }
    info!(
        width = attributes.width,
        height = attributes.height,
        "no pixel data found, synthesizing placeholder"
    );
    let pixels = synth::synthesize_pixels(attributes.width, attributes.height, rng);
    DecodedImage {
        attributes,
        pixels,
        tier: DecodeTier::Synthetic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn preamble() -> Vec<u8> {
        let mut out = vec![0u8; PREAMBLE_LEN];
        out.extend_from_slice(MAGIC);
        out
    }

    fn short_element(out: &mut Vec<u8>, tag: Tag, vr: &[u8; 2], value: &[u8]) {
        out.extend_from_slice(&tag.0.to_le_bytes());
        out.extend_from_slice(&tag.1.to_le_bytes());
        out.extend_from_slice(vr);
        out.extend_from_slice(&(value.len() as u16).to_le_bytes());
        out.extend_from_slice(value);
    }

    fn long_element(out: &mut Vec<u8>, tag: Tag, vr: &[u8; 2], value: &[u8]) {
        out.extend_from_slice(&tag.0.to_le_bytes());
        out.extend_from_slice(&tag.1.to_le_bytes());
        out.extend_from_slice(vr);
        out.extend_from_slice(&[0, 0]);
        out.extend_from_slice(&(value.len() as u32).to_le_bytes());
        out.extend_from_slice(value);
    }

    #[test]
    fn header_uses_long_length_for_ob() {
        let mut buf = Vec::new();
        long_element(&mut buf, tags::PIXEL_DATA, b"OB", &[1, 2, 3, 4]);
        let mut cursor = ByteCursor::new(&buf);
        let header = read_element_header(&mut cursor).expect("header");
        assert_eq!(header.tag, tags::PIXEL_DATA);
        assert_eq!(header.length, 4);
        assert_eq!(cursor.position(), 12);
    }

    #[test]
    fn header_uses_short_length_for_us() {
        let mut buf = Vec::new();
        short_element(&mut buf, tags::ROWS, b"US", &256u16.to_le_bytes());
        let mut cursor = ByteCursor::new(&buf);
        let header = read_element_header(&mut cursor).expect("header");
        assert_eq!(header.length, 2);
        assert_eq!(cursor.position(), 8);
    }

    #[test]
    fn decimal_text_takes_first_value() {
        assert_eq!(parse_decimal_text(" 40\\400 "), Some(40.0));
        assert_eq!(parse_decimal_text("-1024.5\0"), Some(-1024.5));
        assert_eq!(parse_decimal_text("abc"), None);
        assert_eq!(parse_decimal_text("NaN"), None);
    }

    #[test]
    fn study_date_requires_eight_digits() {
        assert_eq!(normalize_study_date("20240115").as_deref(), Some("2024-01-15"));
        assert_eq!(normalize_study_date("2024-01-15"), None);
        assert_eq!(normalize_study_date("2024011"), None);
    }

    #[test]
    fn walk_skips_unknown_tags_and_reads_known_ones() {
        let mut buf = preamble();
        short_element(&mut buf, Tag(0x0008, 0x0016), b"UI", b"1.2.3\0");
        short_element(&mut buf, tags::MODALITY, b"CS", b"CT");
        long_element(&mut buf, Tag(0x0009, 0x0010), b"UN", &[0xAA; 7]);
        short_element(&mut buf, tags::WINDOW_CENTER, b"DS", b"40\\60 ");
        short_element(&mut buf, tags::WINDOW_WIDTH, b"DS", b"oops");
        short_element(&mut buf, tags::ROWS, b"US", &64u16.to_le_bytes());
        short_element(&mut buf, tags::COLUMNS, b"UL", &[0x40, 0, 0, 0]);

        let attrs = walk_tags(&buf);
        assert_eq!(attrs.modality, "CT");
        assert_eq!(attrs.window_center, 40.0);
        assert_eq!(attrs.window_width, 256.0);
        assert_eq!(attrs.height, 64);
        // Columns with a 4-byte value is not a 16-bit field.
        assert_eq!(attrs.width, 512);
    }

    #[test]
    fn walk_stops_on_truncated_value() {
        let mut buf = preamble();
        short_element(&mut buf, tags::MODALITY, b"CS", b"MR");
        buf.extend_from_slice(&[0x10, 0x00, 0x10, 0x00, b'P', b'N', 0xFF, 0x00, b'x']);
        let attrs = walk_tags(&buf);
        assert_eq!(attrs.modality, "MR");
        assert_eq!(attrs.patient_name_raw, "Anonymous");
    }

    #[test]
    fn signed_sixteen_bit_samples_are_twos_complement() {
        let mut attrs = DicomAttributes {
            width: 2,
            height: 1,
            pixel_representation: PixelRepresentation::Signed,
            rescale_slope: 2.0,
            rescale_intercept: 10.0,
            ..DicomAttributes::default()
        };
        let raw = [0xFF, 0xFF, 0x03, 0x00];
        let pixels = decode_samples(&raw, &attrs).expect("samples");
        assert_eq!(pixels.as_slice(), &[8.0, 16.0]);

        attrs.pixel_representation = PixelRepresentation::Unsigned;
        let pixels = decode_samples(&raw, &attrs).expect("samples");
        assert_eq!(pixels.as_slice(), &[65535.0 * 2.0 + 10.0, 16.0]);
    }

    #[test]
    fn eight_bit_samples_are_read_as_is() {
        let attrs = DicomAttributes {
            width: 2,
            height: 2,
            bits_allocated: 8,
            ..DicomAttributes::default()
        };
        let pixels = decode_samples(&[0, 64, 128, 255], &attrs).expect("samples");
        assert_eq!(pixels.as_slice(), &[0.0, 64.0, 128.0, 255.0]);
    }

    #[test]
    fn unsupported_bit_depth_yields_nothing() {
        let attrs = DicomAttributes {
            width: 1,
            height: 1,
            bits_allocated: 32,
            ..DicomAttributes::default()
        };
        assert!(decode_samples(&[0; 4], &attrs).is_none());
    }

    #[test]
    fn short_pixel_data_falls_through_to_synthesis() {
        let mut buf = preamble();
        short_element(&mut buf, tags::ROWS, b"US", &4u16.to_le_bytes());
        short_element(&mut buf, tags::COLUMNS, b"US", &4u16.to_le_bytes());
        short_element(&mut buf, tags::BITS_ALLOCATED, b"US", &8u16.to_le_bytes());
        long_element(&mut buf, tags::PIXEL_DATA, b"OB", &[7; 10]);

        let decoder = DicomDecoder::heuristic_only();
        let image = decoder.parse_with_rng(&buf, &mut StdRng::seed_from_u64(1));
        assert_eq!(image.tier, DecodeTier::Synthetic);
        assert_eq!(image.attributes.width, 4);
        assert_eq!(image.pixels.len(), 16);
    }

    #[test]
    fn heuristic_tier_decodes_pixel_payload() {
        let mut buf = preamble();
        short_element(&mut buf, tags::ROWS, b"US", &1u16.to_le_bytes());
        short_element(&mut buf, tags::COLUMNS, b"US", &3u16.to_le_bytes());
        short_element(&mut buf, tags::RESCALE_INTERCEPT, b"DS", b"-100");
        long_element(&mut buf, tags::PIXEL_DATA, b"OW", &[1, 0, 2, 0, 3, 0]);

        let decoder = DicomDecoder::heuristic_only();
        let image = decoder.parse(&buf);
        assert_eq!(image.tier, DecodeTier::Heuristic);
        assert_eq!(image.pixels.as_slice(), &[-99.0, -98.0, -97.0]);
    }

    #[test]
    fn undefined_length_stops_the_walk() {
        let mut buf = preamble();
        buf.extend_from_slice(&[0x08, 0x00, 0x15, 0x11, b'S', b'Q', 0, 0]);
        buf.extend_from_slice(&0xFFFF_FFFFu32.to_le_bytes());
        short_element(&mut buf, tags::MODALITY, b"CS", b"CT");

        let attrs = walk_tags(&buf);
        assert_eq!(attrs.modality, "Unknown");
    }

    #[test]
    fn encapsulated_pixel_data_is_not_decoded() {
        let mut buf = preamble();
        short_element(&mut buf, tags::ROWS, b"US", &2u16.to_le_bytes());
        short_element(&mut buf, tags::COLUMNS, b"US", &2u16.to_le_bytes());
        short_element(&mut buf, tags::BITS_ALLOCATED, b"US", &8u16.to_le_bytes());
        buf.extend_from_slice(&[0xE0, 0x7F, 0x10, 0x00, b'O', b'B', 0, 0]);
        buf.extend_from_slice(&0xFFFF_FFFFu32.to_le_bytes());
        buf.extend_from_slice(&[0xFE, 0xFF, 0x00, 0xE0, 4, 0, 0, 0, 1, 2, 3, 4]);

        let attrs = walk_tags(&buf);
        assert!(find_pixel_data(&buf, &attrs).is_none());

        let image = DicomDecoder::heuristic_only()
            .parse_with_rng(&buf, &mut StdRng::seed_from_u64(5));
        assert_eq!(image.tier, DecodeTier::Synthetic);
        assert_eq!(image.pixels.len(), 4);
    }

    #[test]
    fn zero_dimensions_are_ignored() {
        let mut buf = preamble();
        short_element(&mut buf, tags::ROWS, b"US", &0u16.to_le_bytes());
        short_element(&mut buf, tags::COLUMNS, b"US", &0u16.to_le_bytes());

        let attrs = walk_tags(&buf);
        assert_eq!((attrs.width, attrs.height), (512, 512));
    }

    #[test]
    fn oversized_grid_without_pixels_synthesizes_default_size() {
        let mut buf = preamble();
        short_element(&mut buf, tags::ROWS, b"US", &u16::MAX.to_le_bytes());
        short_element(&mut buf, tags::COLUMNS, b"US", &u16::MAX.to_le_bytes());

        let image = DicomDecoder::heuristic_only()
            .parse_with_rng(&buf, &mut StdRng::seed_from_u64(9));
        assert_eq!(image.tier, DecodeTier::Synthetic);
        assert_eq!((image.attributes.width, image.attributes.height), (512, 512));
        assert_eq!(image.pixels.len(), 512 * 512);
    }

    #[test]
    fn binary_payloads_are_not_read_as_text() {
        assert!(!is_text_tag(tags::PIXEL_DATA));
        assert!(!is_text_tag(Tag(0x0009, 0x0010)));
        assert!(is_text_tag(tags::MODALITY));
    }
}
