//
// overlay.rs
// Dicom-Viewer-rs
//
// Draws the translucent header/footer bars and the file, patient, modality, date and size captions.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::Path;

use image::Rgba;
use serde::{Deserialize, Serialize};

use crate::models::DicomAttributes;
use crate::surface::{RasterSurface, GLYPH_SIZE};

pub const BAR_HEIGHT: u32 = 30;
/// 70% black.
pub const BAR_COLOR: Rgba<u8> = Rgba([0, 0, 0, 179]);
pub const TEXT_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);
const MARGIN: u32 = 10;

/// Display name and byte size of the source file, shown in the top-left caption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayLabel {
    pub file_name: String,
    pub size_bytes: u64,
}

impl OverlayLabel {
    pub fn new(file_name: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            file_name: file_name.into(),
            size_bytes,
        }
    }

    pub fn caption(&self) -> String {
        format!(
            "{} ({:.1} Ko)",
            self.file_name,
            self.size_bytes as f64 / 1024.0
        )
    }
}

/// File name shown for a path, falling back to the whole path.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// The five captions; `patient` is absent when the name is unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayText {
    pub top_left: String,
    pub top_right: Option<String>,
    pub bottom_left: String,
    pub bottom_center: String,
    pub bottom_right: String,
}

impl OverlayText {
    pub fn new(attrs: &DicomAttributes, label: &OverlayLabel) -> Self {
        Self {
            top_left: label.caption(),
            top_right: attrs
                .display_patient_name()
                .map(|name| format!("Patient: {name}")),
            bottom_left: format!("Modalité: {}", attrs.modality),
            bottom_center: format!("{}x{}", attrs.width, attrs.height),
            bottom_right: format!("Date: {}", attrs.study_date),
        }
    }
}

/// Glyph scale for a canvas width: double-size text on large images.
pub fn text_scale(width: u32) -> u32 {
    if width >= 1024 {
        2
    } else {
        1
    }
}

pub fn draw_overlay<S: RasterSurface>(surface: &mut S, text: &OverlayText) {
    let width = surface.width();
    let height = surface.height();
    let scale = text_scale(width);
    let glyph_height = GLYPH_SIZE * scale;
    let inset = BAR_HEIGHT.saturating_sub(glyph_height) / 2;

    surface.blend_rect(0, 0, width, BAR_HEIGHT, BAR_COLOR);
    surface.blend_rect(0, height.saturating_sub(BAR_HEIGHT), width, BAR_HEIGHT, BAR_COLOR);

    let top = i64::from(inset);
    let bottom = i64::from(height) - i64::from(BAR_HEIGHT) + i64::from(inset);
    let left = i64::from(MARGIN);
    let right_aligned = |s: &S, line: &str| {
        i64::from(width) - i64::from(MARGIN) - i64::from(s.text_width(line, scale))
    };

    surface.draw_text(left, top, &text.top_left, TEXT_COLOR, scale);
    if let Some(patient) = &text.top_right {
        let x = right_aligned(surface, patient);
        surface.draw_text(x, top, patient, TEXT_COLOR, scale);
    }

    surface.draw_text(left, bottom, &text.bottom_left, TEXT_COLOR, scale);
    let x = right_aligned(surface, &text.bottom_right);
    surface.draw_text(x, bottom, &text.bottom_right, TEXT_COLOR, scale);

    let center_width = i64::from(surface.text_width(&text.bottom_center, scale));
    let x = (i64::from(width) - center_width) / 2;
    surface.draw_text(x, bottom, &text.bottom_center, TEXT_COLOR, scale);
}
