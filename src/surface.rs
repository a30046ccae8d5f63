//
// surface.rs
// Dicom-Viewer-rs
//
// Drawing-surface capability used by the renderer, with an in-memory implementation on top of the image crate.
//
// Thales Matheus Mendonça Santos - November 2025

use font8x8::{UnicodeFonts, BASIC_FONTS, LATIN_FONTS};
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, Rgb, Rgba, RgbImage, RgbaImage};

use crate::error::{ViewerError, ViewerResult};
use crate::models::MAX_PIXELS;

/// Glyph cell edge in unscaled pixels.
pub const GLYPH_SIZE: u32 = 8;

/// An RGBA canvas that can be painted on and encoded.
pub trait RasterSurface {
    fn canvas(&self) -> &RgbaImage;

    fn canvas_mut(&mut self) -> &mut RgbaImage;

    fn width(&self) -> u32 {
        self.canvas().width()
    }

    fn height(&self) -> u32 {
        self.canvas().height()
    }

    /// Source-over blend of a translucent color onto a rectangle, clipped to the canvas.
    fn blend_rect(&mut self, x: u32, y: u32, width: u32, height: u32, color: Rgba<u8>) {
        let canvas = self.canvas_mut();
        let x_end = x.saturating_add(width).min(canvas.width());
        let y_end = y.saturating_add(height).min(canvas.height());
        let alpha = f32::from(color[3]) / 255.0;

        for py in y.min(y_end)..y_end {
            for px in x.min(x_end)..x_end {
                let dst = canvas.get_pixel_mut(px, py);
                for c in 0..3 {
                    let blended = f32::from(color[c]) * alpha + f32::from(dst[c]) * (1.0 - alpha);
                    dst[c] = blended.round().clamp(0.0, 255.0) as u8;
                }
            }
        }
    }

    /// Draw a single line of text with its top-left corner at `(x, y)`.
    fn draw_text(&mut self, x: i64, y: i64, text: &str, color: Rgba<u8>, scale: u32);

    /// Width in pixels that [`draw_text`](Self::draw_text) would cover.
    fn text_width(&self, text: &str, scale: u32) -> u32 {
        text.chars().count() as u32 * GLYPH_SIZE * scale
    }

    fn encode_jpeg(&self, quality: u8) -> ViewerResult<Vec<u8>>;
}

/// Hands out surfaces. Failing to allocate is the renderer's only hard error.
pub trait SurfaceProvider {
    type Surface: RasterSurface;

    fn allocate(&self, width: u32, height: u32) -> ViewerResult<Self::Surface>;
}

/// Surface backed by an `RgbaImage` buffer.
#[derive(Debug, Clone)]
pub struct ImageSurface {
    canvas: RgbaImage,
}

impl ImageSurface {
    pub fn from_canvas(canvas: RgbaImage) -> Self {
        Self { canvas }
    }

    pub fn into_canvas(self) -> RgbaImage {
        self.canvas
    }
}

fn glyph(c: char) -> [u8; 8] {
    BASIC_FONTS
        .get(c)
        .or_else(|| LATIN_FONTS.get(c))
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or([0; 8])
}

impl RasterSurface for ImageSurface {
    fn canvas(&self) -> &RgbaImage {
        &self.canvas
    }

    fn canvas_mut(&mut self) -> &mut RgbaImage {
        &mut self.canvas
    }

    fn draw_text(&mut self, x: i64, y: i64, text: &str, color: Rgba<u8>, scale: u32) {
        let scale = i64::from(scale.max(1));
        let cell = i64::from(GLYPH_SIZE) * scale;
        let (width, height) = (i64::from(self.canvas.width()), i64::from(self.canvas.height()));

        for (index, c) in text.chars().enumerate() {
            let origin_x = x + index as i64 * cell;
            // font8x8 rows are top to bottom, bit 0 is the leftmost column.
            for (row, bits) in glyph(c).iter().enumerate() {
                for col in 0..GLYPH_SIZE as i64 {
                    if bits & (1 << col) == 0 {
                        continue;
                    }
                    for dy in 0..scale {
                        for dx in 0..scale {
                            let px = origin_x + col * scale + dx;
                            let py = y + row as i64 * scale + dy;
                            if (0..width).contains(&px) && (0..height).contains(&py) {
                                self.canvas.put_pixel(px as u32, py as u32, color);
                            }
                        }
                    }
                }
            }
        }
    }

    fn encode_jpeg(&self, quality: u8) -> ViewerResult<Vec<u8>> {
        // JPEG has no alpha channel; the canvas is opaque anyway.
        let rgb: RgbImage = RgbImage::from_fn(self.canvas.width(), self.canvas.height(), |x, y| {
            let p = self.canvas.get_pixel(x, y);
            Rgb([p[0], p[1], p[2]])
        });

        let mut output = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut output, quality.clamp(1, 100));
        encoder.encode(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            ExtendedColorType::Rgb8,
        )?;
        Ok(output)
    }
}

/// Allocates [`ImageSurface`]s up to a pixel budget.
#[derive(Debug, Clone, Copy)]
pub struct ImageSurfaceProvider {
    pub max_pixels: u64,
}

impl Default for ImageSurfaceProvider {
    fn default() -> Self {
        Self {
            max_pixels: MAX_PIXELS,
        }
    }
}

impl SurfaceProvider for ImageSurfaceProvider {
    type Surface = ImageSurface;

    fn allocate(&self, width: u32, height: u32) -> ViewerResult<ImageSurface> {
        let unavailable = |reason: &str| ViewerError::RenderingUnavailable {
            width,
            height,
            reason: reason.to_string(),
        };

        if width == 0 || height == 0 {
            return Err(unavailable("empty canvas"));
        }
        if width > u32::from(u16::MAX) || height > u32::from(u16::MAX) {
            return Err(unavailable("canvas exceeds JPEG dimension limit"));
        }
        if u64::from(width) * u64::from(height) > self.max_pixels {
            return Err(unavailable("canvas exceeds pixel budget"));
        }

        Ok(ImageSurface {
            canvas: RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255])),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_rejects_empty_and_oversized_canvases() {
        let provider = ImageSurfaceProvider { max_pixels: 100 };
        assert!(matches!(
            provider.allocate(0, 10),
            Err(ViewerError::RenderingUnavailable { .. })
        ));
        assert!(provider.allocate(11, 10).is_err());
        let surface = provider.allocate(10, 10).expect("surface");
        assert_eq!((surface.width(), surface.height()), (10, 10));
    }

    #[test]
    fn blend_rect_mixes_with_existing_pixels() {
        let mut surface =
            ImageSurface::from_canvas(RgbaImage::from_pixel(4, 4, Rgba([200, 200, 200, 255])));
        surface.blend_rect(0, 0, 2, 10, Rgba([0, 0, 0, 178]));
        assert_eq!(surface.canvas().get_pixel(0, 3)[0], 60);
        assert_eq!(surface.canvas().get_pixel(3, 0)[0], 200);
    }

    #[test]
    fn text_is_drawn_and_clipped() {
        let mut surface = ImageSurface::from_canvas(RgbaImage::new(20, 8));
        let white = Rgba([255, 255, 255, 255]);
        surface.draw_text(-4, 0, "HI!", white, 1);
        assert!(surface.canvas().pixels().any(|p| *p == white));
        assert_eq!(surface.text_width("HI!", 2), 48);
    }

    #[test]
    fn accented_characters_have_glyphs() {
        assert_ne!(glyph('é'), [0; 8]);
        assert_eq!(glyph('\u{2603}'), glyph('?'));
    }

    #[test]
    fn jpeg_output_has_soi_marker() {
        let surface = ImageSurfaceProvider::default()
            .allocate(16, 16)
            .expect("surface");
        let bytes = surface.encode_jpeg(95).expect("jpeg");
        assert!(bytes.starts_with(&[0xFF, 0xD8]));
    }
}
