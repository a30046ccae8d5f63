//
// renderer.rs
// Dicom-Viewer-rs
//
// Turns decoded samples into an annotated JPEG: window/level, optional contrast stretch, overlay, encode.
//
// Thales Matheus Mendonça Santos - November 2025

use image::{DynamicImage, Rgba, RgbaImage};
use tracing::debug;

use crate::contrast::{self, ContrastMode};
use crate::error::ViewerResult;
use crate::models::{DecodeTier, DecodedImage, DicomAttributes, PixelSampleBuffer, RenderedImage};
use crate::overlay::{self, OverlayLabel, OverlayText};
use crate::surface::{ImageSurface, ImageSurfaceProvider, RasterSurface, SurfaceProvider};
use crate::window::{Window, WindowSource};

pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Options controlling how decoded samples become a displayable image.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub jpeg_quality: u8,
    pub overlay: bool,
    pub contrast: ContrastMode,
    pub window: WindowSource,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            overlay: true,
            contrast: ContrastMode::Auto,
            window: WindowSource::Attributes,
        }
    }
}

impl RenderOptions {
    pub fn enhances(&self, tier: DecodeTier) -> bool {
        match self.contrast {
            ContrastMode::Never => false,
            ContrastMode::Always => true,
            ContrastMode::Auto => tier == DecodeTier::Synthetic,
        }
    }
}

pub struct ImageRenderer<P = ImageSurfaceProvider> {
    provider: P,
}

impl Default for ImageRenderer<ImageSurfaceProvider> {
    fn default() -> Self {
        Self::new(ImageSurfaceProvider::default())
    }
}

impl<P: SurfaceProvider> ImageRenderer<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Allocate a canvas of the attribute dimensions and write each windowed sample to R, G and B.
    pub fn grayscale_surface(
        &self,
        attrs: &DicomAttributes,
        samples: &PixelSampleBuffer,
        window: Window,
    ) -> ViewerResult<P::Surface> {
        let mut surface = self.provider.allocate(attrs.width, attrs.height)?;
        for (x, y, pixel) in surface.canvas_mut().enumerate_pixels_mut() {
            let value = samples
                .get(x, y)
                .map_or(0, |sample| window.apply(f64::from(sample)));
            *pixel = Rgba([value, value, value, 255]);
        }
        Ok(surface)
    }

    /// Everything up to, but not including, encoding.
    pub fn render_surface(
        &self,
        decoded: &DecodedImage,
        label: &OverlayLabel,
        options: &RenderOptions,
    ) -> ViewerResult<P::Surface> {
        let attrs = &decoded.attributes;
        let window = options.window.resolve(attrs, decoded.pixels.as_slice());
        let mut surface = self.grayscale_surface(attrs, &decoded.pixels, window)?;

        if options.enhances(decoded.tier) {
            contrast::apply_contrast_enhancement(surface.canvas_mut());
        }
        if options.overlay {
            overlay::draw_overlay(&mut surface, &OverlayText::new(attrs, label));
        }

        debug!(
            width = attrs.width,
            height = attrs.height,
            window_center = window.center,
            window_width = window.width,
            tier = %decoded.tier,
            "rendered canvas"
        );
        Ok(surface)
    }

    pub fn render(
        &self,
        decoded: &DecodedImage,
        label: &OverlayLabel,
        options: &RenderOptions,
    ) -> ViewerResult<RenderedImage> {
        let surface = self.render_surface(decoded, label, options)?;
        let bytes = surface.encode_jpeg(options.jpeg_quality)?;
        debug!(bytes = bytes.len(), "encoded jpeg");
        Ok(RenderedImage {
            bytes,
            width: surface.width(),
            height: surface.height(),
        })
    }
}

/// Standalone "enhance": grayscale the picture, stretch its histogram, re-encode as JPEG.
pub fn enhance_image(image: &DynamicImage, quality: u8) -> ViewerResult<RenderedImage> {
    let gray = image.to_luma8();
    let mut canvas = RgbaImage::from_fn(gray.width(), gray.height(), |x, y| {
        let v = gray.get_pixel(x, y)[0];
        Rgba([v, v, v, 255])
    });
    contrast::apply_contrast_enhancement(&mut canvas);

    let surface = ImageSurface::from_canvas(canvas);
    Ok(RenderedImage {
        bytes: surface.encode_jpeg(quality)?,
        width: surface.width(),
        height: surface.height(),
    })
}

/// [`enhance_image`] for an already encoded raster.
pub fn enhance_encoded(bytes: &[u8], quality: u8) -> ViewerResult<RenderedImage> {
    let image = image::load_from_memory(bytes)?;
    enhance_image(&image, quality)
}
