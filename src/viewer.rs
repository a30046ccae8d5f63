//
// viewer.rs
// Dicom-Viewer-rs
//
// Viewer controller: owns the current file's decode/render result and the display-time view state
// (zoom, rotation, fullscreen). One file is in flight at a time; a new load replaces the previous one.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::decoder::DicomDecoder;
use crate::error::{ViewerError, ViewerResult};
use crate::metadata::{self, MetadataMap};
use crate::models::{DecodeTier, DicomAttributes, RenderedImage};
use crate::overlay::{self, OverlayLabel};
use crate::renderer::{ImageRenderer, RenderOptions};
use crate::surface::{ImageSurfaceProvider, SurfaceProvider};

pub const MIN_ZOOM: f64 = 0.5;
pub const MAX_ZOOM: f64 = 3.0;
pub const ZOOM_STEP: f64 = 0.25;
pub const FULLSCREEN_ZOOM: f64 = 1.5;
pub const ROTATION_STEP: i64 = 90;

/// Display-time transform. Never baked into the encoded image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub zoom_factor: f64,
    /// Accumulated; only its value modulo 360 matters for display.
    pub rotation_degrees: i64,
    pub is_fullscreen: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            zoom_factor: 1.0,
            rotation_degrees: 0,
            is_fullscreen: false,
        }
    }
}

impl ViewState {
    pub fn zoom_in(&mut self) {
        self.zoom_factor = (self.zoom_factor + ZOOM_STEP).min(MAX_ZOOM);
    }

    pub fn zoom_out(&mut self) {
        self.zoom_factor = (self.zoom_factor - ZOOM_STEP).max(MIN_ZOOM);
    }

    pub fn rotate_clockwise(&mut self) {
        self.rotation_degrees += ROTATION_STEP;
    }

    pub fn rotate_counter_clockwise(&mut self) {
        self.rotation_degrees -= ROTATION_STEP;
    }

    /// Back to zoom 1 and no rotation. Fullscreen is left alone.
    pub fn reset(&mut self) {
        self.zoom_factor = 1.0;
        self.rotation_degrees = 0;
    }

    /// Mirror the platform's fullscreen state; entering forces 1.5x, leaving forces 1x.
    pub fn sync_fullscreen(&mut self, is_fullscreen: bool) {
        if self.is_fullscreen == is_fullscreen {
            return;
        }
        self.is_fullscreen = is_fullscreen;
        self.zoom_factor = if is_fullscreen { FULLSCREEN_ZOOM } else { 1.0 };
    }

    pub fn normalized_rotation(&self) -> i64 {
        self.rotation_degrees.rem_euclid(360)
    }

    pub fn css_transform(&self) -> String {
        format!(
            "scale({}) rotate({}deg)",
            self.zoom_factor, self.rotation_degrees
        )
    }
}

/// The platform's fullscreen switch. The viewer reads its state back after every request.
pub trait FullscreenApi {
    fn is_fullscreen(&self) -> bool;
    fn request_fullscreen(&mut self) -> Result<(), String>;
    fn exit_fullscreen(&mut self) -> Result<(), String>;
}

/// Fullscreen flag for hosts with no real display, such as the CLI and the web backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedFullscreen {
    active: bool,
}

impl FullscreenApi for DetachedFullscreen {
    fn is_fullscreen(&self) -> bool {
        self.active
    }

    fn request_fullscreen(&mut self) -> Result<(), String> {
        self.active = true;
        Ok(())
    }

    fn exit_fullscreen(&mut self) -> Result<(), String> {
        self.active = false;
        Ok(())
    }
}

/// Result of a successful load.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub label: OverlayLabel,
    pub attributes: DicomAttributes,
    pub tier: DecodeTier,
    pub rendered: RenderedImage,
    pub metadata: MetadataMap,
}

#[derive(Debug, Clone, Default)]
pub enum ViewerState {
    #[default]
    Empty,
    Loading {
        file_name: String,
    },
    Loaded(Box<LoadedImage>),
    Error(String),
}

pub struct ViewerController<F = DetachedFullscreen, P = ImageSurfaceProvider> {
    decoder: DicomDecoder,
    renderer: ImageRenderer<P>,
    options: RenderOptions,
    fullscreen: F,
    state: ViewerState,
    view: ViewState,
}

impl ViewerController {
    pub fn new(options: RenderOptions) -> Self {
        Self::with_parts(
            DicomDecoder::default(),
            ImageRenderer::default(),
            options,
            DetachedFullscreen::default(),
        )
    }
}

impl<F: FullscreenApi, P: SurfaceProvider> ViewerController<F, P> {
    pub fn with_parts(
        decoder: DicomDecoder,
        renderer: ImageRenderer<P>,
        options: RenderOptions,
        fullscreen: F,
    ) -> Self {
        let view = ViewState {
            is_fullscreen: fullscreen.is_fullscreen(),
            ..ViewState::default()
        };
        Self {
            decoder,
            renderer,
            options,
            fullscreen,
            state: ViewerState::Empty,
            view,
        }
    }

    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn loaded(&self) -> Option<&LoadedImage> {
        match &self.state {
            ViewerState::Loaded(image) => Some(image.as_ref()),
            _ => None,
        }
    }

    /// A file was picked or dropped; whatever was shown before is dropped.
    pub fn begin_load(&mut self, file_name: impl Into<String>) {
        self.state = ViewerState::Loading {
            file_name: file_name.into(),
        };
    }

    /// Decode and render bytes that are already in memory.
    pub fn open_bytes(&mut self, file_name: &str, bytes: &[u8]) -> ViewerResult<()> {
        self.begin_load(file_name);
        self.finish_load(file_name, bytes)
    }

    /// Read a file, then decode and render it. The read is the only suspension point.
    pub async fn open_path(&mut self, path: &Path) -> ViewerResult<()> {
        let file_name = overlay::display_name(path);
        self.begin_load(file_name.clone());

        match tokio::fs::read(path).await {
            Ok(bytes) => self.finish_load(&file_name, &bytes),
            Err(source) => Err(self.fail_load(ViewerError::BufferRead {
                path: path.to_path_buf(),
                source,
            })),
        }
    }

    fn finish_load(&mut self, file_name: &str, bytes: &[u8]) -> ViewerResult<()> {
        let label = OverlayLabel::new(file_name, bytes.len() as u64);
        let decoded = self.decoder.parse(bytes);

        match self.renderer.render(&decoded, &label, &self.options) {
            Ok(rendered) => {
                info!(
                    file = file_name,
                    tier = %decoded.tier,
                    jpeg_bytes = rendered.bytes.len(),
                    "image loaded"
                );
                let metadata = metadata::metadata_map(&decoded.attributes, decoded.tier, &label);
                self.state = ViewerState::Loaded(Box::new(LoadedImage {
                    label,
                    attributes: decoded.attributes,
                    tier: decoded.tier,
                    rendered,
                    metadata,
                }));
                Ok(())
            }
            Err(err) => Err(self.fail_load(err)),
        }
    }

    fn fail_load(&mut self, err: ViewerError) -> ViewerError {
        warn!(error = %err, "could not display image");
        self.state = ViewerState::Error(err.to_string());
        err
    }

    pub fn zoom_in(&mut self) {
        self.view.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.view.zoom_out();
    }

    pub fn rotate_clockwise(&mut self) {
        self.view.rotate_clockwise();
    }

    pub fn rotate_counter_clockwise(&mut self) {
        self.view.rotate_counter_clockwise();
    }

    pub fn reset_view(&mut self) {
        self.view.reset();
    }

    pub fn toggle_fullscreen(&mut self) -> ViewerResult<()> {
        let result = if self.fullscreen.is_fullscreen() {
            self.fullscreen.exit_fullscreen()
        } else {
            self.fullscreen.request_fullscreen()
        };
        self.on_fullscreen_change(self.fullscreen.is_fullscreen());
        result.map_err(ViewerError::Fullscreen)
    }

    /// Change notification from the platform, including changes the viewer did not ask for.
    pub fn on_fullscreen_change(&mut self, is_fullscreen: bool) {
        self.view.sync_fullscreen(is_fullscreen);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::ImageSurface;

    #[test]
    fn zoom_is_clamped_at_both_ends() {
        let mut view = ViewState::default();
        for _ in 0..20 {
            view.zoom_in();
        }
        assert_eq!(view.zoom_factor, 3.0);

        for _ in 0..20 {
            view.zoom_out();
        }
        assert_eq!(view.zoom_factor, 0.5);
    }

    #[test]
    fn rotation_accumulates_without_bound() {
        let mut view = ViewState::default();
        view.rotate_counter_clockwise();
        assert_eq!(view.rotation_degrees, -90);
        assert_eq!(view.normalized_rotation(), 270);
        for _ in 0..9 {
            view.rotate_clockwise();
        }
        assert_eq!(view.rotation_degrees, 720);
        assert_eq!(view.normalized_rotation(), 0);
        assert_eq!(view.css_transform(), "scale(1) rotate(720deg)");
    }

    #[test]
    fn reset_restores_zoom_and_rotation() {
        let mut view = ViewState::default();
        view.zoom_in();
        view.rotate_clockwise();
        view.reset();
        assert_eq!(view, ViewState::default());
    }

    #[test]
    fn fullscreen_toggle_forces_zoom() {
        let mut viewer = ViewerController::new(RenderOptions::default());
        viewer.zoom_out();
        viewer.toggle_fullscreen().expect("enter");
        assert!(viewer.view().is_fullscreen);
        assert_eq!(viewer.view().zoom_factor, 1.5);
        assert_eq!(viewer.view().css_transform(), "scale(1.5) rotate(0deg)");

        viewer.zoom_in();
        viewer.toggle_fullscreen().expect("exit");
        assert!(!viewer.view().is_fullscreen);
        assert_eq!(viewer.view().zoom_factor, 1.0);
    }

    #[test]
    fn repeated_change_events_do_not_reset_zoom() {
        let mut viewer = ViewerController::new(RenderOptions::default());
        viewer.on_fullscreen_change(true);
        viewer.zoom_in();
        viewer.on_fullscreen_change(true);
        assert_eq!(viewer.view().zoom_factor, 1.75);
    }

    struct Refusing;

    impl FullscreenApi for Refusing {
        fn is_fullscreen(&self) -> bool {
            false
        }

        fn request_fullscreen(&mut self) -> Result<(), String> {
            Err("not allowed".into())
        }

        fn exit_fullscreen(&mut self) -> Result<(), String> {
            Ok(())
        }
    }

    #[test]
    fn rejected_fullscreen_leaves_view_alone() {
        let mut viewer = ViewerController::with_parts(
            DicomDecoder::heuristic_only(),
            ImageRenderer::new(ImageSurfaceProvider::default()),
            RenderOptions::default(),
            Refusing,
        );
        assert!(matches!(
            viewer.toggle_fullscreen(),
            Err(ViewerError::Fullscreen(_))
        ));
        assert!(!viewer.view().is_fullscreen);
        assert_eq!(viewer.view().zoom_factor, 1.0);
    }

    #[test]
    fn loading_non_dicom_bytes_still_shows_something() {
        let mut viewer = ViewerController::new(RenderOptions::default());
        assert!(matches!(viewer.state(), ViewerState::Empty));

        viewer.open_bytes("notes.txt", b"plain text").expect("load");
        let loaded = viewer.loaded().expect("loaded");
        assert_eq!(loaded.tier, DecodeTier::Synthetic);
        assert_eq!((loaded.rendered.width, loaded.rendered.height), (512, 512));
        assert_eq!(loaded.metadata["fileSize"], "10");
    }

    struct NoSurface;

    impl SurfaceProvider for NoSurface {
        type Surface = ImageSurface;

        fn allocate(&self, width: u32, height: u32) -> ViewerResult<ImageSurface> {
            Err(ViewerError::RenderingUnavailable {
                width,
                height,
                reason: "no canvas".into(),
            })
        }
    }

    #[test]
    fn rendering_failure_moves_to_error_state() {
        let mut viewer = ViewerController::with_parts(
            DicomDecoder::heuristic_only(),
            ImageRenderer::new(NoSurface),
            RenderOptions::default(),
            DetachedFullscreen::default(),
        );
        let err = viewer.open_bytes("a.dcm", &[0; 8]).unwrap_err();
        assert!(matches!(err, ViewerError::RenderingUnavailable { .. }));
        assert!(matches!(viewer.state(), ViewerState::Error(_)));
        assert!(viewer.loaded().is_none());
    }

    #[tokio::test]
    async fn unreadable_path_is_a_buffer_read_failure() {
        let mut viewer = ViewerController::new(RenderOptions::default());
        let err = viewer
            .open_path(Path::new("/definitely/not/here.dcm"))
            .await
            .unwrap_err();
        assert!(matches!(err, ViewerError::BufferRead { .. }));
        assert!(matches!(viewer.state(), ViewerState::Error(_)));
    }
}
