//
// web.rs
// Dicom-Viewer-rs
//
// Axum-based HTTP server: viewer page, upload → decode → render, rendered image, metadata and enhance APIs.
//
// Thales Matheus Mendonça Santos - November 2025

use std::fmt::Display;
use std::net::SocketAddr;

use anyhow::Context;
use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::contrast::ContrastMode;
use crate::decoder::DicomDecoder;
use crate::metadata::{self, MetadataMap};
use crate::models::RenderedImage;
use crate::overlay::OverlayLabel;
use crate::renderer::RenderOptions;
use crate::storage::FileStore;
use crate::viewer::{LoadedImage, ViewState, ViewerController};

#[derive(Clone)]
pub struct AppState {
    store: FileStore,
    options: RenderOptions,
}

impl AppState {
    pub fn new(store: FileStore, options: RenderOptions) -> Self {
        Self { store, options }
    }
}

type ApiResult<T> = Result<T, (StatusCode, String)>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/api/upload", post(upload_handler))
        .route("/api/image/:filename", get(image_handler))
        .route("/api/metadata/:filename", get(metadata_handler))
        .route("/api/enhance/:filename", get(enhance_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// Bootstraps the Axum HTTP server with uploads stored under `upload_dir`.
pub async fn start_server(host: &str, port: u16, upload_dir: &std::path::Path) -> anyhow::Result<()> {
    let state = AppState::new(FileStore::new(upload_dir)?, RenderOptions::default());
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", host, port))?;
    info!(%addr, upload_dir = %upload_dir.display(), "web viewer listening");
    println!("Server running at http://{}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn root_handler() -> Html<&'static str> {
    Html(include_str!("templates/index.html"))
}

async fn upload_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let mut original_name = None;
    let mut data = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_request)? {
        if field.name() == Some("file") {
            original_name = field.file_name().map(|s| s.to_string());
            data = Some(field.bytes().await.map_err(bad_request)?);
            break;
        }
    }

    let data = data.ok_or((StatusCode::BAD_REQUEST, "No file uploaded".to_string()))?;
    let stored = state
        .store
        .save(original_name.as_deref(), &data)
        .map_err(internal_error)?;

    let display_name = original_name.unwrap_or_else(|| stored.filename.clone());
    let loaded = render_bytes(&display_name, &data, state.options.clone()).map_err(internal_error)?;
    let view = ViewState::default();

    Ok(Json(json!({
        "success": true,
        "filename": stored.filename,
        "image": loaded.rendered.to_data_uri(),
        "width": loaded.rendered.width,
        "height": loaded.rendered.height,
        "tier": loaded.tier,
        "metadata": loaded.metadata,
        "view": {
            "zoomFactor": view.zoom_factor,
            "rotationDegrees": view.rotation_degrees,
            "isFullscreen": view.is_fullscreen,
            "transform": view.css_transform(),
        }
    })))
}

async fn image_handler(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let (_, bytes) = state.store.load(&filename).await.map_err(not_found)?;
    let loaded = render_bytes(&filename, &bytes, state.options.clone()).map_err(internal_error)?;
    Ok(jpeg_response(loaded.rendered))
}

async fn metadata_handler(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<Json<MetadataMap>> {
    let (_, bytes) = state.store.load(&filename).await.map_err(not_found)?;
    let decoded = DicomDecoder::default().parse(&bytes);
    let label = OverlayLabel::new(filename, bytes.len() as u64);
    Ok(Json(metadata::metadata_map(
        &decoded.attributes,
        decoded.tier,
        &label,
    )))
}

async fn enhance_handler(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let (_, bytes) = state.store.load(&filename).await.map_err(not_found)?;
    let options = RenderOptions {
        contrast: ContrastMode::Always,
        ..state.options.clone()
    };
    let loaded = render_bytes(&filename, &bytes, options).map_err(internal_error)?;
    Ok(jpeg_response(loaded.rendered))
}

/// Run one load through a fresh controller; uploads never share viewer state.
fn render_bytes(file_name: &str, bytes: &[u8], options: RenderOptions) -> anyhow::Result<LoadedImage> {
    let mut viewer = ViewerController::new(options);
    viewer.open_bytes(file_name, bytes)?;
    viewer
        .loaded()
        .cloned()
        .context("Viewer finished without an image")
}

fn jpeg_response(rendered: RenderedImage) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, RenderedImage::MIME_TYPE)], rendered.bytes)
}

fn bad_request<E: Display>(err: E) -> (StatusCode, String) {
    warn!(error = %err, "rejected request");
    (StatusCode::BAD_REQUEST, err.to_string())
}

fn internal_error<E: Display>(err: E) -> (StatusCode, String) {
    warn!(error = %err, "request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

fn not_found<E: Display>(err: E) -> (StatusCode, String) {
    warn!(error = %err, "file not found");
    (StatusCode::NOT_FOUND, err.to_string())
}
