//! Image tool endpoints
//!
//! Endpoints:
//! - POST /convert - Transcode to png, jpeg or webp
//! - POST /compress - Re-encode as JPEG at a given quality
//! - POST /to-pdf - Wrap the image in a single-page PDF
//! - POST /resize - Stretch to an exact width and height (PNG)
//!
//! Each one answers `{"downloadLink": "..."}` pointing at the stored artifact.

use std::time::Instant;

use axum::{
    extract::{Multipart, State},
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use serde::Serialize;

use super::form::ImageForm;
use super::links;
use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::transform::{self, Operation, OutputFormat, TransformError};

/// Response for every tool endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadResponse {
    pub download_link: String,
}

/// Create the tools router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/convert", post(convert))
        .route("/compress", post(compress))
        .route("/to-pdf", post(to_pdf))
        .route("/resize", post(resize))
}

/// POST /convert
async fn convert(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<DownloadResponse>> {
    let mut form = ImageForm::from_multipart(multipart).await?;
    let image = form.take_image()?;
    let format = match form.field("format") {
        Some(raw) => raw
            .parse::<OutputFormat>()
            .map_err(|e| AppError::bad_request(e.to_string()))?,
        None => OutputFormat::default(),
    };

    produce(&state, &headers, Operation::Convert, format.extension(), move || {
        transform::convert(&image, format)
    })
    .await
}

/// POST /compress
async fn compress(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<DownloadResponse>> {
    let mut form = ImageForm::from_multipart(multipart).await?;
    let image = form.take_image()?;
    let quality = form.quality()?;

    produce(&state, &headers, Operation::Compress, "jpeg", move || {
        transform::compress(&image, quality)
    })
    .await
}

/// POST /to-pdf
async fn to_pdf(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<DownloadResponse>> {
    let mut form = ImageForm::from_multipart(multipart).await?;
    let image = form.take_image()?;

    produce(&state, &headers, Operation::ToPdf, "pdf", move || {
        transform::image_to_pdf(&image)
    })
    .await
}

/// POST /resize
async fn resize(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<DownloadResponse>> {
    let mut form = ImageForm::from_multipart(multipart).await?;
    let image = form.take_image()?;
    let (width, height) = form.dimensions()?;

    produce(&state, &headers, Operation::Resize, "png", move || {
        transform::resize(&image, width, height)
    })
    .await
}

/// Run `job` off the runtime, store its output and build the download link
async fn produce<F>(
    state: &AppState,
    headers: &HeaderMap,
    operation: Operation,
    extension: &str,
    job: F,
) -> Result<Json<DownloadResponse>>
where
    F: FnOnce() -> std::result::Result<Vec<u8>, TransformError> + Send + 'static,
{
    let started = Instant::now();

    let output = transform::run_blocking(state.config().transform_timeout(), job)
        .await
        .map_err(|e| AppError::transform(operation, e))?;

    let artifact = state
        .artifacts()
        .save(operation, extension, &output)
        .await
        .map_err(|e| AppError::store(operation, e))?;

    tracing::info!(
        operation = %operation,
        file_name = %artifact.file_name,
        size = artifact.size,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Artifact ready"
    );

    Ok(Json(DownloadResponse {
        download_link: links::download_link(state.config(), headers, &artifact.file_name),
    }))
}
