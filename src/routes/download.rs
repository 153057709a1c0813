//! Artifact download route
//!
//! Serves stored artifacts as attachments so browsers save rather than
//! render them.

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};

use crate::error::Result;
use crate::state::AppState;

/// GET /download/:filename
pub async fn download(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
) -> Result<Response> {
    let data = state.artifacts().read(&file_name).await?;

    let content_type = mime_guess::from_path(&file_name)
        .first_or_octet_stream()
        .to_string();

    tracing::debug!(file_name = %file_name, size = data.len(), "Serving artifact");

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
        data,
    )
        .into_response())
}
