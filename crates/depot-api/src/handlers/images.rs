//! Image resize handlers
//!
//! `GET /image/resize/{width}/{height}/{p1}/{p2}/{filename}` — every terminal
//! outcome is a permanent redirect: to the grid-aligned URL, to a placeholder
//! when the source raster is gone, or to the (possibly just generated)
//! variant's public URL.

use axum::extract::{Path as RoutePath, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use depot_images::ResizeOutcome;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Resize request. A side of 0 means "unconstrained on that axis"; generated
/// URLs carry 0 explicitly when a side was left out.
pub async fn resize(
    State(state): State<AppState>,
    RoutePath((width, height, p1, p2, filename)): RoutePath<(i64, i64, String, String, String)>,
) -> ApiResult<Response> {
    if width < 0 || height < 0 {
        return Err(ApiError::bad_request(format!(
            "width and height must be non-negative, got {}x{}",
            width, height
        )));
    }

    // The filename stem is the image entity's identifier
    let stem = std::path::Path::new(&filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.clone());
    let uid = format!("file_image:{}", stem);

    let record = state.files.get(&uid).await?;

    let resolver = state.resolver.clone();
    let outcome = tokio::task::spawn_blocking(move || resolver.resolve(&record, width, height))
        .await
        .map_err(|e| ApiError::internal(e.to_string()))??;

    let location = match outcome {
        ResizeOutcome::RedirectAligned { width, height } => {
            debug!(width, height, "canonicalizing resize request");
            format!("/image/resize/{}/{}/{}/{}/{}", width, height, p1, p2, filename)
        }
        ResizeOutcome::RedirectPlaceholder { url } => url,
        ResizeOutcome::RedirectAsset { url } => url,
    };

    Ok(moved_permanently(&location))
}

fn moved_permanently(location: &str) -> Response {
    (
        StatusCode::MOVED_PERMANENTLY,
        [(header::LOCATION, location.to_string())],
    )
        .into_response()
}
