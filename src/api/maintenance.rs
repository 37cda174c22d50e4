use std::sync::Arc;

use axum::{Json, extract::State};

use super::types::StatusResponse;
use super::{ApiError, AppState};
use crate::services::cleanup_temp_uploads;

/// POST /api/cleanup-temp
///
/// Deletes spooled uploads older than the configured age. Unauthenticated,
/// matching the original maintenance hook; it only ever removes local temp
/// copies.
pub async fn cleanup_temp(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatusResponse>, ApiError> {
    let stats = cleanup_temp_uploads(state.uploads.dir(), state.upload_max_age())
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(Json(StatusResponse::ok(format!(
        "Removed {} stale upload(s), kept {}",
        stats.removed, stats.kept
    ))))
}
