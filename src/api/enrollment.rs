use std::sync::Arc;

use axum::{
    Json,
    extract::{Request, State},
    response::{IntoResponse, Response},
};
use tower_sessions::Session;

use super::auth::current_user;
use super::submission::read_image_submission;
use super::types::StatusResponse;
use super::{ApiError, AppState};
use crate::services::EnrollError;

/// POST /api/create-first-admin
///
/// Open endpoint, usable only while no administrator exists.
pub async fn create_first_admin(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Response, ApiError> {
    let submission = match read_image_submission(&state, request).await {
        Ok(submission) => submission,
        Err(e) => return Ok(Json(StatusResponse::failed(e.to_string())).into_response()),
    };

    let Some(name) = submission.name else {
        return Ok(Json(StatusResponse::failed("Name is required")).into_response());
    };

    match state.enrollment.enroll_admin(&submission.image, &name).await {
        Ok(_) => Ok(Json(StatusResponse::ok(format!(
            "First admin {name} created successfully"
        )))
        .into_response()),
        Err(e) => enroll_failure(e),
    }
}

/// POST /api/add-user — admin only.
pub async fn add_user(
    State(state): State<Arc<AppState>>,
    session: Session,
    request: Request,
) -> Result<Response, ApiError> {
    let is_admin = current_user(&session)
        .await?
        .is_some_and(|user| user.is_admin);
    if !is_admin {
        return Ok(Json(StatusResponse::failed("Admin access required")).into_response());
    }

    let submission = match read_image_submission(&state, request).await {
        Ok(submission) => submission,
        Err(e) => return Ok(Json(StatusResponse::failed(e.to_string())).into_response()),
    };

    let Some(name) = submission.name else {
        return Ok(Json(StatusResponse::failed("Name is required")).into_response());
    };

    match state.enrollment.enroll_user(&submission.image, &name).await {
        Ok(_) => Ok(
            Json(StatusResponse::ok(format!("User {name} added successfully"))).into_response(),
        ),
        Err(e) => enroll_failure(e),
    }
}

/// Maps enrollment outcomes: expected rejections become polite messages,
/// backend failures fall through to the catch-all.
fn enroll_failure(error: EnrollError) -> Result<Response, ApiError> {
    match error {
        EnrollError::AdminAlreadyExists
        | EnrollError::DuplicateUser
        | EnrollError::NoFaceDetected => {
            Ok(Json(StatusResponse::failed(error.to_string())).into_response())
        }
        EnrollError::Matcher(e) => Err(ApiError::internal(e.to_string())),
        EnrollError::ObjectStore(e) => Err(e.into()),
        EnrollError::RecordStore(e) => Err(e.into()),
    }
}
