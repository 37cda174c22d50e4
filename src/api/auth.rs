use std::sync::Arc;

use axum::{
    Json,
    extract::{Request, State},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::warn;

use super::submission::read_image_submission;
use super::types::{LoginResponse, StatusResponse};
use super::{ApiError, AppState};
use crate::services::Resolution;

pub const SESSION_USER_KEY: &str = "user";

/// Identity and role bound to a browser session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    pub user_id: String,
    pub user_name: String,
    pub is_admin: bool,
}

pub async fn current_user(session: &Session) -> Result<Option<SessionUser>, ApiError> {
    session
        .get::<SessionUser>(SESSION_USER_KEY)
        .await
        .map_err(|e| ApiError::internal(format!("Session error: {e}")))
}

async fn start_session(session: &Session, user: SessionUser) -> Result<(), ApiError> {
    session
        .insert(SESSION_USER_KEY, user)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create session: {e}")))
}

/// POST /api/login
///
/// Resolves the submitted face and grants a user session. Matcher failures
/// are absorbed into "not recognized": a backend outage must never read as
/// anything but a declined login here.
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    request: Request,
) -> Result<Response, ApiError> {
    let submission = match read_image_submission(&state, request).await {
        Ok(submission) => submission,
        Err(e) => return Ok(Json(StatusResponse::failed(e.to_string())).into_response()),
    };

    let resolution = match state.identity.resolve(&submission.image).await {
        Ok(resolution) => resolution,
        Err(e) => {
            warn!(error = %e, "Matcher failed during login, treating as no match");
            Resolution::NoMatch
        }
    };

    if let Resolution::Match {
        face_id,
        similarity,
    } = resolution
    {
        if let Some(user) = state.records.get_user(&face_id).await? {
            state.audit.record_success(&user, similarity).await;

            start_session(
                &session,
                SessionUser {
                    user_id: user.face_id.clone(),
                    user_name: user.name.clone(),
                    is_admin: user.is_admin,
                },
            )
            .await?;

            return Ok(Json(LoginResponse::granted(&user.name, similarity)).into_response());
        }
    }

    state.audit.record_failure("Face not recognized").await;
    Ok(Json(LoginResponse::denied()).into_response())
}

/// POST /api/admin-login
///
/// Unlike `/api/login`, a matcher failure here is reported to the caller
/// with its error text, and no audit record is written.
pub async fn admin_login(
    State(state): State<Arc<AppState>>,
    session: Session,
    request: Request,
) -> Result<Response, ApiError> {
    let submission = match read_image_submission(&state, request).await {
        Ok(submission) => submission,
        Err(e) => return Ok(Json(StatusResponse::failed(e.to_string())).into_response()),
    };

    let resolution = match state.identity.resolve(&submission.image).await {
        Ok(resolution) => resolution,
        Err(e) => return Ok(Json(StatusResponse::error(e.to_string())).into_response()),
    };

    if let Resolution::Match { face_id, .. } = resolution {
        if let Some(user) = state.records.get_user(&face_id).await? {
            if user.is_admin {
                start_session(
                    &session,
                    SessionUser {
                        user_id: user.face_id.clone(),
                        user_name: user.name.clone(),
                        is_admin: true,
                    },
                )
                .await?;

                return Ok(Json(StatusResponse::ok("Admin authenticated")).into_response());
            }
        }
    }

    Ok(Json(StatusResponse::failed("Admin not recognized")).into_response())
}

/// POST /api/logout
pub async fn logout(session: Session) -> Result<Json<StatusResponse>, ApiError> {
    session
        .flush()
        .await
        .map_err(|e| ApiError::internal(format!("Session error: {e}")))?;

    Ok(Json(StatusResponse::ok("Logged out successfully")))
}
