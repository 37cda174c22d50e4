use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;

use super::auth::current_user;
use super::types::{AccountInfoResponse, StatusResponse, UsersResponse};
use super::{ApiError, AppState};

/// GET /api/account-info — requires any authenticated session.
pub async fn account_info(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Response, ApiError> {
    let Some(user) = current_user(&session).await? else {
        return Ok(Json(StatusResponse::failed("Not logged in")).into_response());
    };

    let Some(info) = state.accounts.account_info(&user.user_id).await? else {
        return Ok(Json(StatusResponse::failed("User not found")).into_response());
    };

    Ok(Json(AccountInfoResponse {
        success: true,
        name: info.name,
        account_number: info.account_number,
        balance: info.balance,
    })
    .into_response())
}

/// GET /api/users — admin only.
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Response, ApiError> {
    let is_admin = current_user(&session)
        .await?
        .is_some_and(|user| user.is_admin);
    if !is_admin {
        return Ok(Json(StatusResponse::failed("Admin access required")).into_response());
    }

    let users = state.accounts.list_users().await?;
    Ok(Json(UsersResponse {
        success: true,
        users,
    })
    .into_response())
}
