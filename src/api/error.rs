use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use super::types::StatusResponse;
use crate::clients::dynamodb::RecordStoreError;
use crate::clients::s3::ObjectStoreError;

/// Catch-all for unexpected failures. Domain outcomes (no match, duplicate,
/// unauthorized) never become an `ApiError`; they are structured
/// `{success: false, message}` bodies built by the handlers.
#[derive(Debug)]
pub enum ApiError {
    InternalError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let ApiError::InternalError(msg) = self;
        tracing::error!("Internal error: {}", msg);

        // The catch-all reports the raw error text.
        let body = StatusResponse::error(msg);
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

impl From<RecordStoreError> for ApiError {
    fn from(err: RecordStoreError) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

impl From<ObjectStoreError> for ApiError {
    fn from(err: ObjectStoreError) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

impl ApiError {
    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::InternalError(msg.into())
    }
}
