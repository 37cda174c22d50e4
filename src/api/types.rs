use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::UserSummary;

/// Plain `{success, message}` / `{success, error}` outcome body.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            error: None,
        }
    }

    /// Failure carrying raw error text instead of a user-facing message.
    pub fn error(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

impl LoginResponse {
    pub fn granted(name: &str, confidence: f32) -> Self {
        Self {
            success: true,
            message: format!("Welcome {name}!"),
            confidence: Some(confidence),
            redirect: Some("/dashboard".to_string()),
        }
    }

    pub fn denied() -> Self {
        Self {
            success: false,
            message: "Face not recognized".to_string(),
            confidence: None,
            redirect: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AccountInfoResponse {
    pub success: bool,
    pub name: String,
    pub account_number: String,
    pub balance: Decimal,
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub success: bool,
    pub users: Vec<UserSummary>,
}
