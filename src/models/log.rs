use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::UserRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoginAction {
    #[serde(rename = "LOGIN_SUCCESS")]
    LoginSuccess,
    #[serde(rename = "LOGIN_FAILED")]
    LoginFailed,
}

impl LoginAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LoginSuccess => "LOGIN_SUCCESS",
            Self::LoginFailed => "LOGIN_FAILED",
        }
    }
}

/// Append-only audit entry for a login attempt. Never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginLogRecord {
    pub log_id: String,

    /// Absent on failed recognition.
    pub user_id: Option<String>,

    pub user_name: Option<String>,

    pub action: LoginAction,

    /// Similarity score, present only on success.
    pub confidence: Option<f32>,

    pub timestamp: DateTime<Utc>,

    /// Present only on failure.
    pub reason: Option<String>,
}

impl LoginLogRecord {
    #[must_use]
    pub fn success(user: &UserRecord, confidence: f32) -> Self {
        Self {
            log_id: Uuid::new_v4().to_string(),
            user_id: Some(user.face_id.clone()),
            user_name: Some(user.name.clone()),
            action: LoginAction::LoginSuccess,
            confidence: Some(confidence),
            timestamp: Utc::now(),
            reason: None,
        }
    }

    #[must_use]
    pub fn failure(reason: &str) -> Self {
        Self {
            log_id: Uuid::new_v4().to_string(),
            user_id: None,
            user_name: None,
            action: LoginAction::LoginFailed,
            confidence: None,
            timestamp: Utc::now(),
            reason: Some(reason.to_string()),
        }
    }
}
