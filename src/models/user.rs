use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One enrolled identity, keyed by the matcher-assigned face id.
///
/// Records are created by enrollment and never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// Opaque identifier assigned by the external matcher. The core never
    /// generates these.
    pub face_id: String,

    pub name: String,

    pub is_admin: bool,

    /// 8-character uppercase token, assigned once at enrollment. Admin
    /// records carry no account fields.
    pub account_number: Option<String>,

    /// Fixed-point balance, set to the configured default at enrollment and
    /// never mutated by this service.
    pub account_balance: Option<Decimal>,

    pub created_at: DateTime<Utc>,

    /// Object-store key of the enrollment photo.
    pub image_key: String,
}

/// Projection returned by the admin user listing.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub name: String,
    pub is_admin: bool,
    pub created_at: String,
    pub account_number: String,
}

impl From<&UserRecord> for UserSummary {
    fn from(user: &UserRecord) -> Self {
        Self {
            name: user.name.clone(),
            is_admin: user.is_admin,
            created_at: user.created_at.to_rfc3339(),
            account_number: user
                .account_number
                .clone()
                .unwrap_or_else(|| "N/A".to_string()),
        }
    }
}
