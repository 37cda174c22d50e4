//! Read-only projections over enrolled-user records.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::clients::dynamodb::{RecordStore, RecordStoreError};
use crate::models::UserSummary;

#[derive(Debug, Clone, Serialize)]
pub struct AccountInfo {
    pub name: String,
    pub account_number: String,
    pub balance: Decimal,
}

pub struct AccountService {
    records: Arc<dyn RecordStore>,
}

impl AccountService {
    #[must_use]
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self { records }
    }

    /// Profile of one user, or `None` when the record is gone.
    pub async fn account_info(
        &self,
        face_id: &str,
    ) -> Result<Option<AccountInfo>, RecordStoreError> {
        let user = self.records.get_user(face_id).await?;

        Ok(user.map(|user| AccountInfo {
            name: user.name.clone(),
            account_number: user
                .account_number
                .clone()
                .unwrap_or_else(|| "N/A".to_string()),
            balance: user.account_balance.unwrap_or_default(),
        }))
    }

    /// All enrolled users, for the admin dashboard.
    pub async fn list_users(&self) -> Result<Vec<UserSummary>, RecordStoreError> {
        let users = self.records.scan_users().await?;
        Ok(users.iter().map(UserSummary::from).collect())
    }
}
