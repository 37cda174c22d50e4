//! Record store interface and the DynamoDB-backed implementation.
//!
//! Holds enrolled-user records keyed by face id and the append-only login
//! audit log. Single-item get/put/scan only, no multi-step transactions;
//! the one coordination primitive is the conditional bootstrap claim.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{LoginLogRecord, UserRecord};

/// Reserved key for the first-admin bootstrap claim. Never a real face id
/// (matcher-assigned ids are UUIDs).
const BOOTSTRAP_CLAIM_KEY: &str = "#bootstrap-admin";

#[derive(Debug, Error)]
pub enum RecordStoreError {
    #[error("record store request failed: {0}")]
    Request(String),

    #[error("malformed record for key {0}")]
    Malformed(String),
}

/// External key-value store for user and audit-log records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_user(&self, face_id: &str) -> Result<Option<UserRecord>, RecordStoreError>;

    async fn put_user(&self, user: &UserRecord) -> Result<(), RecordStoreError>;

    async fn scan_users(&self) -> Result<Vec<UserRecord>, RecordStoreError>;

    async fn any_admin_exists(&self) -> Result<bool, RecordStoreError>;

    /// Atomically claim the right to create the first admin. Returns `false`
    /// when the claim is already held. Closes the race between two concurrent
    /// bootstrap requests that would both pass a plain existence check.
    async fn try_claim_admin_bootstrap(&self) -> Result<bool, RecordStoreError>;

    /// Release a claim taken by [`Self::try_claim_admin_bootstrap`] after a
    /// failed enrollment, so bootstrap can be retried.
    async fn release_admin_bootstrap(&self) -> Result<(), RecordStoreError>;

    async fn put_login_log(&self, record: &LoginLogRecord) -> Result<(), RecordStoreError>;
}

#[derive(Debug, Clone)]
pub struct DynamoRecordStore {
    client: aws_sdk_dynamodb::Client,
    users_table: String,
    logs_table: String,
}

impl DynamoRecordStore {
    #[must_use]
    pub fn new(
        sdk_config: &aws_config::SdkConfig,
        users_table: impl Into<String>,
        logs_table: impl Into<String>,
    ) -> Self {
        Self {
            client: aws_sdk_dynamodb::Client::new(sdk_config),
            users_table: users_table.into(),
            logs_table: logs_table.into(),
        }
    }
}

fn request_error(e: impl std::fmt::Display) -> RecordStoreError {
    RecordStoreError::Request(e.to_string())
}

fn user_to_item(user: &UserRecord) -> HashMap<String, AttributeValue> {
    let mut item = HashMap::new();
    item.insert(
        "face_id".to_string(),
        AttributeValue::S(user.face_id.clone()),
    );
    item.insert("name".to_string(), AttributeValue::S(user.name.clone()));
    item.insert("is_admin".to_string(), AttributeValue::Bool(user.is_admin));
    item.insert(
        "created_at".to_string(),
        AttributeValue::S(user.created_at.to_rfc3339()),
    );
    item.insert(
        "image_key".to_string(),
        AttributeValue::S(user.image_key.clone()),
    );
    if let Some(number) = &user.account_number {
        item.insert(
            "account_number".to_string(),
            AttributeValue::S(number.clone()),
        );
    }
    if let Some(balance) = &user.account_balance {
        item.insert(
            "account_balance".to_string(),
            AttributeValue::S(balance.to_string()),
        );
    }
    item
}

fn item_to_user(item: &HashMap<String, AttributeValue>) -> Result<UserRecord, RecordStoreError> {
    let string_field = |name: &str| -> Option<String> {
        item.get(name).and_then(|v| v.as_s().ok()).cloned()
    };

    let face_id =
        string_field("face_id").ok_or_else(|| RecordStoreError::Malformed("face_id".into()))?;
    let name = string_field("name")
        .ok_or_else(|| RecordStoreError::Malformed(face_id.clone()))?;
    let created_at = string_field("created_at")
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map_or_else(Utc::now, |dt| dt.with_timezone(&Utc));

    Ok(UserRecord {
        face_id,
        name,
        is_admin: item
            .get("is_admin")
            .and_then(|v| v.as_bool().ok())
            .copied()
            .unwrap_or(false),
        account_number: string_field("account_number"),
        account_balance: string_field("account_balance")
            .and_then(|s| s.parse::<Decimal>().ok()),
        created_at,
        image_key: string_field("image_key").unwrap_or_default(),
    })
}

fn log_to_item(record: &LoginLogRecord) -> HashMap<String, AttributeValue> {
    let mut item = HashMap::new();
    item.insert(
        "log_id".to_string(),
        AttributeValue::S(record.log_id.clone()),
    );
    item.insert(
        "action".to_string(),
        AttributeValue::S(record.action.as_str().to_string()),
    );
    item.insert(
        "timestamp".to_string(),
        AttributeValue::S(record.timestamp.to_rfc3339()),
    );
    if let Some(user_id) = &record.user_id {
        item.insert("user_id".to_string(), AttributeValue::S(user_id.clone()));
    }
    if let Some(user_name) = &record.user_name {
        item.insert(
            "user_name".to_string(),
            AttributeValue::S(user_name.clone()),
        );
    }
    if let Some(confidence) = record.confidence {
        item.insert(
            "confidence".to_string(),
            AttributeValue::S(confidence.to_string()),
        );
    }
    if let Some(reason) = &record.reason {
        item.insert("reason".to_string(), AttributeValue::S(reason.clone()));
    }
    item
}

#[async_trait]
impl RecordStore for DynamoRecordStore {
    async fn get_user(&self, face_id: &str) -> Result<Option<UserRecord>, RecordStoreError> {
        let response = self
            .client
            .get_item()
            .table_name(&self.users_table)
            .key("face_id", AttributeValue::S(face_id.to_string()))
            .send()
            .await
            .map_err(request_error)?;

        response.item().map(item_to_user).transpose()
    }

    async fn put_user(&self, user: &UserRecord) -> Result<(), RecordStoreError> {
        self.client
            .put_item()
            .table_name(&self.users_table)
            .set_item(Some(user_to_item(user)))
            .send()
            .await
            .map_err(request_error)?;

        Ok(())
    }

    async fn scan_users(&self) -> Result<Vec<UserRecord>, RecordStoreError> {
        let response = self
            .client
            .scan()
            .table_name(&self.users_table)
            .send()
            .await
            .map_err(request_error)?;

        let users = response
            .items()
            .iter()
            .filter(|item| {
                item.get("face_id")
                    .and_then(|v| v.as_s().ok())
                    .is_some_and(|id| id != BOOTSTRAP_CLAIM_KEY)
            })
            .map(item_to_user)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(users)
    }

    async fn any_admin_exists(&self) -> Result<bool, RecordStoreError> {
        let response = self
            .client
            .scan()
            .table_name(&self.users_table)
            .filter_expression("is_admin = :admin AND face_id <> :claim")
            .expression_attribute_values(":admin", AttributeValue::Bool(true))
            .expression_attribute_values(":claim", AttributeValue::S(BOOTSTRAP_CLAIM_KEY.into()))
            .send()
            .await
            .map_err(request_error)?;

        Ok(!response.items().is_empty())
    }

    async fn try_claim_admin_bootstrap(&self) -> Result<bool, RecordStoreError> {
        let result = self
            .client
            .put_item()
            .table_name(&self.users_table)
            .item("face_id", AttributeValue::S(BOOTSTRAP_CLAIM_KEY.into()))
            .item("claimed_at", AttributeValue::S(Utc::now().to_rfc3339()))
            .condition_expression("attribute_not_exists(face_id)")
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_conditional_check_failed_exception() {
                    Ok(false)
                } else {
                    Err(request_error(service_err))
                }
            }
        }
    }

    async fn release_admin_bootstrap(&self) -> Result<(), RecordStoreError> {
        self.client
            .delete_item()
            .table_name(&self.users_table)
            .key("face_id", AttributeValue::S(BOOTSTRAP_CLAIM_KEY.into()))
            .send()
            .await
            .map_err(request_error)?;

        Ok(())
    }

    async fn put_login_log(&self, record: &LoginLogRecord) -> Result<(), RecordStoreError> {
        self.client
            .put_item()
            .table_name(&self.logs_table)
            .set_item(Some(log_to_item(record)))
            .send()
            .await
            .map_err(request_error)?;

        Ok(())
    }
}
