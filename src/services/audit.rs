//! Best-effort audit trail of login attempts.

use std::sync::Arc;

use tracing::warn;

use crate::clients::dynamodb::RecordStore;
use crate::models::{LoginLogRecord, UserRecord};

/// Appends login-attempt records. A failed write never fails the login
/// request it describes; it is logged and dropped.
pub struct AuditService {
    records: Arc<dyn RecordStore>,
}

impl AuditService {
    #[must_use]
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self { records }
    }

    pub async fn record_success(&self, user: &UserRecord, confidence: f32) {
        self.append(LoginLogRecord::success(user, confidence)).await;
    }

    pub async fn record_failure(&self, reason: &str) {
        self.append(LoginLogRecord::failure(reason)).await;
    }

    async fn append(&self, record: LoginLogRecord) {
        if let Err(e) = self.records.put_login_log(&record).await {
            warn!(
                action = record.action.as_str(),
                error = %e,
                "Failed to write login audit record"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::memory::MemoryRecordStore;
    use crate::models::LoginAction;
    use chrono::Utc;

    fn sample_user() -> UserRecord {
        UserRecord {
            face_id: "face-1".to_string(),
            name: "Alice".to_string(),
            is_admin: false,
            account_number: Some("AB12CD34".to_string()),
            account_balance: None,
            created_at: Utc::now(),
            image_key: "user_Alice_20260101_000000.jpg".to_string(),
        }
    }

    #[tokio::test]
    async fn success_and_failure_both_append_one_record() {
        let store = Arc::new(MemoryRecordStore::new());
        let audit = AuditService::new(store.clone());

        audit.record_success(&sample_user(), 99.2).await;
        audit.record_failure("Face not recognized").await;

        let logs = store.login_logs().await;
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].action, LoginAction::LoginSuccess);
        assert_eq!(logs[0].user_id.as_deref(), Some("face-1"));
        assert_eq!(logs[0].confidence, Some(99.2));
        assert_eq!(logs[1].action, LoginAction::LoginFailed);
        assert!(logs[1].user_id.is_none());
    }
}
