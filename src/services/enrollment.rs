//! Registers new faces with the matcher and the external stores.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::clients::dynamodb::{RecordStore, RecordStoreError};
use crate::clients::rekognition::{FaceMatcher, MatcherError};
use crate::clients::s3::{ObjectStore, ObjectStoreError};
use crate::models::UserRecord;

#[derive(Debug, Error)]
pub enum EnrollError {
    #[error("Admin already exists")]
    AdminAlreadyExists,

    #[error("User already exists")]
    DuplicateUser,

    #[error("No face detected")]
    NoFaceDetected,

    #[error(transparent)]
    Matcher(#[from] MatcherError),

    #[error(transparent)]
    ObjectStore(#[from] ObjectStoreError),

    #[error(transparent)]
    RecordStore(#[from] RecordStoreError),
}

#[derive(Debug, Clone, Copy)]
enum Role {
    Admin,
    User,
}

impl Role {
    const fn prefix(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }
}

pub struct EnrollmentService {
    matcher: Arc<dyn FaceMatcher>,
    objects: Arc<dyn ObjectStore>,
    records: Arc<dyn RecordStore>,
    similarity_threshold: f32,
    default_balance: Decimal,
}

impl EnrollmentService {
    #[must_use]
    pub fn new(
        matcher: Arc<dyn FaceMatcher>,
        objects: Arc<dyn ObjectStore>,
        records: Arc<dyn RecordStore>,
        similarity_threshold: f32,
        default_balance: Decimal,
    ) -> Self {
        Self {
            matcher,
            objects,
            records,
            similarity_threshold,
            default_balance,
        }
    }

    /// Creates the first administrator. Permitted only while no admin exists;
    /// the record-store claim makes the check-then-create atomic.
    pub async fn enroll_admin(&self, image: &[u8], name: &str) -> Result<UserRecord, EnrollError> {
        if self.records.any_admin_exists().await? {
            return Err(EnrollError::AdminAlreadyExists);
        }

        if !self.records.try_claim_admin_bootstrap().await? {
            return Err(EnrollError::AdminAlreadyExists);
        }

        match self.index_and_persist(image, name, Role::Admin).await {
            Ok(record) => Ok(record),
            Err(e) => {
                // Give a later bootstrap attempt a chance; losing the release
                // only means bootstrap needs operator intervention.
                if let Err(release_err) = self.records.release_admin_bootstrap().await {
                    warn!(error = %release_err, "Failed to release bootstrap claim");
                }
                Err(e)
            }
        }
    }

    /// Enrolls a regular user. The caller is responsible for the admin gate.
    pub async fn enroll_user(&self, image: &[u8], name: &str) -> Result<UserRecord, EnrollError> {
        // Duplicate check is lenient on matcher failure: enrollment proceeds
        // rather than blocking on a flaky backend.
        match self
            .matcher
            .search_by_image(image, 1, self.similarity_threshold)
            .await
        {
            Ok(matches) if !matches.is_empty() => return Err(EnrollError::DuplicateUser),
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "Duplicate check failed, proceeding with enrollment");
            }
        }

        self.index_and_persist(image, name, Role::User).await
    }

    async fn index_and_persist(
        &self,
        image: &[u8],
        name: &str,
        role: Role,
    ) -> Result<UserRecord, EnrollError> {
        let prefix = role.prefix();
        let image_key = format!(
            "{prefix}_{name}_{}.jpg",
            Utc::now().format("%Y%m%d_%H%M%S")
        );

        // Not rolled back if indexing fails below; orphaned objects are an
        // accepted inconsistency.
        self.objects
            .put(&image_key, image.to_vec(), "image/jpeg")
            .await?;

        let external_id = format!("{prefix}_{}", external_id_safe(name));
        let indexed = self
            .matcher
            .index_face(image, &external_id)
            .await?
            .ok_or(EnrollError::NoFaceDetected)?;

        let record = match role {
            Role::Admin => UserRecord {
                face_id: indexed.face_id,
                name: name.to_string(),
                is_admin: true,
                account_number: None,
                account_balance: None,
                created_at: Utc::now(),
                image_key,
            },
            Role::User => UserRecord {
                face_id: indexed.face_id,
                name: name.to_string(),
                is_admin: false,
                account_number: Some(generate_account_number()),
                account_balance: Some(self.default_balance),
                created_at: Utc::now(),
                image_key,
            },
        };

        self.records.put_user(&record).await?;
        Ok(record)
    }
}

/// 8-character uppercase opaque token, assigned once per user.
fn generate_account_number() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_uppercase()
}

/// The matcher restricts external ids to a narrow character set.
fn external_id_safe(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
