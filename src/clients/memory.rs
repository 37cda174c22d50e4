//! In-memory backends for the matcher, object store and record store.
//!
//! Selected with `backend = "memory"` in config. Useful for local development
//! without cloud credentials, and exercised directly by the integration
//! tests. Matching is exact-bytes with similarity 100: two submissions of the
//! same image are "the same face".

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::clients::dynamodb::{RecordStore, RecordStoreError};
use crate::clients::rekognition::{FaceMatch, FaceMatcher, IndexedFace, MatcherError};
use crate::clients::s3::{ObjectStore, ObjectStoreError};
use crate::models::{LoginLogRecord, UserRecord};

/// Images smaller than this are treated as containing no detectable face.
const MIN_FACE_BYTES: usize = 8;

#[derive(Debug)]
struct EnrolledFace {
    face_id: String,
    bytes: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct MemoryMatcher {
    faces: RwLock<Vec<EnrolledFace>>,
}

impl MemoryMatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FaceMatcher for MemoryMatcher {
    async fn search_by_image(
        &self,
        image: &[u8],
        max_candidates: i32,
        min_similarity: f32,
    ) -> Result<Vec<FaceMatch>, MatcherError> {
        let faces = self.faces.read().await;
        let matches = faces
            .iter()
            .filter(|face| face.bytes == image)
            .map(|face| FaceMatch {
                face_id: face.face_id.clone(),
                similarity: 100.0,
            })
            .filter(|candidate| candidate.similarity >= min_similarity)
            .take(usize::try_from(max_candidates).unwrap_or(1))
            .collect();

        Ok(matches)
    }

    async fn index_face(
        &self,
        image: &[u8],
        _external_id: &str,
    ) -> Result<Option<IndexedFace>, MatcherError> {
        if image.len() < MIN_FACE_BYTES {
            return Ok(None);
        }

        let face_id = Uuid::new_v4().to_string();
        self.faces.write().await.push(EnrolledFace {
            face_id: face_id.clone(),
            bytes: image.to_vec(),
        });

        Ok(Some(IndexedFace { face_id }))
    }
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl MemoryObjectStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    users: RwLock<HashMap<String, UserRecord>>,
    logs: RwLock<Vec<LoginLogRecord>>,
    bootstrap_claimed: AtomicBool,
}

impl MemoryRecordStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the audit log, oldest first.
    pub async fn login_logs(&self) -> Vec<LoginLogRecord> {
        self.logs.read().await.clone()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get_user(&self, face_id: &str) -> Result<Option<UserRecord>, RecordStoreError> {
        Ok(self.users.read().await.get(face_id).cloned())
    }

    async fn put_user(&self, user: &UserRecord) -> Result<(), RecordStoreError> {
        self.users
            .write()
            .await
            .insert(user.face_id.clone(), user.clone());
        Ok(())
    }

    async fn scan_users(&self) -> Result<Vec<UserRecord>, RecordStoreError> {
        Ok(self.users.read().await.values().cloned().collect())
    }

    async fn any_admin_exists(&self) -> Result<bool, RecordStoreError> {
        Ok(self.users.read().await.values().any(|user| user.is_admin))
    }

    async fn try_claim_admin_bootstrap(&self) -> Result<bool, RecordStoreError> {
        Ok(self
            .bootstrap_claimed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok())
    }

    async fn release_admin_bootstrap(&self) -> Result<(), RecordStoreError> {
        self.bootstrap_claimed.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn put_login_log(&self, record: &LoginLogRecord) -> Result<(), RecordStoreError> {
        self.logs.write().await.push(record.clone());
        Ok(())
    }
}
