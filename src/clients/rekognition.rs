//! Face matcher interface and the Rekognition-backed implementation.
//!
//! The matcher owns face detection, template storage and similarity ranking.
//! This service only submits images and interprets ranked candidates.

use async_trait::async_trait;
use aws_sdk_rekognition::primitives::Blob;
use aws_sdk_rekognition::types::{Image, QualityFilter};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MatcherError {
    #[error("face matcher request failed: {0}")]
    Request(String),
}

/// A ranked candidate returned by the matcher for a query image.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceMatch {
    pub face_id: String,
    pub similarity: f32,
}

/// Result of indexing an enrollment image into the collection.
#[derive(Debug, Clone)]
pub struct IndexedFace {
    pub face_id: String,
}

/// External face-recognition service.
///
/// `search_by_image` returns candidates at or above `min_similarity`, best
/// first. `index_face` returns `None` when the image contains no detectable
/// face.
#[async_trait]
pub trait FaceMatcher: Send + Sync {
    async fn search_by_image(
        &self,
        image: &[u8],
        max_candidates: i32,
        min_similarity: f32,
    ) -> Result<Vec<FaceMatch>, MatcherError>;

    async fn index_face(
        &self,
        image: &[u8],
        external_id: &str,
    ) -> Result<Option<IndexedFace>, MatcherError>;
}

/// AWS Rekognition collection-backed matcher.
#[derive(Debug, Clone)]
pub struct RekognitionMatcher {
    client: aws_sdk_rekognition::Client,
    collection_id: String,
}

impl RekognitionMatcher {
    #[must_use]
    pub fn new(sdk_config: &aws_config::SdkConfig, collection_id: impl Into<String>) -> Self {
        Self {
            client: aws_sdk_rekognition::Client::new(sdk_config),
            collection_id: collection_id.into(),
        }
    }

    fn image(bytes: &[u8]) -> Image {
        Image::builder().bytes(Blob::new(bytes.to_vec())).build()
    }
}

#[async_trait]
impl FaceMatcher for RekognitionMatcher {
    async fn search_by_image(
        &self,
        image: &[u8],
        max_candidates: i32,
        min_similarity: f32,
    ) -> Result<Vec<FaceMatch>, MatcherError> {
        let response = self
            .client
            .search_faces_by_image()
            .collection_id(&self.collection_id)
            .image(Self::image(image))
            .max_faces(max_candidates)
            .face_match_threshold(min_similarity)
            .send()
            .await
            .map_err(|e| MatcherError::Request(e.to_string()))?;

        let matches = response
            .face_matches()
            .iter()
            .filter_map(|candidate| {
                let face_id = candidate.face()?.face_id()?.to_string();
                Some(FaceMatch {
                    face_id,
                    similarity: candidate.similarity().unwrap_or(0.0),
                })
            })
            .collect();

        Ok(matches)
    }

    async fn index_face(
        &self,
        image: &[u8],
        external_id: &str,
    ) -> Result<Option<IndexedFace>, MatcherError> {
        let response = self
            .client
            .index_faces()
            .collection_id(&self.collection_id)
            .image(Self::image(image))
            .external_image_id(external_id)
            .max_faces(1)
            .quality_filter(QualityFilter::Auto)
            .send()
            .await
            .map_err(|e| MatcherError::Request(e.to_string()))?;

        let indexed = response
            .face_records()
            .iter()
            .filter_map(|record| record.face()?.face_id())
            .next()
            .map(|face_id| IndexedFace {
                face_id: face_id.to_string(),
            });

        Ok(indexed)
    }
}
