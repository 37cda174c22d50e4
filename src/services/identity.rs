//! Resolves a submitted image into an enrolled identity.

use std::sync::Arc;

use crate::clients::rekognition::{FaceMatcher, MatcherError};

/// Outcome of matching a query image against the enrolled gallery.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    NoMatch,
    Match { face_id: String, similarity: f32 },
}

/// Queries the matcher for the single best candidate at or above the
/// configured similarity threshold.
///
/// Matcher errors are returned to the caller; the login and admin-login
/// handlers apply different policies to them.
pub struct IdentityService {
    matcher: Arc<dyn FaceMatcher>,
    similarity_threshold: f32,
}

impl IdentityService {
    #[must_use]
    pub fn new(matcher: Arc<dyn FaceMatcher>, similarity_threshold: f32) -> Self {
        Self {
            matcher,
            similarity_threshold,
        }
    }

    pub async fn resolve(&self, image: &[u8]) -> Result<Resolution, MatcherError> {
        let candidates = self
            .matcher
            .search_by_image(image, 1, self.similarity_threshold)
            .await?;

        // The matcher already applies the threshold; filtering again keeps a
        // misbehaving backend from turning a weak candidate into a grant.
        let resolution = candidates
            .into_iter()
            .find(|candidate| candidate.similarity >= self.similarity_threshold)
            .map_or(Resolution::NoMatch, |candidate| Resolution::Match {
                face_id: candidate.face_id,
                similarity: candidate.similarity,
            });

        Ok(resolution)
    }
}
