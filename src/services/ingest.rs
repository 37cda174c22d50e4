//! Normalizes inbound images into raw bytes.
//!
//! Two submission forms are accepted: a multipart file upload (png/jpg/jpeg)
//! or a base64 text payload, optionally carrying a `data:...;base64,` prefix.

use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use thiserror::Error;
use uuid::Uuid;

const ALLOWED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Invalid image: {0}")]
    InvalidImage(String),
}

impl IngestError {
    fn invalid(detail: impl Into<String>) -> Self {
        Self::InvalidImage(detail.into())
    }
}

/// Decodes an embedded base64 image payload.
///
/// Splits on the first comma, matching data-URL submissions; a bare base64
/// string without a comma is accepted as-is.
pub fn decode_base64_image(payload: &str) -> Result<Vec<u8>, IngestError> {
    let encoded = payload
        .split_once(',')
        .map_or(payload, |(_, tail)| tail)
        .trim();

    if encoded.is_empty() {
        return Err(IngestError::invalid("empty payload"));
    }

    let bytes = BASE64
        .decode(encoded)
        .map_err(|e| IngestError::invalid(format!("malformed base64: {e}")))?;

    if bytes.is_empty() {
        return Err(IngestError::invalid("decoded image is empty"));
    }

    Ok(bytes)
}

/// Checks an uploaded filename against the allowed image extensions.
pub fn validate_extension(filename: &str) -> Result<(), IngestError> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .ok_or_else(|| IngestError::invalid(format!("missing extension on '{filename}'")))?;

    if ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        Ok(())
    } else {
        Err(IngestError::invalid(format!(
            "unsupported extension '.{extension}'"
        )))
    }
}

/// Spools uploaded files into the temp directory.
///
/// The spooled copy is independent of the in-memory bytes handed to the
/// matcher; losing it (e.g. to cleanup) never invalidates a request in
/// flight. Stale copies are removed by the maintenance service.
#[derive(Debug, Clone)]
pub struct UploadSpool {
    dir: PathBuf,
}

impl UploadSpool {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes a copy of an upload to the temp directory. Spooling is
    /// best-effort: a failed write is logged and the request continues with
    /// the in-memory bytes.
    pub async fn spool(&self, original_name: &str, bytes: &[u8]) {
        let target = self.dir.join(format!(
            "{}_{}",
            Uuid::new_v4().simple(),
            sanitize_filename(original_name)
        ));

        if let Err(e) = tokio::fs::create_dir_all(&self.dir).await {
            tracing::warn!(dir = %self.dir.display(), error = %e, "Failed to create upload temp dir");
            return;
        }

        if let Err(e) = tokio::fs::write(&target, bytes).await {
            tracing::warn!(file = %target.display(), error = %e, "Failed to spool upload");
        }
    }
}

fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_data_url_payload() {
        let encoded = BASE64.encode(b"fake image bytes");
        let payload = format!("data:image/jpeg;base64,{encoded}");
        assert_eq!(decode_base64_image(&payload).unwrap(), b"fake image bytes");
    }

    #[test]
    fn decodes_bare_base64_payload() {
        let encoded = BASE64.encode(b"fake image bytes");
        assert_eq!(decode_base64_image(&encoded).unwrap(), b"fake image bytes");
    }

    #[test]
    fn rejects_empty_and_malformed_payloads() {
        assert!(decode_base64_image("").is_err());
        assert!(decode_base64_image("data:image/png;base64,").is_err());
        assert!(decode_base64_image("!!!not-base64!!!").is_err());
    }

    #[test]
    fn accepts_known_extensions_case_insensitively() {
        assert!(validate_extension("me.png").is_ok());
        assert!(validate_extension("me.JPG").is_ok());
        assert!(validate_extension("selfie.jpeg").is_ok());
    }

    #[test]
    fn rejects_unknown_or_missing_extensions() {
        assert!(validate_extension("me.gif").is_err());
        assert!(validate_extension("me.png.exe").is_err());
        assert!(validate_extension("noextension").is_err());
    }

    #[tokio::test]
    async fn spools_a_copy_without_consuming_the_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let spool = UploadSpool::new(dir.path());

        let bytes = b"upload contents".to_vec();
        spool.spool("me.jpg", &bytes).await;

        // Original bytes are untouched and exactly one copy landed on disk.
        assert_eq!(bytes, b"upload contents");
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
