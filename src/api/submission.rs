//! Reads an image submission from either supported body shape.
//!
//! JSON bodies carry a base64 image (optionally a data URL) plus an optional
//! name; multipart bodies carry an image file part plus an optional name
//! part. File uploads are also spooled to the temp directory.

use axum::extract::{FromRequest, Multipart, Request};
use serde::Deserialize;

use super::AppState;
use crate::services::ingest::{self, IngestError};

pub struct ImageSubmission {
    pub image: Vec<u8>,
    pub name: Option<String>,
}

#[derive(Deserialize)]
struct JsonSubmission {
    image: Option<String>,
    name: Option<String>,
}

pub async fn read_image_submission(
    state: &AppState,
    request: Request,
) -> Result<ImageSubmission, IngestError> {
    let is_multipart = request
        .headers()
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    if is_multipart {
        read_multipart(state, request).await
    } else {
        read_json(request).await
    }
}

async fn read_json(request: Request) -> Result<ImageSubmission, IngestError> {
    let bytes = axum::body::to_bytes(request.into_body(), usize::MAX)
        .await
        .map_err(|e| IngestError::InvalidImage(format!("unreadable body: {e}")))?;

    let body: JsonSubmission = serde_json::from_slice(&bytes)
        .map_err(|e| IngestError::InvalidImage(format!("malformed request body: {e}")))?;

    let payload = body
        .image
        .ok_or_else(|| IngestError::InvalidImage("missing image payload".to_string()))?;

    Ok(ImageSubmission {
        image: ingest::decode_base64_image(&payload)?,
        name: body.name,
    })
}

async fn read_multipart(
    state: &AppState,
    request: Request,
) -> Result<ImageSubmission, IngestError> {
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| IngestError::InvalidImage(format!("malformed multipart body: {e}")))?;

    let mut image: Option<Vec<u8>> = None;
    let mut name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| IngestError::InvalidImage(format!("malformed multipart field: {e}")))?
    {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("image") => {
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| {
                        IngestError::InvalidImage("image part has no filename".to_string())
                    })?;
                ingest::validate_extension(&filename)?;

                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| IngestError::InvalidImage(format!("unreadable upload: {e}")))?
                    .to_vec();
                if bytes.is_empty() {
                    return Err(IngestError::InvalidImage("uploaded file is empty".to_string()));
                }

                state.uploads.spool(&filename, &bytes).await;
                image = Some(bytes);
            }
            Some("name") => {
                name = field.text().await.ok().filter(|n| !n.is_empty());
            }
            _ => {}
        }
    }

    let image =
        image.ok_or_else(|| IngestError::InvalidImage("missing image payload".to_string()))?;

    Ok(ImageSubmission { image, name })
}
