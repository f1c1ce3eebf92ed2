//! Receipt analysis handler

use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::Json;
use tracing::info;

use crate::{AppError, AppState};
use kvitto_core::Error;

/// Media type assumed when the upload does not declare one.
const DEFAULT_MIME: &str = "image/jpeg";

/// POST /analyze-receipt - extract structured fields from a receipt image
///
/// Takes a multipart form with one file part. The image is buffered, sent
/// inline to the model provider with the fixed instruction prompt, and the
/// JSON recovered from the response is returned verbatim - no field
/// validation or category enforcement on the way out.
pub async fn analyze_receipt(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut upload: Option<(Vec<u8>, String)> = None;

    // First file part wins; any further parts are ignored.
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(&format!("Failed to read form field: {}", e)))?
    {
        if field.file_name().is_none() && field.name() != Some("file") {
            continue;
        }

        let mime = field
            .content_type()
            .map(|m| m.to_string())
            .unwrap_or_else(|| DEFAULT_MIME.to_string());

        let limit = state.config.max_upload_size;
        let mut data = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| AppError::bad_request(&format!("Failed to read file data: {}", e)))?
        {
            // Reject before the rest of the payload is buffered.
            if data.len() + chunk.len() > limit {
                return Err(Error::UploadTooLarge { limit }.into());
            }
            data.extend_from_slice(&chunk);
        }

        upload = Some((data, mime));
        break;
    }

    let (data, mime) = upload.ok_or(Error::NoFile)?;
    if data.is_empty() {
        return Err(Error::NoFile.into());
    }

    let model = state
        .model
        .as_ref()
        .ok_or(Error::Misconfigured("model provider credential not set"))?;

    let parsed = model.parse_receipt(&data, &mime).await?;
    info!(bytes = data.len(), mime = %mime, "receipt analyzed");

    Ok(Json(parsed))
}
