//! Receipt CSV export handler

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, Response, StatusCode},
};
use tracing::info;

use crate::{AppError, AppState};
use kvitto_core::{auth, build_receipt_csv, validate_receipt_id, Error};

/// GET /receipts/:id/export/csv - download one owned receipt as CSV
///
/// The bearer token is verified before anything else; the id shape check
/// runs before the store is consulted.
pub async fn export_receipt_csv(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response<Body>, AppError> {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let subject = auth::verify_bearer(authorization, state.jwt_secret.as_deref())?;

    validate_receipt_id(&id)?;

    let store = state
        .store
        .as_ref()
        .ok_or(Error::Misconfigured("store credentials not set"))?;

    // One query filtered on both id and owner; an id owned by someone else
    // is indistinguishable from an unknown one.
    let receipt = store
        .fetch_receipt(&id, &subject)
        .await?
        .ok_or(Error::NotFound)?;

    let csv = build_receipt_csv(&receipt);
    info!(receipt = %id, "receipt exported");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/csv; charset=utf-8")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=receipt_{}.csv", id),
        )
        .body(Body::from(csv))
        .map_err(|e| AppError::internal(&e.to_string()))
}
