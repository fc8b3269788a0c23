//! Handlers for `/uploads` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/uploads` | Upload history, newest first |
//! | `POST` | `/uploads?kind=<kind>&name=<file>` | Body: raw CSV. 201, or 422 if unreadable |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use bytes::Bytes;
use chrono::Utc;
use haul_core::{
  source::SourceKind,
  store::{JourneyStore, UploadRecord},
};
use haul_ingest::UploadFile;
use serde::Deserialize;

use crate::error::ApiError;

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /uploads`
pub async fn list<S>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<UploadRecord>>, ApiError>
where
  S: JourneyStore,
{
  let uploads = store.list_uploads().await.map_err(ApiError::store)?;
  Ok(Json(uploads))
}

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UploadParams {
  pub kind: SourceKind,
  /// Original file name; defaults to `<kind>.csv`.
  pub name: Option<String>,
}

/// `POST /uploads?kind=<kind>[&name=<file>]` with the CSV file as the body.
///
/// Responds with the file report either way; the status tells whether the
/// file could be read.
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<UploadParams>,
  body: Bytes,
) -> Result<impl IntoResponse, ApiError>
where
  S: JourneyStore,
{
  let file = UploadFile {
    name:  params.name.unwrap_or_else(|| format!("{}.csv", params.kind)),
    kind:  params.kind,
    bytes: body.to_vec(),
  };
  let report = haul_ingest::ingest_file(store.as_ref(), file, Utc::now()).await?;

  let status = if report.upload.processed {
    StatusCode::CREATED
  } else {
    StatusCode::UNPROCESSABLE_ENTITY
  };
  Ok((status, Json(report)))
}
