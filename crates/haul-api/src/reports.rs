//! Handlers for reporting endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/export.csv` | Every journey as `text/csv` |
//! | `GET`  | `/summary` | Fleet summary JSON |

use std::sync::Arc;

use axum::{
  Json,
  extract::State,
  http::header,
  response::IntoResponse,
};
use chrono::Utc;
use haul_core::{
  report::Summary,
  store::{JourneyQuery, JourneyStore},
};

use crate::error::ApiError;

/// `GET /export.csv`
pub async fn export<S>(
  State(store): State<Arc<S>>,
) -> Result<impl IntoResponse, ApiError>
where
  S: JourneyStore,
{
  let records = store
    .search(JourneyQuery::default())
    .await
    .map_err(ApiError::store)?;
  let csv = haul_ingest::write::export_csv(&records)?;

  let filename = format!("journeys_{}.csv", Utc::now().format("%Y%m%d_%H%M%S"));
  let headers = [
    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_owned()),
    (
      header::CONTENT_DISPOSITION,
      format!("attachment; filename=\"{filename}\""),
    ),
  ];
  Ok((headers, csv))
}

/// `GET /summary`
pub async fn summary<S>(
  State(store): State<Arc<S>>,
) -> Result<Json<Summary>, ApiError>
where
  S: JourneyStore,
{
  let records = store
    .search(JourneyQuery::default())
    .await
    .map_err(ApiError::store)?;
  Ok(Json(Summary::from_records(&records)))
}
