//! Handlers for `/maintenance` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/maintenance/refresh` | Re-derive every record as of now |
//! | `POST` | `/maintenance/estimate` | Run the timing estimation pass |
//! | `GET`  | `/maintenance/implausible` | Records with efficiency outside 5–80 km/h |

use std::sync::Arc;

use axum::{Json, extract::State};
use chrono::Utc;
use haul_core::{
  journey::JourneyRecord,
  store::{EstimateReport, JourneyStore},
};
use haul_ingest::maintenance;
use serde::Serialize;

use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct RefreshReport {
  pub changed: usize,
}

/// `POST /maintenance/refresh`
pub async fn refresh<S>(
  State(store): State<Arc<S>>,
) -> Result<Json<RefreshReport>, ApiError>
where
  S: JourneyStore,
{
  let changed = store
    .refresh_all(Utc::now())
    .await
    .map_err(ApiError::store)?;
  Ok(Json(RefreshReport { changed }))
}

/// `POST /maintenance/estimate`
pub async fn estimate<S>(
  State(store): State<Arc<S>>,
) -> Result<Json<EstimateReport>, ApiError>
where
  S: JourneyStore,
{
  let report = maintenance::apply_estimates(store.as_ref(), Utc::now()).await?;
  Ok(Json(report))
}

/// `GET /maintenance/implausible`
pub async fn implausible<S>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<JourneyRecord>>, ApiError>
where
  S: JourneyStore,
{
  Ok(Json(maintenance::implausible(store.as_ref()).await?))
}
