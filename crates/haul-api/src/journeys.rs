//! Handlers for `/journeys` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/journeys` | Filters: `text`, `status`, `date_from`, `date_to`, `min_efficiency`, `max_efficiency`, `limit`, `offset` |
//! | `GET`    | `/journeys/{id}` | 404 if not found |
//! | `DELETE` | `/journeys` | Bulk clear of journeys and upload history |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use haul_core::{
  journey::JourneyRecord,
  store::{ClearSummary, JourneyQuery, JourneyStore},
};
use uuid::Uuid;

use crate::error::ApiError;

/// `GET /journeys[?...]`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Query(query): Query<JourneyQuery>,
) -> Result<Json<Vec<JourneyRecord>>, ApiError>
where
  S: JourneyStore,
{
  if let (Some(lo), Some(hi)) = (query.min_efficiency, query.max_efficiency)
    && lo > hi
  {
    return Err(ApiError::BadRequest(format!(
      "min_efficiency {lo} is greater than max_efficiency {hi}"
    )));
  }
  let journeys = store.search(query).await.map_err(ApiError::store)?;
  Ok(Json(journeys))
}

/// `GET /journeys/{id}`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<JourneyRecord>, ApiError>
where
  S: JourneyStore,
{
  let journey = store
    .get_journey(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("journey {id}")))?;
  Ok(Json(journey))
}

/// `DELETE /journeys`
pub async fn clear<S>(
  State(store): State<Arc<S>>,
) -> Result<Json<ClearSummary>, ApiError>
where
  S: JourneyStore,
{
  let summary = store.clear().await.map_err(ApiError::store)?;
  Ok(Json(summary))
}
