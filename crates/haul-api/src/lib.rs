//! JSON/CSV HTTP API for the haul journey store.
//!
//! Exposes an axum [`Router`] backed by any
//! [`haul_core::store::JourneyStore`]. Auth, TLS and transport concerns are
//! the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", haul_api::api_router(store.clone()))
//! ```

pub mod error;
pub mod journeys;
pub mod maintenance;
pub mod reports;
pub mod uploads;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use haul_core::store::JourneyStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: JourneyStore + 'static,
{
  Router::new()
    // Uploads
    .route("/uploads", get(uploads::list::<S>).post(uploads::create::<S>))
    // Journeys
    .route("/journeys", get(journeys::list::<S>).delete(journeys::clear::<S>))
    .route("/journeys/{id}", get(journeys::get_one::<S>))
    // Reporting
    .route("/export.csv", get(reports::export::<S>))
    .route("/summary", get(reports::summary::<S>))
    // Maintenance
    .route("/maintenance/refresh", post(maintenance::refresh::<S>))
    .route("/maintenance/estimate", post(maintenance::estimate::<S>))
    .route("/maintenance/implausible", get(maintenance::implausible::<S>))
    .with_state(store)
}
