//! HTTP server for the haul journey store.
//!
//! Wraps [`haul_api::api_router`] under `/api` with request tracing, an
//! upload size limit and a liveness probe.

use std::{path::PathBuf, sync::Arc};

use axum::{Router, extract::DefaultBodyLimit, routing::get};
use haul_core::store::JourneyStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `HAUL_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:             String,
  #[serde(default = "default_port")]
  pub port:             u16,
  #[serde(default = "default_store_path")]
  pub store_path:       PathBuf,
  /// Largest accepted CSV upload, in bytes.
  #[serde(default = "default_max_upload_bytes")]
  pub max_upload_bytes: usize,
}

fn default_host() -> String { "127.0.0.1".to_owned() }
fn default_port() -> u16 { 8080 }
fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/haul/haul.db") }
fn default_max_upload_bytes() -> usize { 32 * 1024 * 1024 }

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:             default_host(),
      port:             default_port(),
      store_path:       default_store_path(),
      max_upload_bytes: default_max_upload_bytes(),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router.
pub fn router<S>(store: Arc<S>, config: &ServerConfig) -> Router
where
  S: JourneyStore + 'static,
{
  Router::new()
    .route("/health", get(health))
    .nest("/api", haul_api::api_router(store))
    .layer(DefaultBodyLimit::max(config.max_upload_bytes))
    .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str { "ok" }
