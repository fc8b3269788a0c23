//! Error type for `haul-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] haul_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("journey not found: {0}")]
  JourneyNotFound(uuid::Uuid),
}

/// Box a crate error so it can cross a `tokio_rusqlite` call boundary.
pub(crate) fn boxed(e: impl Into<Error>) -> tokio_rusqlite::Error {
  tokio_rusqlite::Error::Other(Box::new(e.into()))
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
