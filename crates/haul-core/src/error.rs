//! Error types for `haul-core`.

use thiserror::Error;

use crate::source::SourceKind;

#[derive(Debug, Error)]
pub enum Error {
  #[error("{kind} row has no load number")]
  MissingLoadNumber { kind: SourceKind },

  #[error("unknown source kind: {0:?}")]
  UnknownSourceKind(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
