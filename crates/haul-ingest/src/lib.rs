//! CSV ingestion and export for the haul journey store.
//!
//! [`read`] and [`write`] are the synchronous CSV codec. [`orchestrate`]
//! drives a file through extraction into any
//! [`JourneyStore`](haul_core::store::JourneyStore), and [`maintenance`]
//! holds the estimation and plausibility passes that run over stored data.

pub mod error;
pub mod maintenance;
pub mod orchestrate;
pub mod read;
pub mod write;

pub use error::{Error, Result};
pub use orchestrate::{BatchReport, UploadFile, ingest_batch, ingest_file};
