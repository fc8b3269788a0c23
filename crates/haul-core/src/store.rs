//! The `JourneyStore` trait and the types that cross it.
//!
//! Storage backends (e.g. `haul-store-sqlite`) implement the trait; the
//! ingestion orchestrator, the HTTP API and the CLI depend only on it.

use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  extract::Extraction,
  journey::{JourneyRecord, NaturalKey},
  merge::FieldConflict,
  source::SourceKind,
  status::JourneyStatus,
};

// ─── Uploads ─────────────────────────────────────────────────────────────────

/// Identity of an uploaded file before it is processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUpload {
  pub name:         String,
  pub kind:         SourceKind,
  /// SHA-256 of the raw file, hex encoded.
  pub content_hash: String,
}

/// One processed (or failed) file, as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRecord {
  pub upload_id:    Uuid,
  pub name:         String,
  pub kind:         SourceKind,
  pub uploaded_at:  DateTime<Utc>,
  /// False when the file could not be read at all.
  pub processed:    bool,
  pub content_hash: String,
  pub created:      usize,
  pub updated:      usize,
  pub skipped:      usize,
  pub conflicts:    usize,
  pub error:        Option<String>,
}

// ─── Row outcomes ────────────────────────────────────────────────────────────

/// A row that was skipped. `row` is 1-based and excludes the header line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
  pub row:     usize,
  pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowConflict {
  pub row:      usize,
  pub key:      NaturalKey,
  #[serde(flatten)]
  pub conflict: FieldConflict,
}

/// A successfully extracted row awaiting reconciliation.
#[derive(Debug, Clone)]
pub struct RowExtraction {
  pub row:        usize,
  pub extraction: Extraction,
}

/// Everything the store needs to apply one file atomically.
#[derive(Debug, Clone)]
pub struct FileBatch {
  pub upload:   NewUpload,
  pub rows:     Vec<RowExtraction>,
  /// Rows that already failed extraction; recorded as skipped.
  pub rejected: Vec<RowError>,
  pub now:      DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReport {
  pub upload:    UploadRecord,
  /// An earlier upload of the same kind had identical content.
  pub duplicate: bool,
  pub errors:    Vec<RowError>,
  pub conflicts: Vec<RowConflict>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearSummary {
  pub journeys: usize,
  pub uploads:  usize,
}

/// Outcome of one estimation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimateReport {
  pub examined:  usize,
  /// Records given a new or changed estimate.
  pub estimated: usize,
  /// Records whose stale estimate was dropped because measured data
  /// arrived.
  pub cleared:   usize,
}

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`JourneyStore::search`]. All filters are conjunctive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JourneyQuery {
  /// Case-insensitive substring over load, driver, customer and truck.
  pub text:           Option<String>,
  pub status:         Option<JourneyStatus>,
  /// Inclusive bounds on `create_date`.
  pub date_from:      Option<NaiveDate>,
  pub date_to:        Option<NaiveDate>,
  /// Inclusive bounds on `efficiency_score`; records without a score are
  /// excluded when either bound is set.
  pub min_efficiency: Option<f64>,
  pub max_efficiency: Option<f64>,
  pub limit:          Option<usize>,
  pub offset:         Option<usize>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Keyed journey storage with an atomic upsert on the natural key.
///
/// Every write path runs [`crate::metrics::derive`] before persisting, so
/// stored derived fields always agree with stored raw fields.
pub trait JourneyStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Ingestion ─────────────────────────────────────────────────────────

  /// Reconcile and persist every row of one file in a single transaction.
  ///
  /// Storage failures on an individual row roll back that row only and are
  /// reported in [`FileReport::errors`]; the rest of the file commits.
  fn ingest_file(
    &self,
    batch: FileBatch,
  ) -> impl Future<Output = Result<FileReport, Self::Error>> + Send + '_;

  /// Record a file that could not be read, with `processed = false`.
  fn record_failed_upload(
    &self,
    upload: NewUpload,
    error: String,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<UploadRecord, Self::Error>> + Send + '_;

  /// Upload history, newest first.
  fn list_uploads(
    &self,
  ) -> impl Future<Output = Result<Vec<UploadRecord>, Self::Error>> + Send + '_;

  // ── Journeys ──────────────────────────────────────────────────────────

  fn get_journey(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<JourneyRecord>, Self::Error>> + Send + '_;

  fn find_journey(
    &self,
    key: NaturalKey,
  ) -> impl Future<Output = Result<Option<JourneyRecord>, Self::Error>> + Send + '_;

  /// Journeys matching `query`, ordered by create date then load number.
  fn search(
    &self,
    query: JourneyQuery,
  ) -> impl Future<Output = Result<Vec<JourneyRecord>, Self::Error>> + Send + '_;

  /// Re-derive and persist an existing record. Returns the stored form.
  fn save(
    &self,
    record: JourneyRecord,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<JourneyRecord, Self::Error>> + Send + '_;

  /// Re-derive every stored record as of `now`. Returns how many changed.
  fn refresh_all(
    &self,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Recompute [`crate::estimate::estimate_timing`] for every stored
  /// record and persist the ones whose estimate changed, re-derived as of
  /// `now`. Runs atomically with respect to ingestion.
  fn apply_estimates(
    &self,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<EstimateReport, Self::Error>> + Send + '_;

  /// Delete all journeys and upload history.
  fn clear(
    &self,
  ) -> impl Future<Output = Result<ClearSummary, Self::Error>> + Send + '_;
}
