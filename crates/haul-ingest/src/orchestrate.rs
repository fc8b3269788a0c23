//! Ingestion Orchestrator.
//!
//! One uploaded file is decoded, each row is extracted for the declared
//! [`SourceKind`], and the resulting batch is handed to the store to apply
//! in one transaction. Files in a batch are independent: a failure in one
//! never stops the others.

use chrono::{DateTime, Utc};
use haul_core::{
  extract::ExtractContext,
  source::SourceKind,
  store::{FileBatch, FileReport, JourneyStore, NewUpload, RowError, RowExtraction},
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::{Error, Result, read::read_rows};

/// A file as received from the uploader.
#[derive(Debug, Clone)]
pub struct UploadFile {
  pub name:  String,
  pub kind:  SourceKind,
  pub bytes: Vec<u8>,
}

/// SHA-256 of `bytes`, lowercase hex.
pub fn content_hash(bytes: &[u8]) -> String { hex::encode(Sha256::digest(bytes)) }

/// Decode and extract every row of `file`. Blank rows are ignored; rows
/// that fail extraction become [`RowError`]s. Fails only when the file
/// itself cannot be decoded.
pub fn prepare(
  file: &UploadFile,
  ctx: &ExtractContext,
) -> Result<(Vec<RowExtraction>, Vec<RowError>)> {
  let rows = read_rows(&file.bytes)?;
  let mut extracted = Vec::with_capacity(rows.len());
  let mut rejected = Vec::new();

  for (i, row) in rows.iter().enumerate() {
    let row_no = i + 1;
    if row.is_empty() {
      continue;
    }
    match file.kind.extract(row, ctx) {
      Ok(extraction) => extracted.push(RowExtraction { row: row_no, extraction }),
      Err(e) => rejected.push(RowError { row: row_no, message: e.to_string() }),
    }
  }
  Ok((extracted, rejected))
}

/// Process one file into `store`.
///
/// An unreadable file is still recorded, as an upload with
/// `processed = false`; the returned report carries its error. `Err` means
/// the store itself failed.
pub async fn ingest_file<S>(
  store: &S,
  file: UploadFile,
  now: DateTime<Utc>,
) -> Result<FileReport>
where
  S: JourneyStore,
{
  let upload = NewUpload {
    name:         file.name.clone(),
    kind:         file.kind,
    content_hash: content_hash(&file.bytes),
  };
  let ctx = ExtractContext { today: now.date_naive() };

  let (rows, rejected) = match prepare(&file, &ctx) {
    Ok(prepared) => prepared,
    Err(e) => {
      warn!(file = %file.name, kind = %file.kind, error = %e, "file could not be read");
      let upload = store
        .record_failed_upload(upload, e.to_string(), now)
        .await
        .map_err(Error::store)?;
      return Ok(FileReport {
        upload,
        duplicate: false,
        errors: Vec::new(),
        conflicts: Vec::new(),
      });
    }
  };
  debug!(file = %file.name, rows = rows.len(), rejected = rejected.len(), "rows extracted");

  let report = store
    .ingest_file(FileBatch { upload, rows, rejected, now })
    .await
    .map_err(Error::store)?;

  if report.duplicate {
    warn!(file = %file.name, kind = %file.kind, "identical content was already ingested");
  }
  for e in &report.errors {
    warn!(file = %file.name, row = e.row, error = %e.message, "row skipped");
  }
  for c in &report.conflicts {
    warn!(
      file = %file.name,
      row = c.row,
      key = %c.key,
      field = %c.conflict.field,
      previous = %c.conflict.previous,
      incoming = %c.conflict.incoming,
      "conflicting values; keeping the incoming one",
    );
  }
  info!(
    file = %file.name,
    kind = %file.kind,
    created = report.upload.created,
    updated = report.upload.updated,
    skipped = report.upload.skipped,
    conflicts = report.upload.conflicts,
    "file processed",
  );
  Ok(report)
}

/// A file whose processing failed inside the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileError {
  pub name:    String,
  pub kind:    SourceKind,
  pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
  pub succeeded: usize,
  pub failed:    usize,
  /// Every file that reached the upload log, processed or not.
  pub files:     Vec<FileReport>,
  /// Files the store could not record at all.
  pub errors:    Vec<FileError>,
}

/// Process `files` sequentially, isolating failures per file.
pub async fn ingest_batch<S>(
  store: &S,
  files: Vec<UploadFile>,
  now: DateTime<Utc>,
) -> BatchReport
where
  S: JourneyStore,
{
  let mut batch = BatchReport::default();
  for file in files {
    let (name, kind) = (file.name.clone(), file.kind);
    match ingest_file(store, file, now).await {
      Ok(report) => {
        if report.upload.processed {
          batch.succeeded += 1;
        } else {
          batch.failed += 1;
        }
        batch.files.push(report);
      }
      Err(e) => {
        warn!(file = %name, error = %e, "file failed");
        batch.failed += 1;
        batch.errors.push(FileError { name, kind, message: e.to_string() });
      }
    }
  }
  info!(succeeded = batch.succeeded, failed = batch.failed, "batch processed");
  batch
}
