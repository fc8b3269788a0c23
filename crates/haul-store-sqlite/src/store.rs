//! The SQLite implementation of [`JourneyStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use haul_core::{
  estimate::estimate_timing,
  extract::Extraction,
  journey::{JourneyRecord, NaturalKey},
  merge::{Reconciled, reconcile},
  metrics::derive,
  store::{
    ClearSummary, EstimateReport, FileBatch, FileReport, JourneyQuery, JourneyStore,
    NewUpload, RowConflict, RowError, UploadRecord,
  },
};

use crate::{
  Error, Result,
  encode::{
    EncodedJourney, JOURNEY_COLUMNS, RawJourney, RawUpload, UPLOAD_COLUMNS,
    encode_date, encode_dt, encode_uuid,
  },
  error::boxed,
  schema::SCHEMA,
};

type CallResult<T> = std::result::Result<T, tokio_rusqlite::Error>;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A journey store backed by a single SQLite file.
///
/// Clones share one connection thread.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Synchronous helpers (run on the connection thread) ─────────────────────

fn load_by_key(conn: &Connection, key: &NaturalKey) -> CallResult<Option<JourneyRecord>> {
  let raw = conn
    .query_row(
      &format!(
        "SELECT {JOURNEY_COLUMNS} FROM journeys
         WHERE load_number = ?1 AND create_date = ?2 AND truck_number = ?3"
      ),
      rusqlite::params![
        key.load_number,
        encode_date(key.create_date),
        key.truck_number
      ],
      RawJourney::from_row,
    )
    .optional()?;
  raw.map(RawJourney::into_record).transpose().map_err(boxed)
}

/// Records sharing `(load_number, create_date)`, at most `limit` of them.
fn load_siblings(
  conn: &Connection,
  key: &NaturalKey,
  limit: i64,
) -> CallResult<Vec<JourneyRecord>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {JOURNEY_COLUMNS} FROM journeys
     WHERE load_number = ?1 AND create_date = ?2
     ORDER BY truck_number
     LIMIT ?3"
  ))?;
  let raws = stmt
    .query_map(
      rusqlite::params![key.load_number, encode_date(key.create_date), limit],
      RawJourney::from_row,
    )?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws
    .into_iter()
    .map(RawJourney::into_record)
    .collect::<Result<Vec<_>>>()
    .map_err(boxed)
}

/// Find the stored record an extraction belongs to.
///
/// Exact natural-key matches win. Otherwise a placeholder vehicle on
/// either side is bridged when exactly one record shares the load and
/// date: an incoming placeholder joins the stored record, and a stored
/// placeholder is adopted by the incoming real vehicle.
fn resolve_existing(
  conn: &Connection,
  key: &NaturalKey,
) -> CallResult<Option<JourneyRecord>> {
  if let Some(rec) = load_by_key(conn, key)? {
    return Ok(Some(rec));
  }
  let mut siblings = load_siblings(conn, key, 2)?;
  if siblings.len() != 1 {
    return Ok(None);
  }
  let mut only = siblings.remove(0);
  if key.has_placeholder_vehicle() {
    return Ok(Some(only));
  }
  if only.key.has_placeholder_vehicle() {
    only.key.truck_number = key.truck_number.clone();
    return Ok(Some(only));
  }
  Ok(None)
}

/// Insert a new record, or update an existing one in place by id.
fn write_record(conn: &Connection, record: &JourneyRecord, created: bool) -> CallResult<()> {
  let e = EncodedJourney::new(record).map_err(boxed)?;
  if created {
    conn.execute(
      "INSERT INTO journeys (
         journey_id, load_number, create_date, truck_number, driver_name,
         customer_name, current_status, efficiency_score, record_json,
         created_at, updated_at
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
       ON CONFLICT (load_number, create_date, truck_number) DO UPDATE SET
         driver_name      = excluded.driver_name,
         customer_name    = excluded.customer_name,
         current_status   = excluded.current_status,
         efficiency_score = excluded.efficiency_score,
         record_json      = excluded.record_json,
         updated_at       = excluded.updated_at",
      rusqlite::params![
        e.journey_id,
        e.load_number,
        e.create_date,
        e.truck_number,
        e.driver_name,
        e.customer_name,
        e.current_status,
        e.efficiency_score,
        e.record_json,
        e.created_at,
        e.updated_at,
      ],
    )?;
  } else {
    conn.execute(
      "UPDATE journeys SET
         truck_number     = ?2,
         driver_name      = ?3,
         customer_name    = ?4,
         current_status   = ?5,
         efficiency_score = ?6,
         record_json      = ?7,
         updated_at       = ?8
       WHERE journey_id = ?1",
      rusqlite::params![
        e.journey_id,
        e.truck_number,
        e.driver_name,
        e.customer_name,
        e.current_status,
        e.efficiency_score,
        e.record_json,
        e.updated_at,
      ],
    )?;
  }
  Ok(())
}

fn apply_row(
  conn: &Connection,
  extraction: &Extraction,
  now: DateTime<Utc>,
) -> CallResult<Reconciled> {
  let existing = resolve_existing(conn, &extraction.key)?;
  let mut reconciled = reconcile(existing, extraction, now);
  reconciled.record = derive(reconciled.record, now.naive_utc());
  write_record(conn, &reconciled.record, reconciled.created)?;
  Ok(reconciled)
}

fn insert_upload(conn: &Connection, u: &UploadRecord) -> CallResult<()> {
  conn.execute(
    &format!(
      "INSERT INTO uploads ({UPLOAD_COLUMNS})
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
    ),
    rusqlite::params![
      encode_uuid(u.upload_id),
      u.name,
      u.kind.as_ref(),
      encode_dt(u.uploaded_at),
      u.processed,
      u.content_hash,
      u.created as i64,
      u.updated as i64,
      u.skipped as i64,
      u.conflicts as i64,
      u.error,
    ],
  )?;
  Ok(())
}

fn new_upload_record(upload: NewUpload, now: DateTime<Utc>) -> UploadRecord {
  UploadRecord {
    upload_id:    Uuid::new_v4(),
    name:         upload.name,
    kind:         upload.kind,
    uploaded_at:  now,
    processed:    true,
    content_hash: upload.content_hash,
    created:      0,
    updated:      0,
    skipped:      0,
    conflicts:    0,
    error:        None,
  }
}

// ─── JourneyStore impl ───────────────────────────────────────────────────────

impl JourneyStore for SqliteStore {
  type Error = Error;

  // ── Ingestion ─────────────────────────────────────────────────────────────

  async fn ingest_file(&self, batch: FileBatch) -> Result<FileReport> {
    let report = self
      .conn
      .call(move |conn| {
        let FileBatch { upload, rows, rejected, now } = batch;
        let mut tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let duplicate: bool = tx.query_row(
          "SELECT EXISTS (
             SELECT 1 FROM uploads
             WHERE kind = ?1 AND content_hash = ?2 AND processed = 1
           )",
          rusqlite::params![upload.kind.as_ref(), upload.content_hash],
          |r| r.get(0),
        )?;

        let mut record = new_upload_record(upload, now);
        let mut errors = rejected;
        let mut conflicts = Vec::new();

        for row in &rows {
          let sp = tx.savepoint()?;
          match apply_row(&sp, &row.extraction, now) {
            Ok(reconciled) => {
              sp.commit()?;
              if reconciled.created {
                record.created += 1;
              } else {
                record.updated += 1;
              }
              let key = reconciled.record.key;
              conflicts.extend(reconciled.conflicts.into_iter().map(|conflict| {
                RowConflict { row: row.row, key: key.clone(), conflict }
              }));
            }
            Err(e) => {
              drop(sp);
              errors.push(RowError { row: row.row, message: e.to_string() });
            }
          }
        }

        errors.sort_by_key(|e| e.row);
        record.skipped = errors.len();
        record.conflicts = conflicts.len();
        insert_upload(&tx, &record)?;
        tx.commit()?;

        Ok(FileReport { upload: record, duplicate, errors, conflicts })
      })
      .await?;
    Ok(report)
  }

  async fn record_failed_upload(
    &self,
    upload: NewUpload,
    error: String,
    now: DateTime<Utc>,
  ) -> Result<UploadRecord> {
    let mut record = new_upload_record(upload, now);
    record.processed = false;
    record.error = Some(error);

    let stored = record.clone();
    self
      .conn
      .call(move |conn| insert_upload(conn, &stored))
      .await?;
    Ok(record)
  }

  async fn list_uploads(&self) -> Result<Vec<UploadRecord>> {
    let raws: Vec<RawUpload> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {UPLOAD_COLUMNS} FROM uploads ORDER BY uploaded_at DESC"
        ))?;
        let rows = stmt
          .query_map([], RawUpload::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUpload::into_upload).collect()
  }

  // ── Journeys ──────────────────────────────────────────────────────────────

  async fn get_journey(&self, id: Uuid) -> Result<Option<JourneyRecord>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawJourney> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {JOURNEY_COLUMNS} FROM journeys WHERE journey_id = ?1"),
              rusqlite::params![id_str],
              RawJourney::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawJourney::into_record).transpose()
  }

  async fn find_journey(&self, key: NaturalKey) -> Result<Option<JourneyRecord>> {
    Ok(self.conn.call(move |conn| load_by_key(conn, &key)).await?)
  }

  async fn search(&self, query: JourneyQuery) -> Result<Vec<JourneyRecord>> {
    let text_pattern = query
      .text
      .as_deref()
      .map(str::trim)
      .filter(|t| !t.is_empty())
      .map(|t| format!("%{}%", t.to_lowercase()));
    let status_str = query.status.map(|s| s.to_string());
    let from_str = query.date_from.map(encode_date);
    let to_str = query.date_to.map(encode_date);
    let limit_val = query.limit.map_or(-1, |l| l as i64);
    let offset_val = query.offset.unwrap_or(0) as i64;

    let raws: Vec<RawJourney> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {JOURNEY_COLUMNS} FROM journeys
           WHERE (?1 IS NULL OR lower(load_number)   LIKE ?1
                             OR lower(driver_name)   LIKE ?1
                             OR lower(customer_name) LIKE ?1
                             OR lower(truck_number)  LIKE ?1)
             AND (?2 IS NULL OR current_status = ?2)
             AND (?3 IS NULL OR create_date >= ?3)
             AND (?4 IS NULL OR create_date <= ?4)
             AND (?5 IS NULL OR efficiency_score >= ?5)
             AND (?6 IS NULL OR efficiency_score <= ?6)
           ORDER BY create_date, load_number, truck_number
           LIMIT ?7 OFFSET ?8"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![
              text_pattern,
              status_str,
              from_str,
              to_str,
              query.min_efficiency,
              query.max_efficiency,
              limit_val,
              offset_val,
            ],
            RawJourney::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawJourney::into_record).collect()
  }

  async fn save(&self, record: JourneyRecord, now: DateTime<Utc>) -> Result<JourneyRecord> {
    let id = record.journey_id;
    let mut record = derive(record, now.naive_utc());
    record.updated_at = now;

    let stored = record.clone();
    let changed = self
      .conn
      .call(move |conn| {
        let exists: bool = conn.query_row(
          "SELECT EXISTS (SELECT 1 FROM journeys WHERE journey_id = ?1)",
          rusqlite::params![encode_uuid(stored.journey_id)],
          |r| r.get(0),
        )?;
        if exists {
          write_record(conn, &stored, false)?;
        }
        Ok(exists)
      })
      .await?;

    if !changed {
      return Err(Error::JourneyNotFound(id));
    }
    Ok(record)
  }

  async fn refresh_all(&self, now: DateTime<Utc>) -> Result<usize> {
    let changed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let raws = {
          let mut stmt =
            tx.prepare(&format!("SELECT {JOURNEY_COLUMNS} FROM journeys"))?;
          stmt
            .query_map([], RawJourney::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };

        let mut changed = 0;
        for raw in raws {
          let before = raw.into_record().map_err(boxed)?;
          let mut after = derive(before.clone(), now.naive_utc());
          if after == before {
            continue;
          }
          after.updated_at = now;
          write_record(&tx, &after, false)?;
          changed += 1;
        }
        tx.commit()?;
        Ok(changed)
      })
      .await?;
    Ok(changed)
  }

  async fn apply_estimates(&self, now: DateTime<Utc>) -> Result<EstimateReport> {
    let report = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let raws = {
          let mut stmt =
            tx.prepare(&format!("SELECT {JOURNEY_COLUMNS} FROM journeys"))?;
          stmt
            .query_map([], RawJourney::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };

        let mut report = EstimateReport { examined: raws.len(), ..Default::default() };
        for raw in raws {
          let mut record = raw.into_record().map_err(boxed)?;
          let estimate = estimate_timing(&record);
          if estimate == record.estimate {
            continue;
          }
          if estimate.is_some() {
            report.estimated += 1;
          } else {
            report.cleared += 1;
          }
          record.estimate = estimate;
          let mut record = derive(record, now.naive_utc());
          record.updated_at = now;
          write_record(&tx, &record, false)?;
        }
        tx.commit()?;
        Ok(report)
      })
      .await?;
    Ok(report)
  }

  async fn clear(&self) -> Result<ClearSummary> {
    let summary = self
      .conn
      .call(|conn| {
        let tx = conn.transaction()?;
        let journeys = tx.execute("DELETE FROM journeys", [])?;
        let uploads = tx.execute("DELETE FROM uploads", [])?;
        tx.commit()?;
        Ok(ClearSummary { journeys, uploads })
      })
      .await?;
    Ok(summary)
  }
}
