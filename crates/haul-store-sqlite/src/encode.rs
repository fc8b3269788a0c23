//! Encoding and decoding between domain types and the plain-text columns
//! stored in SQLite.
//!
//! Timestamps are RFC 3339 strings, dates are `YYYY-MM-DD`, UUIDs are
//! hyphenated lowercase. The journey itself is stored as JSON; its identity
//! columns win over the JSON copy when they disagree.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use haul_core::{
  journey::{JourneyRecord, NaturalKey},
  source::SourceKind,
  store::UploadRecord,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

pub fn decode_kind(s: &str) -> Result<SourceKind> {
  SourceKind::from_str(s)
    .map_err(|_| haul_core::Error::UnknownSourceKind(s.to_owned()).into())
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const JOURNEY_COLUMNS: &str =
  "journey_id, load_number, create_date, truck_number, created_at, record_json";

/// Raw strings read from a `journeys` row.
pub struct RawJourney {
  pub journey_id:   String,
  pub load_number:  String,
  pub create_date:  String,
  pub truck_number: String,
  pub created_at:   String,
  pub record_json:  String,
}

impl RawJourney {
  /// Read the columns named by [`JOURNEY_COLUMNS`], in that order.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      journey_id:   row.get(0)?,
      load_number:  row.get(1)?,
      create_date:  row.get(2)?,
      truck_number: row.get(3)?,
      created_at:   row.get(4)?,
      record_json:  row.get(5)?,
    })
  }

  pub fn into_record(self) -> Result<JourneyRecord> {
    let mut record: JourneyRecord = serde_json::from_str(&self.record_json)?;
    record.journey_id = decode_uuid(&self.journey_id)?;
    record.key = NaturalKey {
      load_number:  self.load_number,
      create_date:  decode_date(&self.create_date)?,
      truck_number: self.truck_number,
    };
    record.created_at = decode_dt(&self.created_at)?;
    Ok(record)
  }
}

/// Column values written for one journey.
pub struct EncodedJourney {
  pub journey_id:       String,
  pub load_number:      String,
  pub create_date:      String,
  pub truck_number:     String,
  pub driver_name:      String,
  pub customer_name:    String,
  pub current_status:   String,
  pub efficiency_score: Option<f64>,
  pub record_json:      String,
  pub created_at:       String,
  pub updated_at:       String,
}

impl EncodedJourney {
  pub fn new(record: &JourneyRecord) -> Result<Self> {
    Ok(Self {
      journey_id:       encode_uuid(record.journey_id),
      load_number:      record.key.load_number.clone(),
      create_date:      encode_date(record.key.create_date),
      truck_number:     record.key.truck_number.clone(),
      driver_name:      record.driver_name.clone(),
      customer_name:    record.customer_name.clone(),
      current_status:   record.current_status.to_string(),
      efficiency_score: record.derived.efficiency_score,
      record_json:      serde_json::to_string(record)?,
      created_at:       encode_dt(record.created_at),
      updated_at:       encode_dt(record.updated_at),
    })
  }
}

pub const UPLOAD_COLUMNS: &str = "upload_id, name, kind, uploaded_at, \
  processed, content_hash, created, updated, skipped, conflicts, error";

/// Raw values read from an `uploads` row.
pub struct RawUpload {
  pub upload_id:    String,
  pub name:         String,
  pub kind:         String,
  pub uploaded_at:  String,
  pub processed:    bool,
  pub content_hash: String,
  pub created:      i64,
  pub updated:      i64,
  pub skipped:      i64,
  pub conflicts:    i64,
  pub error:        Option<String>,
}

impl RawUpload {
  /// Read the columns named by [`UPLOAD_COLUMNS`], in that order.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      upload_id:    row.get(0)?,
      name:         row.get(1)?,
      kind:         row.get(2)?,
      uploaded_at:  row.get(3)?,
      processed:    row.get(4)?,
      content_hash: row.get(5)?,
      created:      row.get(6)?,
      updated:      row.get(7)?,
      skipped:      row.get(8)?,
      conflicts:    row.get(9)?,
      error:        row.get(10)?,
    })
  }

  pub fn into_upload(self) -> Result<UploadRecord> {
    let count = |n: i64| usize::try_from(n).unwrap_or_default();
    Ok(UploadRecord {
      upload_id:    decode_uuid(&self.upload_id)?,
      name:         self.name,
      kind:         decode_kind(&self.kind)?,
      uploaded_at:  decode_dt(&self.uploaded_at)?,
      processed:    self.processed,
      content_hash: self.content_hash,
      created:      count(self.created),
      updated:      count(self.updated),
      skipped:      count(self.skipped),
      conflicts:    count(self.conflicts),
      error:        self.error,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unknown_kind_is_a_core_error() {
    assert!(matches!(
      decode_kind("avg_time_route"),
      Err(Error::Core(haul_core::Error::UnknownSourceKind(_)))
    ));
    assert_eq!(decode_kind("other").unwrap(), SourceKind::Generic);
  }

  #[test]
  fn dates_round_trip() {
    let now = Utc::now();
    assert_eq!(decode_dt(&encode_dt(now)).unwrap(), now);
    let d = NaiveDate::from_ymd_opt(2025, 1, 4).unwrap();
    assert_eq!(encode_date(d), "2025-01-04");
    assert_eq!(decode_date("2025-01-04").unwrap(), d);
    assert!(decode_date("04/01/2025").is_err());
  }

  #[test]
  fn identity_columns_override_json() {
    let key = NaturalKey::new(
      "L1",
      NaiveDate::from_ymd_opt(2025, 1, 4).unwrap(),
      "Unknown Vehicle",
    );
    let record = JourneyRecord::new(key, Utc::now());
    let id = Uuid::new_v4();
    let created = Utc::now();

    let raw = RawJourney {
      journey_id:   encode_uuid(id),
      load_number:  "L1".to_owned(),
      create_date:  "2025-01-05".to_owned(),
      truck_number: "ABC123".to_owned(),
      created_at:   encode_dt(created),
      record_json:  serde_json::to_string(&record).unwrap(),
    };
    let decoded = raw.into_record().unwrap();
    assert_eq!(decoded.journey_id, id);
    assert_eq!(decoded.created_at, created);
    assert_eq!(
      decoded.key,
      NaturalKey::new("L1", NaiveDate::from_ymd_opt(2025, 1, 5).unwrap(), "ABC123")
    );
  }
}
