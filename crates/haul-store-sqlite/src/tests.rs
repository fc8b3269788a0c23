//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{DateTime, NaiveDate, TimeZone as _, Utc};
use haul_core::{
  extract::{ExtractContext, RawRow},
  journey::{NaturalKey, Provenance, UNKNOWN_CUSTOMER, UNKNOWN_VEHICLE},
  source::SourceKind,
  status::JourneyStatus,
  store::{
    EstimateReport, FileBatch, JourneyQuery, JourneyStore, NewUpload, RowError,
    RowExtraction,
  },
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2025, 1, 20, 12, 0, 0).unwrap() }

fn day() -> NaiveDate { NaiveDate::from_ymd_opt(2025, 1, 4).unwrap() }

fn batch(kind: SourceKind, hash: &str, rows: &[&[(&str, &str)]]) -> FileBatch {
  let ctx = ExtractContext { today: day() };
  let mut extracted = Vec::new();
  let mut rejected = Vec::new();
  for (i, cells) in rows.iter().enumerate() {
    let row: RawRow = cells.iter().copied().collect();
    match kind.extract(&row, &ctx) {
      Ok(extraction) => extracted.push(RowExtraction { row: i + 1, extraction }),
      Err(e) => rejected.push(RowError { row: i + 1, message: e.to_string() }),
    }
  }
  FileBatch {
    upload: NewUpload {
      name:         format!("{kind}.csv"),
      kind,
      content_hash: hash.to_owned(),
    },
    rows: extracted,
    rejected,
    now: now(),
  }
}

fn depot_row<'a>(load: &'a str, truck: &'a str) -> Vec<(&'a str, &'a str)> {
  vec![
    ("Load Number", load),
    ("Vehicle Reg", truck),
    ("Schedule Date", "2025-01-04"),
    ("Driver Name", "J. Moyo"),
    ("DJ Departure Time", "2025-01-04 08:00"),
  ]
}

// ─── Ingestion ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn ingest_creates_then_updates() {
  let s = store().await;
  let row = depot_row("L1", "ABC123");

  let first = s
    .ingest_file(batch(SourceKind::DepotDepartures, "h1", &[&row[..]]))
    .await
    .unwrap();
  assert_eq!(first.upload.created, 1);
  assert_eq!(first.upload.updated, 0);
  assert!(!first.duplicate);

  let second = s
    .ingest_file(batch(SourceKind::DepotDepartures, "h1", &[&row[..]]))
    .await
    .unwrap();
  assert_eq!(second.upload.created, 0);
  assert_eq!(second.upload.updated, 1);
  assert!(second.duplicate);

  let all = s.search(JourneyQuery::default()).await.unwrap();
  assert_eq!(all.len(), 1, "same natural key must reconcile into one record");
  assert_eq!(all[0].current_status, JourneyStatus::InTransit);
}

#[tokio::test]
async fn files_of_different_kinds_merge_into_one_record() {
  let s = store().await;
  s.ingest_file(batch(SourceKind::DepotDepartures, "h1", &[&depot_row("L1", "ABC123")[..]]))
    .await
    .unwrap();

  let depot_arrival: &[(&str, &str)] = &[
    ("load_name", "L1"),
    ("schedule_date", "04/01/2025"),
    ("ArriveAtDepot(Odo)", "04/01/2025 14:30"),
  ];
  let distance: &[(&str, &str)] = &[
    ("Load Number", "L1"),
    ("Vehicle Reg", "ABC123"),
    ("Schedule Date", "2025-01-04"),
    ("D1", "300"),
  ];
  let report = s
    .ingest_file(batch(SourceKind::TimestampsDuration, "h2", &[depot_arrival]))
    .await
    .unwrap();
  assert_eq!(report.upload.updated, 1, "placeholder vehicle joins the depot record");
  s.ingest_file(batch(SourceKind::DistanceInfo, "h3", &[distance]))
    .await
    .unwrap();

  let all = s.search(JourneyQuery::default()).await.unwrap();
  assert_eq!(all.len(), 1);
  let rec = &all[0];
  assert_eq!(rec.truck_number(), "ABC123");
  assert_eq!(rec.driver_name, "J. Moyo");
  assert_eq!(rec.derived.total_time, Some(6.5));
  assert_eq!(rec.derived.total_distance, Some(300.0));
  assert_eq!(rec.current_status, JourneyStatus::Completed);
  assert_eq!(rec.sources.len(), 3);
}

#[tokio::test]
async fn real_vehicle_adopts_placeholder_record() {
  let s = store().await;
  let route: &[(&str, &str)] = &[
    ("Load", "L7"),
    ("Schedule Date", "2025-01-04"),
    ("Route End Time", "2025/01/04 15:00"),
  ];
  s.ingest_file(batch(SourceKind::TimeRouteInfo, "h1", &[route]))
    .await
    .unwrap();
  let placeholder_key = NaturalKey::new("L7", day(), UNKNOWN_VEHICLE);
  let before = s.find_journey(placeholder_key.clone()).await.unwrap().unwrap();

  s.ingest_file(batch(SourceKind::DepotDepartures, "h2", &[&depot_row("L7", "XYZ9")[..]]))
    .await
    .unwrap();

  assert!(s.find_journey(placeholder_key).await.unwrap().is_none());
  let adopted = s
    .find_journey(NaturalKey::new("L7", day(), "XYZ9"))
    .await
    .unwrap()
    .unwrap();
  assert_eq!(adopted.journey_id, before.journey_id);
  assert_eq!(adopted.derived.total_time, Some(7.0));
}

#[tokio::test]
async fn ambiguous_placeholder_does_not_merge() {
  let s = store().await;
  let a = depot_row("L1", "AAA");
  let b = depot_row("L1", "BBB");
  s.ingest_file(batch(SourceKind::DepotDepartures, "h1", &[&a[..], &b[..]]))
    .await
    .unwrap();

  let customer: &[(&str, &str)] = &[
    ("Load Number", "L1"),
    ("schedule_date", "04/01/2025"),
    ("customer_name", "ACME Ltd"),
  ];
  let report = s
    .ingest_file(batch(SourceKind::CustomerTimestamps, "h2", &[customer]))
    .await
    .unwrap();
  assert_eq!(report.upload.created, 1);
  assert_eq!(s.search(JourneyQuery::default()).await.unwrap().len(), 3);
}

#[tokio::test]
async fn rejected_rows_are_counted_as_skipped() {
  let s = store().await;
  let good = depot_row("L1", "ABC123");
  let bad: &[(&str, &str)] = &[("Vehicle Reg", "ABC123")];

  let report = s
    .ingest_file(batch(SourceKind::DepotDepartures, "h1", &[bad, &good[..]]))
    .await
    .unwrap();
  assert_eq!(report.upload.created, 1);
  assert_eq!(report.upload.skipped, 1);
  assert_eq!(report.errors.len(), 1);
  assert_eq!(report.errors[0].row, 1);
}

#[tokio::test]
async fn conflicts_are_reported_and_last_write_wins() {
  let s = store().await;
  let first: &[(&str, &str)] = &[
    ("Load Number", "L1"),
    ("Vehicle Reg", "ABC123"),
    ("Schedule Date", "2025-01-04"),
    ("Customer", "ACME Ltd"),
  ];
  let second: &[(&str, &str)] = &[
    ("Load Number", "L1"),
    ("Vehicle Reg", "ABC123"),
    ("Schedule Date", "2025-01-04"),
    ("Customer", "Acme Limited"),
  ];
  s.ingest_file(batch(SourceKind::DistanceInfo, "h1", &[first]))
    .await
    .unwrap();
  let report = s
    .ingest_file(batch(SourceKind::DistanceInfo, "h2", &[second]))
    .await
    .unwrap();

  assert_eq!(report.upload.conflicts, 1);
  assert_eq!(report.conflicts[0].conflict.field, "customer_name");
  let rec = s
    .find_journey(NaturalKey::new("L1", day(), "ABC123"))
    .await
    .unwrap()
    .unwrap();
  assert_eq!(rec.customer_name, "Acme Limited");
}

// ─── Uploads ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn failed_uploads_are_listed_unprocessed() {
  let s = store().await;
  let upload = NewUpload {
    name:         "broken.csv".into(),
    kind:         SourceKind::Generic,
    content_hash: "00".into(),
  };
  let rec = s
    .record_failed_upload(upload, "no header row".into(), now())
    .await
    .unwrap();
  assert!(!rec.processed);

  let listed = s.list_uploads().await.unwrap();
  assert_eq!(listed, vec![rec]);
}

// ─── Queries ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn get_journey_by_id() {
  let s = store().await;
  s.ingest_file(batch(SourceKind::DepotDepartures, "h1", &[&depot_row("L1", "ABC123")[..]]))
    .await
    .unwrap();
  let rec = s.search(JourneyQuery::default()).await.unwrap().remove(0);

  let fetched = s.get_journey(rec.journey_id).await.unwrap().unwrap();
  assert_eq!(fetched, rec);
  assert!(s.get_journey(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn search_filters() {
  let s = store().await;
  let done: &[(&str, &str)] = &[
    ("Load Number", "L1"),
    ("Vehicle Reg", "AAA"),
    ("Schedule Date", "2025-01-04"),
    ("DJ Departure Time", "2025-01-04 08:00"),
    ("Arrival At Depot", "2025-01-04 12:00"),
  ];
  let done_distance: &[(&str, &str)] = &[
    ("Load Number", "L1"),
    ("Vehicle Reg", "AAA"),
    ("Schedule Date", "2025-01-04"),
    ("D1", "200"),
  ];
  let pending: &[(&str, &str)] = &[
    ("Load Number", "L2"),
    ("Vehicle Reg", "BBB"),
    ("Schedule Date", "2025-01-10"),
    ("Customer", "Shoprite Gweru"),
  ];
  s.ingest_file(batch(SourceKind::Generic, "h1", &[done]))
    .await
    .unwrap();
  s.ingest_file(batch(SourceKind::DistanceInfo, "h2", &[done_distance, pending]))
    .await
    .unwrap();

  let q = |f: fn(&mut JourneyQuery)| {
    let mut query = JourneyQuery::default();
    f(&mut query);
    query
  };

  let hits = s.search(q(|q| q.text = Some("gweru".into()))).await.unwrap();
  assert_eq!(hits.len(), 1);
  assert_eq!(hits[0].load_number(), "L2");

  let hits = s
    .search(q(|q| q.status = Some(JourneyStatus::Completed)))
    .await
    .unwrap();
  assert_eq!(hits.len(), 1);
  assert_eq!(hits[0].load_number(), "L1");

  let hits = s
    .search(q(|q| q.date_from = NaiveDate::from_ymd_opt(2025, 1, 5)))
    .await
    .unwrap();
  assert_eq!(hits.len(), 1);

  let hits = s
    .search(q(|q| {
      q.min_efficiency = Some(40.0);
      q.max_efficiency = Some(60.0);
    }))
    .await
    .unwrap();
  assert_eq!(hits.len(), 1);
  assert_eq!(hits[0].derived.efficiency_score, Some(50.0));

  let hits = s.search(q(|q| q.limit = Some(1))).await.unwrap();
  assert_eq!(hits.len(), 1);
  let hits = s.search(q(|q| q.offset = Some(1))).await.unwrap();
  assert_eq!(hits.len(), 1);
  assert_eq!(hits[0].load_number(), "L2");
}

// ─── Maintenance ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn refresh_all_rederives_status_over_time() {
  let s = store().await;
  let future: &[(&str, &str)] = &[
    ("Load Number", "L1"),
    ("Vehicle Reg", "AAA"),
    ("Schedule Date", "2025-02-01"),
    ("DJ Departure Time", "2025-02-01 08:00"),
  ];
  s.ingest_file(batch(SourceKind::DepotDepartures, "h1", &[future]))
    .await
    .unwrap();
  let rec = s.search(JourneyQuery::default()).await.unwrap().remove(0);
  assert_eq!(rec.current_status, JourneyStatus::Delayed);

  let later = Utc.with_ymd_and_hms(2025, 2, 1, 10, 0, 0).unwrap();
  assert_eq!(s.refresh_all(later).await.unwrap(), 1);
  assert_eq!(s.refresh_all(later).await.unwrap(), 0);

  let rec = s.get_journey(rec.journey_id).await.unwrap().unwrap();
  assert_eq!(rec.current_status, JourneyStatus::InTransit);
}

fn distance_row<'a>(load: &'a str, truck: &'a str, d1: &'a str) -> Vec<(&'a str, &'a str)> {
  vec![
    ("Load Number", load),
    ("Vehicle Reg", truck),
    ("Schedule Date", "2025-01-04"),
    ("D1", d1),
  ]
}

fn customer_row<'a>(load: &'a str, truck: &'a str) -> Vec<(&'a str, &'a str)> {
  vec![
    ("load_name", load),
    ("Vehicle Reg", truck),
    ("schedule_date", "04/01/2025"),
    ("customer_name", "ACME Ltd"),
    ("ArrivedAtCustomer(Odo)", "04/01/2025 09:30"),
  ]
}

#[tokio::test]
async fn apply_estimates_keeps_data_merged_after_a_read() {
  let s = store().await;
  s.ingest_file(batch(SourceKind::DepotDepartures, "h1", &[&depot_row("L1", "ABC123")[..]]))
    .await
    .unwrap();
  s.ingest_file(batch(SourceKind::DistanceInfo, "h2", &[&distance_row("L1", "ABC123", "80")[..]]))
    .await
    .unwrap();
  let before = s.search(JourneyQuery::default()).await.unwrap().remove(0);
  assert_eq!(before.customer_name, UNKNOWN_CUSTOMER);

  s.ingest_file(batch(SourceKind::CustomerTimestamps, "h3", &[&customer_row("L1", "ABC123")[..]]))
    .await
    .unwrap();
  let report = s.apply_estimates(now()).await.unwrap();
  assert_eq!(report, EstimateReport { examined: 1, estimated: 1, cleared: 0 });

  let rec = s.get_journey(before.journey_id).await.unwrap().unwrap();
  assert_eq!(rec.customer_name, "ACME Ltd");
  assert_eq!(rec.sources.len(), 3);
  assert_eq!(rec.derived.total_time, Some(2.0));
  assert_eq!(rec.derived.time_provenance, Provenance::Estimated);
}

#[tokio::test]
async fn apply_estimates_and_ingest_run_concurrently() {
  let s = store().await;
  s.ingest_file(batch(SourceKind::DepotDepartures, "h1", &[&depot_row("L1", "ABC123")[..]]))
    .await
    .unwrap();
  s.ingest_file(batch(SourceKind::DistanceInfo, "h2", &[&distance_row("L1", "ABC123", "80")[..]]))
    .await
    .unwrap();

  let customers = batch(SourceKind::CustomerTimestamps, "h3", &[&customer_row("L1", "ABC123")[..]]);
  let (estimated, ingested) = tokio::join!(s.apply_estimates(now()), s.ingest_file(customers));
  estimated.unwrap();
  assert_eq!(ingested.unwrap().upload.updated, 1);

  let rec = s.search(JourneyQuery::default()).await.unwrap().remove(0);
  assert_eq!(rec.customer_name, "ACME Ltd");
  assert!(rec.estimate.is_some());
  assert_eq!(rec.derived.time_provenance, Provenance::Estimated);
}

#[tokio::test]
async fn apply_estimates_skips_unrepresentable_projections() {
  let s = store().await;
  s.ingest_file(batch(SourceKind::DepotDepartures, "h1", &[&depot_row("L1", "ABC123")[..]]))
    .await
    .unwrap();
  s.ingest_file(batch(SourceKind::DistanceInfo, "h2", &[&distance_row("L1", "ABC123", "1e12")[..]]))
    .await
    .unwrap();

  let report = s.apply_estimates(now()).await.unwrap();
  assert_eq!(report, EstimateReport { examined: 1, estimated: 0, cleared: 0 });

  let rec = s.search(JourneyQuery::default()).await.unwrap().remove(0);
  assert_eq!(rec.estimate, None);
  assert_eq!(rec.derived.total_distance, Some(1e12));
}

#[tokio::test]
async fn save_rederives_and_requires_existing_record() {
  let s = store().await;
  s.ingest_file(batch(SourceKind::DepotDepartures, "h1", &[&depot_row("L1", "ABC123")[..]]))
    .await
    .unwrap();
  let mut rec = s.search(JourneyQuery::default()).await.unwrap().remove(0);
  rec.legs.d1 = Some(120.0);

  let saved = s.save(rec.clone(), now()).await.unwrap();
  assert_eq!(saved.derived.total_distance, Some(120.0));

  let mut stray = rec;
  stray.journey_id = Uuid::new_v4();
  assert!(matches!(
    s.save(stray, now()).await,
    Err(crate::Error::JourneyNotFound(_))
  ));
}

#[tokio::test]
async fn clear_removes_everything() {
  let s = store().await;
  s.ingest_file(batch(SourceKind::DepotDepartures, "h1", &[&depot_row("L1", "ABC123")[..]]))
    .await
    .unwrap();

  let summary = s.clear().await.unwrap();
  assert_eq!(summary.journeys, 1);
  assert_eq!(summary.uploads, 1);
  assert!(s.search(JourneyQuery::default()).await.unwrap().is_empty());
  assert!(s.list_uploads().await.unwrap().is_empty());
}
