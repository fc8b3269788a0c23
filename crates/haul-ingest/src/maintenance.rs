//! Maintenance passes over stored journeys.
//!
//! Neither pass is part of the normal save path: estimation fills in
//! last-resort timing for records that have none, and the plausibility
//! check lists records whose measured efficiency looks like a data error.

use chrono::{DateTime, Utc};
use haul_core::{
  journey::JourneyRecord,
  metrics::plausible_efficiency,
  store::{EstimateReport, JourneyQuery, JourneyStore},
};
use tracing::info;

use crate::{Error, Result};

/// Run the store's estimation pass and log its outcome.
pub async fn apply_estimates<S>(store: &S, now: DateTime<Utc>) -> Result<EstimateReport>
where
  S: JourneyStore,
{
  let report = store.apply_estimates(now).await.map_err(Error::store)?;
  info!(
    examined = report.examined,
    estimated = report.estimated,
    cleared = report.cleared,
    "estimation pass finished",
  );
  Ok(report)
}

/// Records whose efficiency score falls outside the plausible band.
pub async fn implausible<S>(store: &S) -> Result<Vec<JourneyRecord>>
where
  S: JourneyStore,
{
  let records = store
    .search(JourneyQuery::default())
    .await
    .map_err(Error::store)?;
  Ok(
    records
      .into_iter()
      .filter(|r| {
        r.derived
          .efficiency_score
          .is_some_and(|e| !plausible_efficiency(e))
      })
      .collect(),
  )
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone as _;
  use haul_core::{journey::Provenance, source::SourceKind};
  use haul_store_sqlite::SqliteStore;

  use super::*;
  use crate::orchestrate::{UploadFile, ingest_file};

  fn now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2025, 1, 20, 12, 0, 0).unwrap() }

  async fn load(store: &SqliteStore, kind: SourceKind, body: &str) {
    let file = UploadFile { name: format!("{kind}.csv"), kind, bytes: body.into() };
    ingest_file(store, file, now()).await.unwrap();
  }

  #[tokio::test]
  async fn estimates_untimed_records_and_clears_when_measured() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    load(
      &store,
      SourceKind::DistanceInfo,
      "Load Number,Vehicle Reg,Schedule Date,D1\nL1,ABC,2025-01-04,50\n",
    )
    .await;

    let report = apply_estimates(&store, now()).await.unwrap();
    assert_eq!(report, EstimateReport { examined: 1, estimated: 1, cleared: 0 });

    let rec = store.search(JourneyQuery::default()).await.unwrap().remove(0);
    assert_eq!(rec.derived.total_time, Some(2.0));
    assert_eq!(rec.derived.time_provenance, Provenance::Estimated);
    assert_eq!(rec.times.dj_departure_time, None);

    let again = apply_estimates(&store, now()).await.unwrap();
    assert_eq!(again.estimated, 0);

    load(
      &store,
      SourceKind::Generic,
      "Load Number,Vehicle Reg,Schedule Date,DJ Departure Time,Arrival At Depot\n\
       L1,ABC,2025-01-04,2025-01-04 08:00,2025-01-04 09:00\n",
    )
    .await;
    let report = apply_estimates(&store, now()).await.unwrap();
    assert_eq!(report.cleared, 1);

    let rec = store.search(JourneyQuery::default()).await.unwrap().remove(0);
    assert_eq!(rec.estimate, None);
    assert_eq!(rec.derived.time_provenance, Provenance::Measured);
    assert_eq!(rec.derived.efficiency_score, Some(50.0));
  }

  #[tokio::test]
  async fn lists_records_outside_the_band() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    load(
      &store,
      SourceKind::Generic,
      "Load Number,Vehicle Reg,Schedule Date,DJ Departure Time,Arrival At Depot\n\
       L1,AAA,2025-01-04,2025-01-04 08:00,2025-01-04 09:00\n\
       L2,BBB,2025-01-04,2025-01-04 08:00,2025-01-04 09:00\n",
    )
    .await;
    load(
      &store,
      SourceKind::DistanceInfo,
      "Load Number,Vehicle Reg,Schedule Date,D1\n\
       L1,AAA,2025-01-04,60\n\
       L2,BBB,2025-01-04,400\n",
    )
    .await;

    let odd = implausible(&store).await.unwrap();
    assert_eq!(odd.len(), 1);
    assert_eq!(odd[0].load_number(), "L2");
  }
}
