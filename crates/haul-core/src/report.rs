//! Fleet-level summaries over a set of journey records.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{
  journey::{JourneyRecord, Provenance, is_placeholder},
  metrics::round2,
  status::JourneyStatus,
};

/// Speed bands used to grade measured efficiency (km/h).
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EfficiencyBand {
  /// 40 – 80
  Excellent,
  /// 20 – 40
  Good,
  /// 10 – 20
  Moderate,
  /// 5 – 10
  Poor,
  /// below 5
  Critical,
  /// above 80, almost certainly a data error
  Implausible,
}

impl EfficiencyBand {
  pub fn of(score: f64) -> Self {
    match score {
      s if s > 80.0 => Self::Implausible,
      s if s >= 40.0 => Self::Excellent,
      s if s >= 20.0 => Self::Good,
      s if s >= 10.0 => Self::Moderate,
      s if s >= 5.0 => Self::Poor,
      _ => Self::Critical,
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
  pub total_journeys:     usize,
  pub distinct_trucks:    usize,
  pub distinct_drivers:   usize,
  pub distinct_customers: usize,
  pub total_distance:     f64,
  /// Mean of measured, plausible efficiency scores.
  pub average_efficiency: Option<f64>,
  pub measured:           usize,
  pub estimated:          usize,
  pub by_status:          BTreeMap<String, usize>,
  /// Measured efficiency only; estimated figures are not graded.
  pub by_band:            BTreeMap<EfficiencyBand, usize>,
}

impl Summary {
  pub fn from_records(records: &[JourneyRecord]) -> Self {
    let mut s = Self { total_journeys: records.len(), ..Self::default() };

    let distinct = |field: fn(&JourneyRecord) -> &str| {
      records
        .iter()
        .map(field)
        .filter(|v| !is_placeholder(v))
        .collect::<HashSet<_>>()
        .len()
    };
    s.distinct_trucks = distinct(|r| r.truck_number());
    s.distinct_drivers = distinct(|r| r.driver_name.as_str());
    s.distinct_customers = distinct(|r| r.customer_name.as_str());

    for status in <JourneyStatus as strum::IntoEnumIterator>::iter() {
      s.by_status.insert(status.to_string(), 0);
    }

    let mut efficiency_sum = 0.0;
    let mut efficiency_n = 0usize;
    for rec in records {
      *s.by_status.entry(rec.current_status.to_string()).or_default() += 1;
      s.total_distance += rec.derived.total_distance.unwrap_or(0.0);

      match rec.derived.time_provenance {
        Provenance::Measured => s.measured += 1,
        Provenance::Estimated => s.estimated += 1,
        Provenance::Absent => {}
      }
      if rec.derived.time_provenance == Provenance::Measured
        && let Some(score) = rec.derived.efficiency_score
      {
        *s.by_band.entry(EfficiencyBand::of(score)).or_default() += 1;
      }
      if let Some(score) = rec.measured_efficiency() {
        efficiency_sum += score;
        efficiency_n += 1;
      }
    }

    s.total_distance = round2(s.total_distance);
    s.average_efficiency =
      (efficiency_n > 0).then(|| round2(efficiency_sum / efficiency_n as f64));
    s
  }
}

#[cfg(test)]
mod tests {
  use chrono::{NaiveDate, Utc};

  use super::*;
  use crate::journey::{NaturalKey, UNKNOWN_VEHICLE};

  fn record(load: &str, truck: &str, score: Option<f64>, p: Provenance) -> JourneyRecord {
    let key = NaturalKey::new(load, NaiveDate::from_ymd_opt(2025, 1, 4).unwrap(), truck);
    let mut rec = JourneyRecord::new(key, Utc::now());
    rec.derived.efficiency_score = score;
    rec.derived.time_provenance = p;
    rec.derived.total_distance = Some(100.0);
    rec
  }

  #[test]
  fn bands() {
    assert_eq!(EfficiencyBand::of(80.0), EfficiencyBand::Excellent);
    assert_eq!(EfficiencyBand::of(40.0), EfficiencyBand::Excellent);
    assert_eq!(EfficiencyBand::of(39.9), EfficiencyBand::Good);
    assert_eq!(EfficiencyBand::of(10.0), EfficiencyBand::Moderate);
    assert_eq!(EfficiencyBand::of(5.0), EfficiencyBand::Poor);
    assert_eq!(EfficiencyBand::of(4.9), EfficiencyBand::Critical);
    assert_eq!(EfficiencyBand::of(120.0), EfficiencyBand::Implausible);
  }

  #[test]
  fn summary_averages_measured_plausible_scores_only() {
    let records = [
      record("L1", "T1", Some(40.0), Provenance::Measured),
      record("L2", "T2", Some(20.0), Provenance::Measured),
      record("L3", "T2", Some(300.0), Provenance::Measured),
      record("L4", UNKNOWN_VEHICLE, Some(25.0), Provenance::Estimated),
      record("L5", UNKNOWN_VEHICLE, None, Provenance::Absent),
    ];
    let s = Summary::from_records(&records);

    assert_eq!(s.total_journeys, 5);
    assert_eq!(s.distinct_trucks, 2);
    assert_eq!(s.distinct_drivers, 0);
    assert_eq!(s.average_efficiency, Some(30.0));
    assert_eq!(s.measured, 3);
    assert_eq!(s.estimated, 1);
    assert_eq!(s.total_distance, 500.0);
    assert_eq!(s.by_band.get(&EfficiencyBand::Implausible), Some(&1));
    assert_eq!(s.by_band.get(&EfficiencyBand::Excellent), Some(&1));
    assert_eq!(s.by_status.get("pending"), Some(&5));
    assert_eq!(s.by_status.get("completed"), Some(&0));
  }

  #[test]
  fn empty_summary() {
    let s = Summary::from_records(&[]);
    assert_eq!(s.total_journeys, 0);
    assert_eq!(s.average_efficiency, None);
  }
}
