//! The canonical journey record and its component types.
//!
//! A [`JourneyRecord`] is identified by its [`NaturalKey`]. Raw inputs
//! (timestamps, distance legs, descriptive strings) are filled in by the
//! merge policy; everything under [`DerivedMetrics`] is recomputed by
//! [`crate::metrics::derive`] and never set by hand.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  estimate::TimingEstimate, source::SourceKind, status::JourneyStatus,
};

// ─── Placeholders ────────────────────────────────────────────────────────────

pub const UNKNOWN: &str = "Unknown";
pub const UNKNOWN_CUSTOMER: &str = "Unknown Customer";
pub const UNKNOWN_DRIVER: &str = "Unknown Driver";
pub const UNKNOWN_VEHICLE: &str = "Unknown Vehicle";

const PLACEHOLDERS: &[&str] =
  &[UNKNOWN, UNKNOWN_CUSTOMER, UNKNOWN_DRIVER, UNKNOWN_VEHICLE, "nan"];

/// True for empty strings and the sentinel strings exporters use for
/// missing data. Comparison ignores case and surrounding whitespace.
pub fn is_placeholder(value: &str) -> bool {
  let value = value.trim();
  value.is_empty() || PLACEHOLDERS.iter().any(|p| p.eq_ignore_ascii_case(value))
}

// ─── Identity ────────────────────────────────────────────────────────────────

/// `(load_number, create_date, truck_number)`; at most one record per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NaturalKey {
  pub load_number:  String,
  pub create_date:  NaiveDate,
  pub truck_number: String,
}

impl NaturalKey {
  pub fn new(
    load_number: impl Into<String>,
    create_date: NaiveDate,
    truck_number: impl Into<String>,
  ) -> Self {
    Self {
      load_number: load_number.into(),
      create_date,
      truck_number: truck_number.into(),
    }
  }

  pub fn has_placeholder_vehicle(&self) -> bool {
    is_placeholder(&self.truck_number)
  }
}

impl std::fmt::Display for NaturalKey {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}/{}/{}", self.load_number, self.create_date, self.truck_number)
  }
}

// ─── Raw inputs ──────────────────────────────────────────────────────────────

/// Every timestamp a source file can contribute. All values are naive UTC.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
  pub dj_departure_time:            Option<NaiveDateTime>,
  pub arrival_at_customer:          Option<NaiveDateTime>,
  pub departure_time_from_customer: Option<NaiveDateTime>,
  pub arrival_at_depot:             Option<NaiveDateTime>,
  pub clock_out:                    Option<NaiveDateTime>,
  pub planned_departure_time:       Option<NaiveDateTime>,
  pub planned_arrival_time:         Option<NaiveDateTime>,
}

impl Timestamps {
  pub fn is_empty(&self) -> bool { *self == Self::default() }

  /// End of the journey for route-duration purposes: clock-out if known,
  /// otherwise depot arrival.
  pub fn route_end(&self) -> Option<NaiveDateTime> {
    self.clock_out.or(self.arrival_at_depot)
  }
}

/// Per-leg distances in kilometres.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Legs {
  pub d1: Option<f64>,
  pub d2: Option<f64>,
  pub d3: Option<f64>,
  pub d4: Option<f64>,
}

impl Legs {
  pub fn iter(&self) -> impl Iterator<Item = Option<f64>> {
    [self.d1, self.d2, self.d3, self.d4].into_iter()
  }

  /// Sum of the non-null legs; `None` when all four are null.
  pub fn total(&self) -> Option<f64> {
    self
      .iter()
      .flatten()
      .fold(None, |acc, d| Some(acc.unwrap_or(0.0) + d))
  }
}

// ─── Derived ─────────────────────────────────────────────────────────────────

/// Where a timing figure came from.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
  strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Provenance {
  Measured,
  Estimated,
  #[default]
  Absent,
}

/// Data-quality conditions surfaced by the derive step. They never block a
/// save; the figures are kept as computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityFlag {
  /// Depot arrival precedes departure.
  NegativeTotalTime,
  /// Customer arrival precedes departure.
  NegativeDeliveryTime,
  /// Route end precedes departure.
  NegativeRouteDuration,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
  pub total_distance:             Option<f64>,
  pub km_deviation:               Option<f64>,
  /// Hours, departure → depot arrival.
  pub total_time:                 Option<f64>,
  /// Hours, departure → customer arrival. Only set when `total_time` could
  /// not be measured.
  pub delivery_time:              Option<f64>,
  /// km/h.
  pub efficiency_score:           Option<f64>,
  pub time_provenance:            Provenance,
  pub clockin_time:               Option<NaiveDateTime>,
  pub actual_days_in_route:       Option<f64>,
  pub bud_days_in_route:          Option<f64>,
  pub days_in_route_deviation:    Option<f64>,
  pub total_hour_route:           Option<f64>,
  pub total_working_hours:        Option<f64>,
  pub driver_rest_hours_in_route: Option<f64>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub quality:                    Vec<QualityFlag>,
}

// ─── Record ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JourneyRecord {
  pub journey_id:               Uuid,
  #[serde(flatten)]
  pub key:                      NaturalKey,
  pub month_name:               String,
  pub transporter:              String,
  pub driver_name:              String,
  pub customer_name:            String,
  pub mode_of_capture:          String,
  #[serde(flatten)]
  pub times:                    Timestamps,
  #[serde(flatten)]
  pub legs:                     Legs,
  pub budgeted_kms:             Option<f64>,
  pub departure_deviation_min:  Option<f64>,
  /// Minutes spent at the customer.
  pub service_time_at_customer: Option<i64>,
  pub tlp_vol_hl:               Option<f64>,
  pub comment_ave_tir:          Option<String>,
  /// Last-resort timing guess from the maintenance pass; measured
  /// timestamps always take precedence.
  pub estimate:                 Option<TimingEstimate>,
  pub derived:                  DerivedMetrics,
  pub current_status:           JourneyStatus,
  pub sources:                  BTreeSet<SourceKind>,
  pub created_at:               DateTime<Utc>,
  pub updated_at:               DateTime<Utc>,
}

impl JourneyRecord {
  /// A fresh record for `key` with placeholder descriptive fields and no
  /// timing data. Callers run it through [`crate::metrics::derive`] before
  /// persisting.
  pub fn new(key: NaturalKey, now: DateTime<Utc>) -> Self {
    Self {
      journey_id: Uuid::new_v4(),
      month_name: key.create_date.format("%B").to_string(),
      key,
      transporter: UNKNOWN.to_owned(),
      driver_name: UNKNOWN_DRIVER.to_owned(),
      customer_name: UNKNOWN_CUSTOMER.to_owned(),
      mode_of_capture: UNKNOWN.to_owned(),
      times: Timestamps::default(),
      legs: Legs::default(),
      budgeted_kms: None,
      departure_deviation_min: None,
      service_time_at_customer: None,
      tlp_vol_hl: None,
      comment_ave_tir: None,
      estimate: None,
      derived: DerivedMetrics::default(),
      current_status: JourneyStatus::Pending,
      sources: BTreeSet::new(),
      created_at: now,
      updated_at: now,
    }
  }

  pub fn load_number(&self) -> &str { &self.key.load_number }

  pub fn truck_number(&self) -> &str { &self.key.truck_number }

  /// Efficiency usable for averages: measured and inside the plausibility
  /// band.
  pub fn measured_efficiency(&self) -> Option<f64> {
    match self.derived.time_provenance {
      Provenance::Measured => self
        .derived
        .efficiency_score
        .filter(|e| crate::metrics::plausible_efficiency(*e)),
      _ => None,
    }
  }
}
