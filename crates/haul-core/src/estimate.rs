//! Last-resort timing estimates for journeys with missing timestamps.
//!
//! Estimates are stored beside the measured data on
//! [`JourneyRecord::estimate`] and never replace a measured timestamp. The
//! derive step uses them only when no measured `total_time` exists and marks
//! the result [`Provenance::Estimated`](crate::journey::Provenance).

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::journey::JourneyRecord;

/// Share of the customer → depot span attributed to the outbound leg when
/// back-filling a departure time.
const OUTBOUND_SHARE: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateStrategy {
  /// Departure known, depot arrival projected from distance.
  DepotArrivalFromDistance,
  /// Departure back-filled from the customer and depot arrivals.
  DepartureFromCustomerArrival,
  /// Departure back-filled from depot arrival and distance.
  DepartureFromDistance,
  /// No timestamps at all; duration from the logged service time.
  DurationFromServiceTime,
  /// No timestamps at all; duration from distance alone.
  DurationFromDistance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingEstimate {
  pub strategy:      EstimateStrategy,
  pub departure:     Option<NaiveDateTime>,
  pub depot_arrival: Option<NaiveDateTime>,
  /// Hours.
  pub total_time:    f64,
}

/// Average speed (km/h) for a whole trip when nothing about its timing is
/// known. Short trips are assumed to be urban and slow.
pub fn band_speed(distance_km: f64) -> f64 {
  if distance_km < 100.0 {
    25.0
  } else if distance_km < 500.0 {
    40.0
  } else {
    50.0
  }
}

/// Average speed (km/h) used to project one missing end of a trip.
pub fn cruise_speed(distance_km: f64) -> f64 {
  if distance_km > 200.0 {
    55.0
  } else if distance_km > 100.0 {
    50.0
  } else {
    40.0
  }
}

/// Service times outside this band (hours) say nothing about the trip.
const SERVICE_HOURS: std::ops::RangeInclusive<f64> = 0.5..=12.0;

/// `None` when `h` hours does not fit a [`Duration`].
fn hours(h: f64) -> Option<Duration> {
  let ms = (h * 3_600_000.0).round();
  if !ms.is_finite() || ms.abs() >= i64::MAX as f64 {
    return None;
  }
  Duration::try_milliseconds(ms as i64)
}

fn span_hours(from: NaiveDateTime, to: NaiveDateTime) -> f64 {
  (to - from).num_milliseconds() as f64 / 3_600_000.0
}

fn after(at: NaiveDateTime, h: f64) -> Option<NaiveDateTime> {
  at.checked_add_signed(hours(h)?)
}

fn before(at: NaiveDateTime, h: f64) -> Option<NaiveDateTime> {
  at.checked_sub_signed(hours(h)?)
}

/// Pick the first applicable strategy for `record`, or `None` when the
/// record is fully timed, has nothing to estimate from, or the result would
/// fall outside the representable calendar.
///
/// Strategies, in order:
/// 1. departure present, depot arrival missing, distance > 0
/// 2. depot arrival present, departure missing, customer arrival before it
/// 3. depot arrival present, departure missing, distance > 0
/// 4. no departure and no depot arrival, service time within 0.5–12 h
/// 5. no departure and no depot arrival, distance > 0
pub fn estimate_timing(record: &JourneyRecord) -> Option<TimingEstimate> {
  let times = &record.times;
  let distance = record.legs.total().filter(|d| *d > 0.0);

  let estimate = match (times.dj_departure_time, times.arrival_at_depot) {
    (Some(_), Some(_)) => return None,
    (Some(departure), None) => {
      let distance = distance?;
      let total_time = distance / cruise_speed(distance);
      TimingEstimate {
        strategy: EstimateStrategy::DepotArrivalFromDistance,
        departure: None,
        depot_arrival: Some(after(departure, total_time)?),
        total_time,
      }
    }
    (None, Some(depot_arrival)) => match times.arrival_at_customer {
      Some(customer) if customer < depot_arrival => {
        let back = span_hours(customer, depot_arrival);
        let outbound = back * OUTBOUND_SHARE;
        TimingEstimate {
          strategy: EstimateStrategy::DepartureFromCustomerArrival,
          departure: Some(before(customer, outbound)?),
          depot_arrival: None,
          total_time: outbound + back,
        }
      }
      _ => {
        let distance = distance?;
        let total_time = distance / cruise_speed(distance);
        TimingEstimate {
          strategy: EstimateStrategy::DepartureFromDistance,
          departure: Some(before(depot_arrival, total_time)?),
          depot_arrival: None,
          total_time,
        }
      }
    },
    (None, None) => {
      let service = record
        .service_time_at_customer
        .map(|m| m as f64 / 60.0)
        .filter(|h| SERVICE_HOURS.contains(h));
      match (service, distance) {
        (Some(total_time), _) => TimingEstimate {
          strategy: EstimateStrategy::DurationFromServiceTime,
          departure: None,
          depot_arrival: None,
          total_time,
        },
        (None, Some(distance)) => TimingEstimate {
          strategy: EstimateStrategy::DurationFromDistance,
          departure: None,
          depot_arrival: None,
          total_time: distance / band_speed(distance),
        },
        (None, None) => return None,
      }
    }
  };

  estimate.total_time.is_finite().then_some(estimate)
}
