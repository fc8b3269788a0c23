//! Derived Metrics Engine.
//!
//! [`derive`] is the single place derived fields are computed. The store
//! calls it on every write; it is pure and never fails, so a figure that
//! cannot be computed is simply left as `None`.

use std::ops::RangeInclusive;

use chrono::{NaiveDateTime, TimeDelta};

use crate::{
  journey::{DerivedMetrics, JourneyRecord, Provenance, QualityFlag},
  status::derive_status,
};

/// Contractual working hours per day in route.
pub const WORKING_HOURS_PER_DAY: f64 = 11.0;

/// Offset between clock-in and depot departure.
pub const CLOCKIN_LEAD_MINUTES: i64 = 30;

/// km/h band outside which an efficiency figure is considered a data error.
pub const PLAUSIBLE_EFFICIENCY: RangeInclusive<f64> = 5.0..=80.0;

pub fn plausible_efficiency(score: f64) -> bool {
  PLAUSIBLE_EFFICIENCY.contains(&score)
}

pub fn round2(value: f64) -> f64 { (value * 100.0).round() / 100.0 }

fn hours(delta: TimeDelta) -> f64 {
  delta.num_milliseconds() as f64 / 3_600_000.0
}

fn days(delta: TimeDelta) -> f64 { hours(delta) / 24.0 }

/// Recompute every derived field of `record` as of `now`.
///
/// Running it twice on the same raw inputs yields identical output.
pub fn derive(mut record: JourneyRecord, now: NaiveDateTime) -> JourneyRecord {
  let times = &record.times;
  let mut m = DerivedMetrics::default();

  m.total_distance = record.legs.total();
  m.km_deviation = record
    .budgeted_kms
    .zip(m.total_distance)
    .map(|(budget, total)| budget - total);

  match (
    times.dj_departure_time,
    times.arrival_at_depot,
    times.arrival_at_customer,
  ) {
    (Some(dep), Some(depot), _) => {
      let total = hours(depot - dep);
      if total < 0.0 {
        m.quality.push(QualityFlag::NegativeTotalTime);
      }
      m.total_time = Some(total);
      m.time_provenance = Provenance::Measured;
    }
    (Some(dep), None, Some(customer)) => {
      let delivery = hours(customer - dep);
      if delivery < 0.0 {
        m.quality.push(QualityFlag::NegativeDeliveryTime);
      }
      m.delivery_time = Some(delivery);
    }
    _ => {}
  }

  if m.total_time.is_none()
    && let Some(estimate) = &record.estimate
  {
    m.total_time = Some(estimate.total_time);
    m.time_provenance = Provenance::Estimated;
  }

  m.efficiency_score = match (m.total_distance, m.total_time) {
    (Some(distance), Some(time)) if time > 0.0 => Some(distance / time),
    _ => None,
  };

  if let Some(dep) = times.dj_departure_time {
    m.clockin_time = Some(dep - TimeDelta::minutes(CLOCKIN_LEAD_MINUTES));

    if let Some(end) = times.route_end() {
      let span = end - dep;
      if span < TimeDelta::zero() {
        m.quality.push(QualityFlag::NegativeRouteDuration);
      }
      m.actual_days_in_route = Some(round2(days(span)));
      m.total_hour_route = Some(round2(hours(span)));
    }
  }

  m.bud_days_in_route = times
    .planned_departure_time
    .zip(times.planned_arrival_time)
    .map(|(from, to)| round2(days(to - from)));

  m.days_in_route_deviation = m
    .actual_days_in_route
    .zip(m.bud_days_in_route)
    .map(|(actual, budget)| round2(actual - budget));

  m.total_working_hours = m
    .actual_days_in_route
    .map(|d| round2(d * WORKING_HOURS_PER_DAY));

  m.driver_rest_hours_in_route = m
    .total_hour_route
    .zip(m.total_working_hours)
    .map(|(route, working)| round2(route - working));

  record.current_status =
    derive_status(&record.times, record.service_time_at_customer, now);
  record.month_name = record.key.create_date.format("%B").to_string();
  record.derived = m;
  record
}
