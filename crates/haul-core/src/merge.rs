//! Merge Policy.
//!
//! Reconciles a stored record with one freshly extracted row:
//!
//! - placeholders and empty cells never overwrite real data;
//! - real data always overwrites placeholders and nulls;
//! - real-vs-real disagreements resolve as last write wins and are
//!   reported as [`FieldConflict`]s, since there is no precedence order
//!   across source kinds;
//! - distance legs are only filled when the stored leg is null or zero.

use std::fmt::Debug;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  extract::Extraction,
  journey::{JourneyRecord, is_placeholder},
};

/// A real-vs-real disagreement resolved in favour of the incoming value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldConflict {
  pub field:    String,
  pub previous: String,
  pub incoming: String,
}

#[derive(Debug, Clone)]
pub struct Reconciled {
  pub record:    JourneyRecord,
  /// True when no stored record existed.
  pub created:   bool,
  pub conflicts: Vec<FieldConflict>,
}

struct Merger {
  conflicts: Vec<FieldConflict>,
}

impl Merger {
  fn conflict(&mut self, field: &str, previous: String, incoming: String) {
    self.conflicts.push(FieldConflict {
      field: field.to_owned(),
      previous,
      incoming,
    });
  }

  fn text(&mut self, field: &str, stored: &mut String, incoming: &str) {
    if is_placeholder(incoming) {
      if is_placeholder(stored) && !incoming.trim().is_empty() {
        *stored = incoming.to_owned();
      }
      return;
    }
    if !is_placeholder(stored) && stored.as_str() != incoming {
      self.conflict(field, stored.clone(), incoming.to_owned());
    }
    *stored = incoming.to_owned();
  }

  fn value<T: PartialEq + Debug>(
    &mut self,
    field: &str,
    stored: &mut Option<T>,
    incoming: Option<T>,
  ) {
    let Some(incoming) = incoming else { return };
    if let Some(previous) = stored.as_ref()
      && *previous != incoming
    {
      self.conflict(field, format!("{previous:?}"), format!("{incoming:?}"));
    }
    *stored = Some(incoming);
  }

  fn note(&mut self, field: &str, stored: &mut Option<String>, incoming: Option<&str>) {
    let incoming = incoming.filter(|v| !is_placeholder(v));
    self.value(field, stored, incoming.map(str::to_owned));
  }
}

/// Fill a leg only when nothing non-zero has been measured for it yet.
fn leg(stored: &mut Option<f64>, incoming: Option<f64>) {
  if stored.is_none_or(|d| d == 0.0) && incoming.is_some() {
    *stored = incoming;
  }
}

/// Merge `incoming` into `existing`, creating a record when there is none.
///
/// Derived fields are left stale; the caller runs
/// [`crate::metrics::derive`] before persisting.
pub fn reconcile(
  existing: Option<JourneyRecord>,
  incoming: &Extraction,
  now: DateTime<Utc>,
) -> Reconciled {
  let created = existing.is_none();
  let mut record = existing
    .unwrap_or_else(|| JourneyRecord::new(incoming.key.clone(), now));
  let mut m = Merger { conflicts: Vec::new() };
  let p = &incoming.patch;

  m.text("transporter", &mut record.transporter, &p.transporter);
  m.text("driver_name", &mut record.driver_name, &p.driver_name);
  m.text("customer_name", &mut record.customer_name, &p.customer_name);
  m.text("mode_of_capture", &mut record.mode_of_capture, &p.mode_of_capture);

  let (t, i) = (&mut record.times, &p.times);
  m.value("dj_departure_time", &mut t.dj_departure_time, i.dj_departure_time);
  m.value("arrival_at_customer", &mut t.arrival_at_customer, i.arrival_at_customer);
  m.value(
    "departure_time_from_customer",
    &mut t.departure_time_from_customer,
    i.departure_time_from_customer,
  );
  m.value("arrival_at_depot", &mut t.arrival_at_depot, i.arrival_at_depot);
  m.value("clock_out", &mut t.clock_out, i.clock_out);
  m.value(
    "planned_departure_time",
    &mut t.planned_departure_time,
    i.planned_departure_time,
  );
  m.value(
    "planned_arrival_time",
    &mut t.planned_arrival_time,
    i.planned_arrival_time,
  );

  leg(&mut record.legs.d1, p.legs.d1);
  leg(&mut record.legs.d2, p.legs.d2);
  leg(&mut record.legs.d3, p.legs.d3);
  leg(&mut record.legs.d4, p.legs.d4);

  m.value("budgeted_kms", &mut record.budgeted_kms, p.budgeted_kms);
  m.value(
    "departure_deviation_min",
    &mut record.departure_deviation_min,
    p.departure_deviation_min,
  );
  m.value(
    "service_time_at_customer",
    &mut record.service_time_at_customer,
    p.service_time_at_customer,
  );
  m.value("tlp_vol_hl", &mut record.tlp_vol_hl, p.tlp_vol_hl);
  m.note(
    "comment_ave_tir",
    &mut record.comment_ave_tir,
    p.comment_ave_tir.as_deref(),
  );

  record.sources.insert(incoming.kind);
  record.updated_at = now;

  Reconciled { record, created, conflicts: m.conflicts }
}
