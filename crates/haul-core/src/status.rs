//! Journey lifecycle status, derived from the timestamp set at save time.
//!
//! Status is never set by callers. [`derive_status`] is a pure function of
//! the record's timestamps and an explicitly supplied clock.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::journey::Timestamps;

/// Where a journey is in its depot → customer → depot cycle.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
  EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JourneyStatus {
  #[default]
  Pending,
  /// Retained for stored data and display; [`derive_status`] reports a
  /// departed truck as [`JourneyStatus::InTransit`].
  Departed,
  InTransit,
  AtCustomer,
  Servicing,
  Returning,
  Completed,
  Delayed,
}

impl JourneyStatus {
  pub fn label(self) -> &'static str {
    match self {
      Self::Pending => "Pending Departure",
      Self::Departed => "Departed from Depot",
      Self::InTransit => "In Transit to Customer",
      Self::AtCustomer => "At Customer Location",
      Self::Servicing => "Servicing Customer",
      Self::Returning => "Returning to Depot",
      Self::Completed => "Journey Completed",
      Self::Delayed => "Delayed",
    }
  }

  /// Rough completion percentage for progress bars.
  pub fn progress_percentage(self) -> u8 {
    match self {
      Self::Pending => 0,
      Self::Departed => 20,
      Self::InTransit => 40,
      Self::AtCustomer => 60,
      Self::Servicing => 70,
      Self::Returning => 85,
      Self::Completed => 100,
      Self::Delayed => 50,
    }
  }

  pub fn is_active(self) -> bool { !matches!(self, Self::Completed) }
}

/// Derive the lifecycle status. First matching rule wins:
///
/// 1. no departure → pending
/// 2. depot arrival → completed
/// 3. departure later than `now` → delayed
/// 4. left the customer → returning
/// 5. at the customer → servicing if service time was logged, else
///    at_customer
/// 6. otherwise → in_transit
pub fn derive_status(
  times: &Timestamps,
  service_time_at_customer: Option<i64>,
  now: NaiveDateTime,
) -> JourneyStatus {
  let Some(departure) = times.dj_departure_time else {
    return JourneyStatus::Pending;
  };
  if times.arrival_at_depot.is_some() {
    return JourneyStatus::Completed;
  }
  if departure > now {
    return JourneyStatus::Delayed;
  }
  if times.departure_time_from_customer.is_some() {
    return JourneyStatus::Returning;
  }
  match times.arrival_at_customer {
    Some(_) if service_time_at_customer.is_some_and(|m| m > 0) => {
      JourneyStatus::Servicing
    }
    Some(_) => JourneyStatus::AtCustomer,
    None => JourneyStatus::InTransit,
  }
}
