//! Source kinds: the recognised categories of uploaded CSV export.
//!
//! Each kind has its own column vocabulary and sees only part of a journey.
//! The kind is declared by the uploader; it is never sniffed from the file.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// One of the six recognised CSV file categories.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
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
pub enum SourceKind {
  /// Depot departure log; authoritative for vehicle identity.
  DepotDepartures,
  /// Customer arrival/departure timestamps and service time.
  CustomerTimestamps,
  /// Planned and measured leg distances.
  DistanceInfo,
  /// Depot arrival and load completion timestamps.
  TimestampsDuration,
  /// Route start/end times and time-in-route summaries.
  TimeRouteInfo,
  /// Anything else; best-effort identity columns only.
  #[serde(alias = "other")]
  #[strum(to_string = "generic", serialize = "other")]
  Generic,
}

impl SourceKind {
  /// Human-readable label used in upload listings.
  pub fn label(self) -> &'static str {
    match self {
      Self::DepotDepartures => "1. Depot Departures Information",
      Self::CustomerTimestamps => "2. Customer Timestamps",
      Self::DistanceInfo => "3. Distance Information",
      Self::TimestampsDuration => "4. Timestamps and Duration",
      Self::TimeRouteInfo => "6. Time in Route Information",
      Self::Generic => "Other CSV File",
    }
  }

  /// Datetime layouts the exporting system writes for this kind. Tried before
  /// the generic fallback chain in [`crate::extract`].
  pub fn native_datetime_formats(self) -> &'static [&'static str] {
    match self {
      Self::DepotDepartures | Self::DistanceInfo => {
        &["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
      }
      Self::CustomerTimestamps | Self::TimestampsDuration => {
        &["%d/%m/%Y %H:%M", "%d/%m/%Y %H:%M:%S"]
      }
      Self::TimeRouteInfo => &["%Y/%m/%d %H:%M", "%Y/%m/%d %H:%M:%S"],
      Self::Generic => &[],
    }
  }
}
