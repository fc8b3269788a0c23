//! Field Extractor.
//!
//! Turns one raw CSV row into a typed [`Extraction`] for a declared
//! [`SourceKind`]. Column lookup tolerates header drift: each logical field
//! has an ordered alias list that is tried exactly, then case-insensitively.
//! Cells that fail to parse become `None`; only a missing load number makes
//! the row unusable.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

use crate::{
  Error, Result,
  journey::{
    Legs, NaturalKey, Timestamps, UNKNOWN, UNKNOWN_CUSTOMER, UNKNOWN_DRIVER,
    UNKNOWN_VEHICLE, is_placeholder,
  },
  source::SourceKind,
};

// ─── Raw rows ────────────────────────────────────────────────────────────────

/// One CSV row as ordered `(header, cell)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
  cells: Vec<(String, String)>,
}

fn blank(value: &str) -> bool {
  let value = value.trim();
  value.is_empty() || value.eq_ignore_ascii_case("nan")
}

impl RawRow {
  pub fn new(cells: Vec<(String, String)>) -> Self { Self { cells } }

  pub fn len(&self) -> usize { self.cells.len() }

  pub fn is_empty(&self) -> bool { self.cells.iter().all(|(_, v)| blank(v)) }

  pub fn headers(&self) -> impl Iterator<Item = &str> {
    self.cells.iter().map(|(h, _)| h.as_str())
  }

  /// First non-blank cell whose header matches one of `aliases`.
  ///
  /// All aliases are tried with an exact header match before any is tried
  /// case-insensitively, so an exact hit on a later alias beats a fuzzy hit
  /// on an earlier one.
  pub fn lookup(&self, aliases: &[&str]) -> Option<&str> {
    let exact = aliases.iter().find_map(|alias| {
      self
        .cells
        .iter()
        .find(|(h, v)| h.as_str() == *alias && !blank(v))
        .map(|(_, v)| v.trim())
    });
    exact.or_else(|| {
      aliases.iter().find_map(|alias| {
        let alias = alias.trim();
        self
          .cells
          .iter()
          .find(|(h, v)| h.trim().eq_ignore_ascii_case(alias) && !blank(v))
          .map(|(_, v)| v.trim())
      })
    })
  }
}

impl<H: Into<String>, V: Into<String>> FromIterator<(H, V)> for RawRow {
  fn from_iter<I: IntoIterator<Item = (H, V)>>(iter: I) -> Self {
    Self::new(iter.into_iter().map(|(h, v)| (h.into(), v.into())).collect())
  }
}

// ─── Cell parsing ────────────────────────────────────────────────────────────

/// Parse a numeric cell. Thousands separators are ignored; non-finite
/// values are rejected.
pub fn parse_number(raw: &str) -> Option<f64> {
  let cleaned: String =
    raw.trim().chars().filter(|c| *c != ',' && *c != ' ').collect();
  cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

const GENERIC_DATETIME_FORMATS: &[&str] = &[
  "%Y-%m-%d %H:%M:%S",
  "%Y-%m-%d %H:%M",
  "%Y-%m-%dT%H:%M:%S",
  "%Y-%m-%dT%H:%M",
  "%Y-%m-%d %H:%M:%S%.f",
  "%Y-%m-%dT%H:%M:%S%.f",
  "%d/%m/%Y %H:%M",
  "%d/%m/%Y %H:%M:%S",
  "%d-%m-%Y %H:%M",
  "%d-%m-%Y %H:%M:%S",
  "%Y/%m/%d %H:%M",
  "%Y/%m/%d %H:%M:%S",
  "%d/%m/%Y %I:%M %p",
];

const AWARE_DATETIME_FORMATS: &[&str] =
  &["%Y-%m-%d %H:%M:%S%z", "%Y-%m-%d %H:%M:%S %z", "%Y-%m-%d %H:%M%z"];

const DATE_FORMATS: &[&str] =
  &["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y", "%d %B %Y", "%d-%b-%Y"];

/// Parse a timestamp cell into naive UTC.
///
/// `native` formats are tried first. Offset-aware values are converted to
/// UTC. A bare date becomes midnight.
pub fn parse_datetime(raw: &str, native: &[&str]) -> Option<NaiveDateTime> {
  let raw = raw.trim();
  if raw.is_empty() {
    return None;
  }
  let naive = |formats: &[&str]| {
    formats
      .iter()
      .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
  };

  naive(native)
    .or_else(|| {
      DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.naive_utc())
    })
    .or_else(|| {
      AWARE_DATETIME_FORMATS
        .iter()
        .find_map(|f| DateTime::parse_from_str(raw, f).ok())
        .map(|dt| dt.naive_utc())
    })
    .or_else(|| naive(GENERIC_DATETIME_FORMATS))
    .or_else(|| parse_date(raw).map(|d| d.and_time(NaiveTime::MIN)))
}

/// Parse a calendar date, accepting a full timestamp and keeping its date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
  let raw = raw.trim();
  DATE_FORMATS
    .iter()
    .find_map(|f| NaiveDate::parse_from_str(raw, f).ok())
    .or_else(|| {
      GENERIC_DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
        .map(|dt| dt.date())
    })
    .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

// ─── Extraction output ───────────────────────────────────────────────────────

/// Ambient inputs to extraction that are not part of the row.
#[derive(Debug, Clone, Copy)]
pub struct ExtractContext {
  /// Used as the create date when a row carries none.
  pub today: NaiveDate,
}

/// Attribute values one row contributes. Descriptive strings are always
/// present (possibly as placeholders); everything else is `None` when the
/// kind does not carry it or the cell was unusable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JourneyPatch {
  pub transporter:              String,
  pub driver_name:              String,
  pub customer_name:            String,
  pub mode_of_capture:          String,
  pub times:                    Timestamps,
  pub legs:                     Legs,
  pub budgeted_kms:             Option<f64>,
  pub departure_deviation_min:  Option<f64>,
  pub service_time_at_customer: Option<i64>,
  pub tlp_vol_hl:               Option<f64>,
  pub comment_ave_tir:          Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
  pub kind:  SourceKind,
  pub key:   NaturalKey,
  pub patch: JourneyPatch,
}

// ─── Column vocabulary ───────────────────────────────────────────────────────

const DATE: &[&str] = &["Schedule Date", "schedule_date", "Date", "Create Date"];
const TRUCK: &[&str] = &["Vehicle Reg", "Truck Number", "Vehicle", "Truck"];
const DEPARTURE: &[&str] = &["DJ Departure Time", "Departure Time"];

struct Cells<'a> {
  row:  &'a RawRow,
  kind: SourceKind,
}

impl Cells<'_> {
  fn text(&self, aliases: &[&str]) -> Option<String> {
    self
      .row
      .lookup(aliases)
      .filter(|v| !is_placeholder(v))
      .map(str::to_owned)
  }

  fn text_or(&self, aliases: &[&str], default: &str) -> String {
    self.text(aliases).unwrap_or_else(|| default.to_owned())
  }

  fn number(&self, aliases: &[&str]) -> Option<f64> {
    self.row.lookup(aliases).and_then(parse_number)
  }

  fn minutes(&self, aliases: &[&str]) -> Option<i64> {
    self.number(aliases).map(|m| m.round() as i64)
  }

  fn datetime(&self, aliases: &[&str]) -> Option<NaiveDateTime> {
    self
      .row
      .lookup(aliases)
      .and_then(|v| parse_datetime(v, self.kind.native_datetime_formats()))
  }

  fn key(
    &self,
    load: &[&str],
    truck: Option<&[&str]>,
    ctx: &ExtractContext,
  ) -> Result<NaturalKey> {
    let load_number = self
      .text(load)
      .ok_or(Error::MissingLoadNumber { kind: self.kind })?;
    let truck_number = match truck {
      Some(aliases) => self.text_or(aliases, UNKNOWN_VEHICLE),
      None => UNKNOWN_VEHICLE.to_owned(),
    };
    let create_date = self
      .row
      .lookup(DATE)
      .and_then(parse_date)
      .unwrap_or(ctx.today);
    Ok(NaturalKey::new(load_number, create_date, truck_number))
  }
}

// ─── Per-kind routines ───────────────────────────────────────────────────────

impl SourceKind {
  /// Extract one row. Fails only when the row has no usable load number.
  pub fn extract(self, row: &RawRow, ctx: &ExtractContext) -> Result<Extraction> {
    let cells = Cells { row, kind: self };
    let (key, patch) = match self {
      Self::DepotDepartures => depot_departures(&cells, ctx)?,
      Self::CustomerTimestamps => customer_timestamps(&cells, ctx)?,
      Self::DistanceInfo => distance_info(&cells, ctx)?,
      Self::TimestampsDuration => timestamps_duration(&cells, ctx)?,
      Self::TimeRouteInfo => time_route_info(&cells, ctx)?,
      Self::Generic => generic(&cells, ctx)?,
    };
    Ok(Extraction { kind: self, key, patch })
  }
}

type Extracted = Result<(NaturalKey, JourneyPatch)>;

fn depot_departures(c: &Cells<'_>, ctx: &ExtractContext) -> Extracted {
  let key = c.key(
    &["Load Number", "Load Name", "Load", "Order No"],
    Some(TRUCK),
    ctx,
  )?;
  let patch = JourneyPatch {
    transporter: c.text_or(&["Depot", "Transporter"], UNKNOWN),
    driver_name: c.text_or(&["Driver Name", "DriverName", "Driver"], UNKNOWN_DRIVER),
    customer_name: UNKNOWN_CUSTOMER.to_owned(),
    mode_of_capture: "DJ".to_owned(),
    times: Timestamps {
      dj_departure_time: c.datetime(&["DJ Departure Time"]),
      planned_departure_time: c
        .datetime(&["Planned Departure Time", "PlannedDepartureTime"]),
      planned_arrival_time: c
        .datetime(&["Planned Arrival Time", "PlannedArrivalTime"]),
      ..Timestamps::default()
    },
    departure_deviation_min: c
      .number(&["Departure Time Difference (DJ vs Planned)"]),
    tlp_vol_hl: c.number(&["TLP Vol HL", "Tlp Vol Hl", "Volume"]),
    ..JourneyPatch::default()
  };
  Ok((key, patch))
}

fn customer_timestamps(c: &Cells<'_>, ctx: &ExtractContext) -> Extracted {
  let key = c.key(
    &["Load Number", "Load Name", "Load", "load_name"],
    Some(TRUCK),
    ctx,
  )?;
  // Gate-to-offloading style columns in this export are durations in
  // minutes; they never feed the distance legs.
  let patch = JourneyPatch {
    transporter: c.text_or(&["Depot", "Transporter"], UNKNOWN),
    driver_name: c.text_or(&["DriverName", "Driver Name", "Driver"], UNKNOWN_DRIVER),
    customer_name: c
      .text_or(&["customer_name", "Customer Name", "Customer"], UNKNOWN_CUSTOMER),
    mode_of_capture: "DJ".to_owned(),
    times: Timestamps {
      arrival_at_customer: c
        .datetime(&["ArrivedAtCustomer(Odo)", "Arrival At Customer"]),
      departure_time_from_customer: c.datetime(&[
        "DepartedFromCustomer(Odo)",
        "Departure Time From Customer",
      ]),
      ..Timestamps::default()
    },
    service_time_at_customer: c
      .minutes(&["Total Time Spent @ Customer", "Service Time At Customer"]),
    ..JourneyPatch::default()
  };
  Ok((key, patch))
}

fn distance_info(c: &Cells<'_>, ctx: &ExtractContext) -> Extracted {
  let key = c.key(&["Load Number", "Load Name", "Load"], Some(TRUCK), ctx)?;
  let patch = JourneyPatch {
    transporter: c.text_or(&["Depot", "Transporter"], UNKNOWN),
    driver_name: c.text_or(&["Driver Name", "DriverName", "Driver"], UNKNOWN_DRIVER),
    customer_name: c.text_or(&["Customer", "Customer Name"], UNKNOWN_CUSTOMER),
    mode_of_capture: "DJ".to_owned(),
    legs: Legs {
      d1: c.number(&["D1", "Depot To Customer Distance", "PlannedDistanceToCustomer"]),
      d2: c.number(&["D2", "Customer To Customer Distance"]),
      d3: c.number(&["D3", "Customer To Depot Distance"]),
      d4: c.number(&["D4", "Depot Yard Distance"]),
    },
    budgeted_kms: c.number(&["Planned Load Distance", "Budgeted Kms"]),
    ..JourneyPatch::default()
  };
  Ok((key, patch))
}

fn timestamps_duration(c: &Cells<'_>, ctx: &ExtractContext) -> Extracted {
  let key = c.key(
    &["load_name", "Load Name", "Load Number", "Load"],
    Some(TRUCK),
    ctx,
  )?;
  let patch = JourneyPatch {
    transporter: c.text_or(&["Depot", "Transporter"], UNKNOWN),
    driver_name: UNKNOWN_DRIVER.to_owned(),
    customer_name: UNKNOWN_CUSTOMER.to_owned(),
    mode_of_capture: "DJ".to_owned(),
    times: Timestamps {
      dj_departure_time: c.datetime(DEPARTURE),
      arrival_at_depot: c
        .datetime(&["ArriveAtDepot(Odo)", "Arrival At Depot", "Arrival Time"]),
      clock_out: c
        .datetime(&["LoadCompleted", "Load Completed Time", "Closure Time"]),
      ..Timestamps::default()
    },
    ..JourneyPatch::default()
  };
  Ok((key, patch))
}

fn time_route_info(c: &Cells<'_>, ctx: &ExtractContext) -> Extracted {
  let key = c.key(&["Load", "Load Number", "Load Name"], None, ctx)?;

  let in_route = c.row.lookup(&["Time in Route (min)"]);
  let planned = c.row.lookup(&["Planned Time in Route (min)"]);
  let comment = if in_route.is_some() || planned.is_some() {
    Some(format!(
      "Time in route: {} min, Planned: {} min",
      in_route.unwrap_or("0"),
      planned.unwrap_or("0"),
    ))
  } else {
    c.text(&["Route Comments", "Comments"])
  };

  let patch = JourneyPatch {
    transporter: c.text_or(&["Depot Code", "Depot"], UNKNOWN),
    driver_name: c.text_or(&["Driver", "Driver Name"], UNKNOWN_DRIVER),
    customer_name: c.text_or(&["Customer", "Customer Name"], UNKNOWN_CUSTOMER),
    mode_of_capture: "DJ".to_owned(),
    times: Timestamps {
      dj_departure_time: c.datetime(&["Route Start Time"]),
      arrival_at_depot: c.datetime(&["Route End Time"]),
      ..Timestamps::default()
    },
    comment_ave_tir: comment,
    ..JourneyPatch::default()
  };
  Ok((key, patch))
}

fn generic(c: &Cells<'_>, ctx: &ExtractContext) -> Extracted {
  let key = c.key(
    &["Load Number", "Load Name", "Load Name 1", "Load", "ID"],
    Some(TRUCK),
    ctx,
  )?;
  let patch = JourneyPatch {
    transporter: c.text_or(&["Transporter", "Depot", "Company"], UNKNOWN),
    driver_name: c.text_or(&["Driver Name", "Driver"], UNKNOWN_DRIVER),
    customer_name: c.text_or(&["Customer Name", "Customer"], UNKNOWN_CUSTOMER),
    mode_of_capture: c.text_or(&["Mode Of Capture"], UNKNOWN),
    times: Timestamps {
      dj_departure_time: c.datetime(DEPARTURE),
      arrival_at_depot: c.datetime(&["Arrival At Depot"]),
      ..Timestamps::default()
    },
    comment_ave_tir: c.text(&["Comments", "Notes"]),
    ..JourneyPatch::default()
  };
  Ok((key, patch))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ctx() -> ExtractContext {
    ExtractContext { today: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap() }
  }

  fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, day)
      .unwrap()
      .and_hms_opt(hour, minute, 0)
      .unwrap()
  }

  #[test]
  fn lookup_prefers_exact_then_case_insensitive() {
    let row: RawRow = [("load number ", "L9"), ("Load", "L1")]
      .into_iter()
      .collect();
    assert_eq!(row.lookup(&["Load Number", "Load"]), Some("L1"));
    assert_eq!(row.lookup(&["Load Number"]), Some("L9"));
    assert_eq!(row.lookup(&["Truck"]), None);
  }

  #[test]
  fn lookup_skips_blank_and_nan_cells() {
    let row: RawRow = [("Driver Name", "nan"), ("Driver", "  "), ("DriverName", "A")]
      .into_iter()
      .collect();
    assert_eq!(row.lookup(&["Driver Name", "Driver", "DriverName"]), Some("A"));
  }

  #[test]
  fn numbers_tolerate_separators_and_reject_garbage() {
    assert_eq!(parse_number("1,234.5"), Some(1234.5));
    assert_eq!(parse_number(" 42 "), Some(42.0));
    assert_eq!(parse_number("n/a"), None);
    assert_eq!(parse_number("inf"), None);
  }

  #[test]
  fn datetimes_fall_back_through_the_chain() {
    let native = SourceKind::CustomerTimestamps.native_datetime_formats();
    assert_eq!(parse_datetime("04/01/2025 08:00", native), Some(at(4, 8, 0)));
    assert_eq!(parse_datetime("2025-01-04T08:00:00", native), Some(at(4, 8, 0)));
    assert_eq!(parse_datetime("2025-01-04", native), Some(at(4, 0, 0)));
    assert_eq!(parse_datetime("yesterday", native), None);
  }

  #[test]
  fn aware_datetimes_are_converted_to_utc() {
    assert_eq!(
      parse_datetime("2025-01-04T10:00:00+02:00", &[]),
      Some(at(4, 8, 0))
    );
    assert_eq!(
      parse_datetime("2025-01-04 10:30:00+0200", &[]),
      Some(at(4, 8, 30))
    );
  }

  #[test]
  fn depot_departure_row() {
    let row: RawRow = [
      ("Load Number", "L100"),
      ("Vehicle Reg", "ABC123"),
      ("Schedule Date", "2025-01-04"),
      ("Depot", "North"),
      ("DJ Departure Time", "2025-01-04 08:00"),
      ("Driver Name", "J. Moyo"),
      ("TLP Vol HL", "1,200"),
    ]
    .into_iter()
    .collect();

    let ex = SourceKind::DepotDepartures.extract(&row, &ctx()).unwrap();
    assert_eq!(ex.key.load_number, "L100");
    assert_eq!(ex.key.truck_number, "ABC123");
    assert_eq!(ex.key.create_date, NaiveDate::from_ymd_opt(2025, 1, 4).unwrap());
    assert_eq!(ex.patch.times.dj_departure_time, Some(at(4, 8, 0)));
    assert_eq!(ex.patch.driver_name, "J. Moyo");
    assert_eq!(ex.patch.customer_name, UNKNOWN_CUSTOMER);
    assert_eq!(ex.patch.transporter, "North");
    assert_eq!(ex.patch.tlp_vol_hl, Some(1200.0));
    assert_eq!(ex.patch.times.arrival_at_customer, None);
  }

  #[test]
  fn missing_load_number_is_an_error() {
    let row: RawRow = [("Load Number", "Unknown"), ("Vehicle Reg", "X")]
      .into_iter()
      .collect();
    let err = SourceKind::DepotDepartures.extract(&row, &ctx()).unwrap_err();
    assert!(matches!(
      err,
      Error::MissingLoadNumber { kind: SourceKind::DepotDepartures }
    ));
  }

  #[test]
  fn create_date_defaults_to_today() {
    let row: RawRow = [("Load", "L1")].into_iter().collect();
    let ex = SourceKind::Generic.extract(&row, &ctx()).unwrap();
    assert_eq!(ex.key.create_date, ctx().today);
    assert_eq!(ex.key.truck_number, UNKNOWN_VEHICLE);
  }

  #[test]
  fn customer_row_keeps_durations_out_of_legs() {
    let row: RawRow = [
      ("load_name", "L1"),
      ("schedule_date", "04/01/2025"),
      ("customer_name", "ACME Ltd"),
      ("ArrivedAtCustomer(Odo)", "04/01/2025 10:00"),
      ("Total Time Spent @ Customer", "45"),
      ("Customer Gate To Offloading", "12"),
    ]
    .into_iter()
    .collect();

    let ex = SourceKind::CustomerTimestamps.extract(&row, &ctx()).unwrap();
    assert_eq!(ex.patch.customer_name, "ACME Ltd");
    assert_eq!(ex.patch.times.arrival_at_customer, Some(at(4, 10, 0)));
    assert_eq!(ex.patch.service_time_at_customer, Some(45));
    assert_eq!(ex.patch.legs, Legs::default());
  }

  #[test]
  fn distance_row_populates_legs_not_timestamps() {
    let row: RawRow = [
      ("Load Number", "L1"),
      ("Vehicle Reg", "ABC123"),
      ("D2", "145.3"),
      ("Planned Load Distance", "300"),
      ("ArrivedAtCustomer(Odo)", "2025-01-04 10:00"),
    ]
    .into_iter()
    .collect();

    let ex = SourceKind::DistanceInfo.extract(&row, &ctx()).unwrap();
    assert_eq!(ex.patch.legs.d2, Some(145.3));
    assert_eq!(ex.patch.budgeted_kms, Some(300.0));
    assert!(ex.patch.times.is_empty());
  }

  #[test]
  fn time_route_comment() {
    let row: RawRow = [
      ("Load", "L1"),
      ("Time in Route (min)", "320"),
      ("Planned Time in Route (min)", "300"),
      ("Route Start Time", "2025/01/04 08:00"),
    ]
    .into_iter()
    .collect();

    let ex = SourceKind::TimeRouteInfo.extract(&row, &ctx()).unwrap();
    assert_eq!(
      ex.patch.comment_ave_tir.as_deref(),
      Some("Time in route: 320 min, Planned: 300 min")
    );
    assert_eq!(ex.patch.times.dj_departure_time, Some(at(4, 8, 0)));
    assert_eq!(ex.key.truck_number, UNKNOWN_VEHICLE);
  }
}
