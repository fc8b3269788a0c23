//! Flattened spreadsheet projection of journey records.
//!
//! Vehicle identity is resolved at export time only: depot departure files
//! are authoritative for which truck ran a load, so their records seed a
//! [`VehicleMap`] that other records are matched against.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::{
  journey::{JourneyRecord, is_placeholder},
  metrics::round2,
  source::SourceKind,
};

const EXPORT_DATETIME: &str = "%Y-%m-%d %H:%M:%S";

fn norm(value: &str) -> Option<String> {
  (!is_placeholder(value)).then(|| value.trim().to_lowercase())
}

/// Truck lookup keyed by `(driver, load)`, `(driver, "")` and `("", load)`,
/// all lower-cased.
#[derive(Debug, Clone, Default)]
pub struct VehicleMap {
  trucks: HashMap<(String, String), String>,
}

impl VehicleMap {
  /// Build from every record a depot departure file contributed to.
  pub fn from_records<'a>(records: impl IntoIterator<Item = &'a JourneyRecord>) -> Self {
    let mut trucks = HashMap::new();
    for rec in records {
      if !rec.sources.contains(&SourceKind::DepotDepartures)
        || is_placeholder(rec.truck_number())
      {
        continue;
      }
      let truck = rec.truck_number().trim().to_owned();
      let driver = norm(&rec.driver_name);
      let load = norm(rec.load_number());

      if let (Some(d), Some(l)) = (&driver, &load) {
        trucks.insert((d.clone(), l.clone()), truck.clone());
      }
      if let Some(d) = driver {
        trucks.insert((d, String::new()), truck.clone());
      }
      if let Some(l) = load {
        trucks.insert((String::new(), l), truck);
      }
    }
    Self { trucks }
  }

  /// Resolve the truck for `rec`: full match, then driver only, then load
  /// only, then the record's own non-placeholder truck number.
  pub fn resolve(&self, rec: &JourneyRecord) -> Option<String> {
    let driver = norm(&rec.driver_name);
    let load = norm(rec.load_number());
    let get = |d: Option<&String>, l: Option<&String>| {
      let key = (
        d.cloned().unwrap_or_default(),
        l.cloned().unwrap_or_default(),
      );
      self.trucks.get(&key).cloned()
    };

    driver
      .as_ref()
      .zip(load.as_ref())
      .and_then(|(d, l)| get(Some(d), Some(l)))
      .or_else(|| driver.as_ref().and_then(|d| get(Some(d), None)))
      .or_else(|| load.as_ref().and_then(|l| get(None, Some(l))))
      .or_else(|| {
        (!is_placeholder(rec.truck_number())).then(|| rec.truck_number().to_owned())
      })
  }
}

/// One spreadsheet row. Field order is column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
  #[serde(rename = "Create Date")]
  pub create_date:                String,
  #[serde(rename = "Month Name")]
  pub month_name:                 String,
  #[serde(rename = "Transporter")]
  pub transporter:                String,
  #[serde(rename = "Load Number")]
  pub load_number:                String,
  #[serde(rename = "Mode Of Capture")]
  pub mode_of_capture:            String,
  #[serde(rename = "Driver Name")]
  pub driver_name:                String,
  #[serde(rename = "Vehicle Reg")]
  pub vehicle_reg:                Option<String>,
  #[serde(rename = "Customer Name")]
  pub customer_name:              String,
  #[serde(rename = "Vol Hl")]
  pub vol_hl:                     Option<f64>,
  #[serde(rename = "Budgeted Kms")]
  pub budgeted_kms:               Option<f64>,
  #[serde(rename = "Actual Km")]
  pub actual_km:                  Option<f64>,
  #[serde(rename = "Km Deviation")]
  pub km_deviation:               Option<f64>,
  #[serde(rename = "Clockin Time")]
  pub clockin_time:               Option<String>,
  #[serde(rename = "Planned Departure Time")]
  pub planned_departure_time:     Option<String>,
  #[serde(rename = "DJ Departure Time")]
  pub dj_departure_time:          Option<String>,
  #[serde(rename = "Departure Deviation Min")]
  pub departure_deviation_min:    Option<f64>,
  #[serde(rename = "Arrival At Customer")]
  pub arrival_at_customer:        Option<String>,
  #[serde(rename = "Departure Time From Customer")]
  pub departure_from_customer:    Option<String>,
  #[serde(rename = "Service Time At Customer")]
  pub service_time_at_customer:   Option<i64>,
  #[serde(rename = "Arrival At Depot")]
  pub arrival_at_depot:           Option<String>,
  #[serde(rename = "Clock Out")]
  pub clock_out:                  Option<String>,
  #[serde(rename = "Actual Days In Route")]
  pub actual_days_in_route:       Option<f64>,
  #[serde(rename = "Bud Days In Route")]
  pub bud_days_in_route:          Option<f64>,
  #[serde(rename = "Days In Route Deviation")]
  pub days_in_route_deviation:    Option<f64>,
  #[serde(rename = "Total Hour Route")]
  pub total_hour_route:           Option<f64>,
  #[serde(rename = "Driver Rest Hours In Route")]
  pub driver_rest_hours_in_route: Option<f64>,
  #[serde(rename = "Total WH")]
  pub total_working_hours:        Option<f64>,
  #[serde(rename = "D1")]
  pub d1:                         Option<f64>,
  #[serde(rename = "D2")]
  pub d2:                         Option<f64>,
  #[serde(rename = "D3")]
  pub d3:                         Option<f64>,
  #[serde(rename = "D4")]
  pub d4:                         Option<f64>,
  #[serde(rename = "Total Time")]
  pub total_time:                 Option<f64>,
  #[serde(rename = "Delivery Time")]
  pub delivery_time:              Option<f64>,
  #[serde(rename = "Efficiency Score")]
  pub efficiency_score:           Option<f64>,
  #[serde(rename = "Time Provenance")]
  pub time_provenance:            String,
  #[serde(rename = "Status")]
  pub status:                     String,
  #[serde(rename = "Comment Ave TIR")]
  pub comment_ave_tir:            Option<String>,
}

fn stamp(dt: Option<NaiveDateTime>) -> Option<String> {
  dt.map(|dt| dt.format(EXPORT_DATETIME).to_string())
}

impl ExportRow {
  pub fn project(rec: &JourneyRecord, vehicles: &VehicleMap) -> Self {
    let t = &rec.times;
    let m = &rec.derived;
    Self {
      create_date:                rec.key.create_date.format("%Y-%m-%d").to_string(),
      month_name:                 rec.month_name.clone(),
      transporter:                rec.transporter.clone(),
      load_number:                rec.key.load_number.clone(),
      mode_of_capture:            rec.mode_of_capture.clone(),
      driver_name:                rec.driver_name.clone(),
      vehicle_reg:                vehicles.resolve(rec),
      customer_name:              rec.customer_name.clone(),
      vol_hl:                     rec.tlp_vol_hl,
      budgeted_kms:               rec.budgeted_kms,
      actual_km:                  m.total_distance.map(round2),
      km_deviation:               m.km_deviation.map(round2),
      clockin_time:               stamp(m.clockin_time),
      planned_departure_time:     stamp(t.planned_departure_time),
      dj_departure_time:          stamp(t.dj_departure_time),
      departure_deviation_min:    rec.departure_deviation_min,
      arrival_at_customer:        stamp(t.arrival_at_customer),
      departure_from_customer:    stamp(t.departure_time_from_customer),
      service_time_at_customer:   rec.service_time_at_customer,
      arrival_at_depot:           stamp(t.arrival_at_depot),
      clock_out:                  stamp(t.clock_out),
      actual_days_in_route:       m.actual_days_in_route,
      bud_days_in_route:          m.bud_days_in_route,
      days_in_route_deviation:    m.days_in_route_deviation,
      total_hour_route:           m.total_hour_route,
      driver_rest_hours_in_route: m.driver_rest_hours_in_route,
      total_working_hours:        m.total_working_hours,
      d1:                         rec.legs.d1,
      d2:                         rec.legs.d2,
      d3:                         rec.legs.d3,
      d4:                         rec.legs.d4,
      total_time:                 m.total_time.map(round2),
      delivery_time:              m.delivery_time.map(round2),
      efficiency_score:           m.efficiency_score.map(round2),
      time_provenance:            m.time_provenance.to_string(),
      status:                     rec.current_status.to_string(),
      comment_ave_tir:            rec.comment_ave_tir.clone(),
    }
  }
}

/// Project `records` in order, resolving vehicles across the whole set.
pub fn export_rows(records: &[JourneyRecord]) -> Vec<ExportRow> {
  let vehicles = VehicleMap::from_records(records);
  records
    .iter()
    .map(|rec| ExportRow::project(rec, &vehicles))
    .collect()
}
