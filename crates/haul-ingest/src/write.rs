//! CSV encoding of the export projection.

use std::io;

use haul_core::{export::export_rows, journey::JourneyRecord};

use crate::Result;

/// Write `records` as CSV, one [`ExportRow`](haul_core::export::ExportRow)
/// per record. Nothing is written for an empty slice.
pub fn write_export<W: io::Write>(records: &[JourneyRecord], out: W) -> Result<()> {
  let mut writer = csv::Writer::from_writer(out);
  for row in export_rows(records) {
    writer.serialize(row)?;
  }
  writer.flush()?;
  Ok(())
}

pub fn export_csv(records: &[JourneyRecord]) -> Result<Vec<u8>> {
  let mut buf = Vec::new();
  write_export(records, &mut buf)?;
  Ok(buf)
}
