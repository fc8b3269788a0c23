//! CSV decoding into [`RawRow`]s.

use csv::{ReaderBuilder, Trim};
use haul_core::extract::RawRow;

use crate::{Error, Result};

const BOM: &[u8] = b"\xEF\xBB\xBF";

/// Decode a whole CSV file. Headers are trimmed; short rows are padded with
/// empty cells. Any undecodable record fails the whole file.
pub fn read_rows(bytes: &[u8]) -> Result<Vec<RawRow>> {
  let bytes = bytes.strip_prefix(BOM).unwrap_or(bytes);

  // `flexible` tolerates spreadsheet exports whose trailing empty cells
  // were dropped on some lines.
  let mut reader = ReaderBuilder::new()
    .flexible(true)
    .trim(Trim::Headers)
    .from_reader(bytes);

  let headers: Vec<String> = reader.headers()?.iter().map(str::to_owned).collect();
  if headers.iter().all(|h| h.is_empty()) {
    return Err(Error::MissingHeader);
  }

  let mut rows = Vec::new();
  for record in reader.records() {
    let record = record?;
    let cells = headers
      .iter()
      .enumerate()
      .map(|(i, h)| (h.clone(), record.get(i).unwrap_or_default().to_owned()))
      .collect();
    rows.push(RawRow::new(cells));
  }
  Ok(rows)
}
