//! Subcommand implementations. Each one runs against an open store and
//! prints to stdout; logging goes to stderr.

use std::{
  io::{self, Write as _},
  path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use haul_core::{
  report::Summary,
  source::SourceKind,
  status::JourneyStatus,
  store::{JourneyQuery, JourneyStore},
};
use haul_ingest::{UploadFile, maintenance, write::write_export};
use haul_store_sqlite::SqliteStore;

pub async fn ingest(store: &SqliteStore, inputs: Vec<(SourceKind, PathBuf)>) -> Result<()> {
  let mut files = Vec::with_capacity(inputs.len());
  for (kind, path) in inputs {
    let bytes =
      std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
    let name = path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_else(|| path.display().to_string());
    files.push(UploadFile { name, kind, bytes });
  }

  let batch = haul_ingest::ingest_batch(store, files, Utc::now()).await;

  for report in &batch.files {
    let u = &report.upload;
    match &u.error {
      Some(error) => println!("{:<32} {:<20} unreadable: {error}", u.name, u.kind.as_ref()),
      None => println!(
        "{:<32} {:<20} created {:>5}  updated {:>5}  skipped {:>4}  conflicts {:>4}{}",
        u.name,
        u.kind.as_ref(),
        u.created,
        u.updated,
        u.skipped,
        u.conflicts,
        if report.duplicate { "  (duplicate)" } else { "" },
      ),
    }
  }
  for e in &batch.errors {
    println!("{:<32} {:<20} failed: {}", e.name, e.kind.as_ref(), e.message);
  }

  if batch.failed > 0 {
    bail!("{} of {} files failed", batch.failed, batch.failed + batch.succeeded);
  }
  Ok(())
}

pub async fn export(store: &SqliteStore, out: Option<&Path>) -> Result<()> {
  let records = store.search(JourneyQuery::default()).await?;
  match out {
    Some(path) => {
      let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
      write_export(&records, file)?;
      eprintln!("wrote {} journeys to {}", records.len(), path.display());
    }
    None => write_export(&records, io::stdout().lock())?,
  }
  Ok(())
}

pub async fn list(
  store: &SqliteStore,
  status: Option<JourneyStatus>,
  text: Option<String>,
  limit: usize,
) -> Result<()> {
  let records = store
    .search(JourneyQuery { status, text, limit: Some(limit), ..Default::default() })
    .await?;

  let mut out = io::stdout().lock();
  writeln!(
    out,
    "{:<12} {:<10} {:<12} {:<20} {:<24} {:>9} {:>9}",
    "DATE", "LOAD", "TRUCK", "DRIVER", "STATUS", "KM", "KM/H"
  )?;
  for r in &records {
    writeln!(
      out,
      "{:<12} {:<10} {:<12} {:<20} {:<24} {:>9} {:>9}",
      r.key.create_date.to_string(),
      r.key.load_number,
      r.key.truck_number,
      r.driver_name,
      r.current_status.label(),
      fmt_opt(r.derived.total_distance),
      fmt_opt(r.derived.efficiency_score),
    )?;
  }
  Ok(())
}

fn fmt_opt(v: Option<f64>) -> String { v.map(|v| format!("{v:.2}")).unwrap_or_else(|| "-".into()) }

pub async fn uploads(store: &SqliteStore) -> Result<()> {
  for u in store.list_uploads().await? {
    println!(
      "{}  {:<32} {:<34} {}",
      u.uploaded_at.format("%Y-%m-%d %H:%M"),
      u.name,
      u.kind.label(),
      if u.processed { "processed" } else { "failed" },
    );
  }
  Ok(())
}

pub async fn estimate(store: &SqliteStore) -> Result<()> {
  let report = maintenance::apply_estimates(store, Utc::now()).await?;
  println!(
    "examined {}, estimated {}, cleared {}",
    report.examined, report.estimated, report.cleared
  );

  let implausible = maintenance::implausible(store).await?;
  if !implausible.is_empty() {
    println!("{} journeys have an implausible efficiency score:", implausible.len());
    for r in implausible {
      println!("  {}  {}", r.key, fmt_opt(r.derived.efficiency_score));
    }
  }
  Ok(())
}

pub async fn refresh(store: &SqliteStore) -> Result<()> {
  let changed = store.refresh_all(Utc::now()).await?;
  println!("{changed} journeys changed");
  Ok(())
}

pub async fn summary(store: &SqliteStore) -> Result<()> {
  let records = store.search(JourneyQuery::default()).await?;
  let summary = Summary::from_records(&records);
  println!("{}", serde_json::to_string_pretty(&summary)?);
  Ok(())
}

pub async fn clear(store: &SqliteStore, yes: bool) -> Result<()> {
  if !yes {
    bail!("refusing to clear the store without --yes");
  }
  let cleared = store.clear().await?;
  println!("removed {} journeys and {} uploads", cleared.journeys, cleared.uploads);
  Ok(())
}
