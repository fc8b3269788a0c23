//! `haul`, the offline operator CLI for the haul journey store.
//!
//! # Usage
//!
//! ```
//! haul --store ./haul.db ingest depot_departures=depot.csv distance_info=km.csv
//! haul list --status at_customer
//! haul export --out journeys.csv
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use haul_core::{source::SourceKind, status::JourneyStatus};
use haul_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "haul", version, about = "Fleet journey analytics from CSV exports")]
struct Args {
  /// Path to the SQLite journey store.
  #[arg(long, env = "HAUL_STORE", default_value = "haul.db", value_name = "FILE")]
  store: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Ingest CSV files, each given as KIND=PATH.
  Ingest {
    #[arg(required = true, value_name = "KIND=PATH", value_parser = parse_input)]
    files: Vec<(SourceKind, PathBuf)>,
  },
  /// Write every journey as CSV.
  Export {
    /// Output file; stdout when omitted.
    #[arg(short, long, value_name = "FILE")]
    out: Option<PathBuf>,
  },
  /// List journeys.
  List {
    #[arg(long)]
    status: Option<JourneyStatus>,
    /// Free text over load, driver, customer and truck.
    #[arg(long)]
    text:   Option<String>,
    #[arg(long, default_value_t = 50)]
    limit:  usize,
  },
  /// Show the upload history.
  Uploads,
  /// Run the timing estimation pass.
  Estimate,
  /// Re-derive every record as of now.
  Refresh,
  /// Print fleet summary statistics.
  Summary,
  /// Delete every journey and upload record.
  Clear {
    /// Confirm the deletion.
    #[arg(long)]
    yes: bool,
  },
}

fn parse_input(raw: &str) -> Result<(SourceKind, PathBuf), String> {
  let (kind, path) = raw
    .split_once('=')
    .ok_or_else(|| format!("expected KIND=PATH, got `{raw}`"))?;
  let kind = kind
    .trim()
    .parse::<SourceKind>()
    .map_err(|_| format!("unknown source kind `{kind}`"))?;
  Ok((kind, PathBuf::from(path)))
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();
  let store = SqliteStore::open(&args.store)
    .await
    .with_context(|| format!("opening store {}", args.store.display()))?;

  match args.command {
    Command::Ingest { files } => commands::ingest(&store, files).await,
    Command::Export { out } => commands::export(&store, out.as_deref()).await,
    Command::List { status, text, limit } => {
      commands::list(&store, status, text, limit).await
    }
    Command::Uploads => commands::uploads(&store).await,
    Command::Estimate => commands::estimate(&store).await,
    Command::Refresh => commands::refresh(&store).await,
    Command::Summary => commands::summary(&store).await,
    Command::Clear { yes } => commands::clear(&store, yes).await,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_kind_and_path() {
    let (kind, path) = parse_input("distance_info=./km.csv").unwrap();
    assert_eq!(kind, SourceKind::DistanceInfo);
    assert_eq!(path, PathBuf::from("./km.csv"));
  }

  #[test]
  fn rejects_malformed_inputs() {
    assert!(parse_input("depot.csv").is_err());
    assert!(parse_input("spreadsheet=depot.csv").is_err());
  }

  #[test]
  fn clap_definition_is_valid() {
    use clap::CommandFactory as _;
    Args::command().debug_assert();
  }

  #[test]
  fn list_accepts_status() {
    let args =
      Args::try_parse_from(["haul", "--store", "x.db", "list", "--status", "at_customer"])
        .unwrap();
    match args.command {
      Command::List { status, .. } => assert_eq!(status, Some(JourneyStatus::AtCustomer)),
      other => panic!("unexpected command {other:?}"),
    }
  }
}
