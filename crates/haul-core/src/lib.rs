//! Core types and reconciliation logic for the haul journey store.
//!
//! This crate has no HTTP, CSV and database dependencies.
//! It turns loosely-shaped spreadsheet rows into canonical journey records,
//! merges partial records that describe the same trip, and derives the timing
//! and efficiency figures the reports are built from.

pub mod error;
pub mod estimate;
pub mod export;
pub mod extract;
pub mod journey;
pub mod merge;
pub mod metrics;
pub mod report;
pub mod source;
pub mod status;
pub mod store;

pub use error::{Error, Result};
