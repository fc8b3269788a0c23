//! SQLite backend for the haul journey store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Each uploaded file is applied in one
//! `IMMEDIATE` transaction; each row gets its own savepoint so a failing row
//! rolls back alone.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
