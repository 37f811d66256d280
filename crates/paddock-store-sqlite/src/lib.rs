//! SQLite backend for the Paddock telemetry store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every write runs inside a single
//! `call`, and multi-statement writes inside a transaction, so each one
//! commits atomically.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{KeyGenerator, MAX_KEY_ATTEMPTS, SqliteStore};

#[cfg(test)]
mod tests;
