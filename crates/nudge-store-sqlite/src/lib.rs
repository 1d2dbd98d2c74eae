//! Durable [`nudge_core::store::KeyValueStore`] over a single SQLite table.
//!
//! Values are stored as JSON text. Every query is dispatched through
//! [`tokio_rusqlite`] onto its background connection thread.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
