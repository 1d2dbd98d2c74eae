//! Core types and the notification eligibility engine for Nudge.
//!
//! This crate decides whether a promotional notification should be shown,
//! which localized variant to render, and records that it has been seen.
//! Persistence goes through the [`store::KeyValueStore`] trait, implemented
//! by `nudge-store-sqlite` and by the in-memory [`memory::MemoryStore`].

// `KeyValueStore` spells out `Send` futures in its signatures; implementors
// write plain `async fn`.
#![allow(async_fn_in_trait)]

pub mod campaign;
pub mod clock;
pub mod config;
pub mod error;
pub mod host;
pub mod i18n;
pub mod locale;
pub mod memory;
pub mod notifier;
pub mod prefs;
pub mod registry;
pub mod scheduler;
pub mod store;
pub mod topics;
pub mod viewed;

pub use error::{Error, Result};
pub use notifier::Notifier;
