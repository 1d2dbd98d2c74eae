//! Error types for `nudge-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("campaign {id:?} is invalid: {reason}")]
  InvalidCampaign { id: String, reason: String },

  #[error("campaign {id:?} has an unparseable date {value:?}")]
  InvalidDate { id: String, value: String },

  #[error("campaign {0:?} is declared more than once")]
  DuplicateCampaign(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
