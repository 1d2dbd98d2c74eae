//! Conversions between domain values and the text stored in SQLite columns.
//!
//! Values are stored as compact JSON; timestamps as RFC 3339 strings.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::{Error, Result};

pub fn encode_value(value: &Value) -> String { value.to_string() }

pub fn decode_value(key: &str, raw: &str) -> Result<Value> {
  serde_json::from_str(raw).map_err(|source| Error::Json {
    key: key.to_owned(),
    source,
  })
}

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }
