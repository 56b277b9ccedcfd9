//! Thin, lenient getters over `serde_json` values.
//!
//! Used where a caller hands us JSON whose shape we do not control (FFI
//! configuration strings, snapshot files written by older versions): absent
//! or wrongly-typed fields read as `None` instead of failing the whole parse.

use anyhow::{bail, Context, Result};
use serde_json::Value;

/// Parse `input` and require the top level to be a JSON object.
pub fn parse_object(input: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(input).context("Failed to parse JSON")?;
    if !value.is_object() {
        bail!("Expected a JSON object at the top level");
    }
    Ok(value)
}

pub fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

pub fn u64_field(value: &Value, key: &str) -> Option<u64> {
    value.get(key).and_then(Value::as_u64)
}

pub fn bool_field(value: &Value, key: &str) -> Option<bool> {
    value.get(key).and_then(Value::as_bool)
}

pub fn object_field<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value.get(key).filter(|v| v.is_object())
}
