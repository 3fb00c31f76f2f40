//! Argument extraction helpers shared by the tools.
//!
//! The registry has already checked types and required fields, so these only
//! fail if a tool's descriptor and its handler disagree.

use serde_json::{Map, Value};

use crate::error::{AdapterError, Result};

/// Extract a required boolean field.
pub(crate) fn require_bool(args: &Map<String, Value>, field: &str, tool_name: &str) -> Result<bool> {
    args.get(field)
        .and_then(Value::as_bool)
        .ok_or_else(|| AdapterError::InvalidParams {
            tool_name: tool_name.to_string(),
            reason: format!("missing required boolean field `{field}`"),
        })
}

/// Extract an optional, non-blank string field.
pub(crate) fn optional_str<'a>(args: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
    args.get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
