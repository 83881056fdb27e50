//! Response envelope returned by every DolphinScheduler REST endpoint

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field names under which different scheduler versions expose a record list
pub const RECORD_LIST_FIELDS: [&str; 5] =
    ["totalList", "records", "processInstanceList", "list", "items"];

/// `{ code, msg, success?, data }`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub code: Option<Value>,

    #[serde(default)]
    pub msg: Option<String>,

    #[serde(default)]
    pub success: Option<bool>,

    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    /// Numeric code, if one was sent
    pub fn code(&self) -> Option<i64> {
        self.code.as_ref().and_then(lenient_i64)
    }

    /// Successful only if `success` is not explicitly false and `code` is absent or zero.
    pub fn is_success(&self) -> bool {
        if self.success == Some(false) {
            return false;
        }
        match &self.code {
            None | Some(Value::Null) => true,
            Some(code) => lenient_i64(code) == Some(0),
        }
    }

    /// Unwrap the `data` payload, or describe the failure
    pub fn into_data(self) -> Result<Value, EnvelopeError> {
        if self.is_success() {
            Ok(self.data)
        } else {
            Err(EnvelopeError {
                code: self.code(),
                msg: self.msg.unwrap_or_else(|| "Unknown error".to_string()),
            })
        }
    }
}

/// A non-successful envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeError {
    pub code: Option<i64>,
    pub msg: String,
}

impl fmt::Display for EnvelopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "API error {}: {}", code, self.msg),
            None => write!(f, "API error: {}", self.msg),
        }
    }
}

impl std::error::Error for EnvelopeError {}

/// Locate the record list in a `data` payload.
///
/// Accepts a bare array or an object holding one of [`RECORD_LIST_FIELDS`].
pub fn extract_records(data: &Value) -> Option<Vec<Value>> {
    match data {
        Value::Array(items) => Some(items.clone()),
        Value::Object(map) => RECORD_LIST_FIELDS
            .iter()
            .find_map(|field| map.get(*field).and_then(Value::as_array))
            .cloned(),
        _ => None,
    }
}

/// Total record count of a page payload, falling back to the list length
pub fn extract_total(data: &Value, records: &[Value]) -> u64 {
    ["total", "totalCount"]
        .iter()
        .find_map(|field| data.get(*field).and_then(lenient_i64))
        .map(|total| total.max(0) as u64)
        .unwrap_or(records.len() as u64)
}

/// Read an integer that may have been serialized as a number or a numeric string
pub fn lenient_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
