//! Execution instance records
//!
//! The scheduler reports instances with field names and timestamp formats that
//! vary between versions. [`InstanceRecord`] reads any of them tolerantly.

use chrono::{DateTime, NaiveDateTime};
use dolphin_api::lenient_i64;
use gateway_api::ExecutionInstance;
use serde_json::Value;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Values above this are epoch milliseconds, below it epoch seconds
const EPOCH_MILLIS_THRESHOLD: f64 = 1e12;

/// An instance as parsed from a listing or detail payload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceRecord {
    pub id: Option<i64>,
    pub workflow_code: Option<i64>,
    pub workflow_name: Option<String>,
    pub name: Option<String>,
    pub state: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub duration: Option<i64>,
    pub run_times: i64,
    pub host: Option<String>,
    pub command_type: Option<String>,
}

impl InstanceRecord {
    pub fn from_value(value: &Value) -> Self {
        Self {
            id: first_i64(value, &["id", "processInstanceId", "workflowInstanceId"]),
            workflow_code: first_i64(
                value,
                &["processDefinitionCode", "workflowDefinitionCode"],
            ),
            workflow_name: first_string(
                value,
                &["processDefinitionName", "workflowDefinitionName"],
            ),
            name: first_string(value, &["name"]),
            state: value.get("state").and_then(state_name),
            start_time: value.get("startTime").and_then(normalize_timestamp),
            end_time: value.get("endTime").and_then(normalize_timestamp),
            duration: value.get("duration").and_then(parse_duration),
            run_times: value.get("runTimes").and_then(lenient_i64).unwrap_or(0),
            host: first_string(value, &["host"]),
            command_type: first_string(value, &["commandType"]),
        }
    }

    /// Whether the record belongs to the given workflow.
    ///
    /// The code is authoritative when present. Otherwise the record matches by
    /// definition name, or by an instance name of the form `<workflow>-...`.
    pub fn belongs_to(&self, workflow_code: i64, workflow_name: &str) -> bool {
        if let Some(code) = self.workflow_code {
            return code == workflow_code;
        }
        if self.workflow_name.as_deref() == Some(workflow_name) {
            return true;
        }
        match &self.name {
            Some(name) => {
                name == workflow_name
                    || name
                        .strip_prefix(workflow_name)
                        .is_some_and(|rest| rest.starts_with('-'))
            }
            None => false,
        }
    }

    /// Duration in seconds, computed from the timestamps when not reported
    pub fn duration_secs(&self) -> Option<i64> {
        if self.duration.is_some() {
            return self.duration;
        }
        let start = parse_normalized(self.start_time.as_deref()?)?;
        let end = parse_normalized(self.end_time.as_deref()?)?;
        Some((end - start).num_seconds().max(0))
    }

    /// Convert to the caller-facing model. Records without an id are dropped.
    pub fn into_execution_instance(
        self,
        fallback_code: i64,
        fallback_name: &str,
    ) -> Option<ExecutionInstance> {
        let duration = self.duration_secs();
        let instance_id = self.id?;
        Some(ExecutionInstance {
            instance_id,
            workflow_code: self.workflow_code.unwrap_or(fallback_code),
            workflow_name: self
                .workflow_name
                .or(self.name)
                .unwrap_or_else(|| fallback_name.to_string()),
            state: self.state.unwrap_or_else(|| "UNKNOWN".to_string()),
            start_time: self.start_time,
            end_time: self.end_time,
            duration,
            run_times: self.run_times,
            host: self.host,
            command_type: self.command_type,
        })
    }
}

/// Normalize a scheduler timestamp to `YYYY-MM-DDTHH:MM:SS`.
///
/// Strings already carrying a `T` pass through, `YYYY-MM-DD HH:MM:SS` gets its
/// separator replaced, and numbers are read as epoch seconds or milliseconds
/// (UTC). Anything unrecognized is returned as-is.
pub fn normalize_timestamp(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Number(n) => n.as_f64().and_then(from_epoch),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            if let Ok(number) = s.parse::<f64>() {
                return from_epoch(number);
            }
            if s.contains('T') {
                return Some(s.to_string());
            }
            Some(s.replacen(' ', "T", 1))
        }
        other => Some(other.to_string()),
    }
}

fn from_epoch(value: f64) -> Option<String> {
    let millis = if value > EPOCH_MILLIS_THRESHOLD {
        value as i64
    } else {
        (value * 1000.0) as i64
    };
    DateTime::from_timestamp_millis(millis).map(|dt| dt.naive_utc().format(TIMESTAMP_FORMAT).to_string())
}

fn parse_normalized(s: &str) -> Option<NaiveDateTime> {
    let trimmed = s.get(..19).unwrap_or(s);
    NaiveDateTime::parse_from_str(trimmed, TIMESTAMP_FORMAT).ok()
}

/// Seconds from a number or a text like `1h 2m 3s`
fn parse_duration(value: &Value) -> Option<i64> {
    if let Some(secs) = lenient_i64(value) {
        return Some(secs);
    }
    let text = value.as_str()?;
    let mut total = 0i64;
    let mut matched = false;
    for token in text.split_whitespace() {
        let split = token.find(|c: char| !c.is_ascii_digit())?;
        let (amount, unit) = token.split_at(split);
        let amount: i64 = amount.parse().ok()?;
        let factor = match unit {
            "d" => 86_400,
            "h" => 3_600,
            "m" => 60,
            "s" => 1,
            _ => return None,
        };
        total = amount.checked_mul(factor)?.checked_add(total)?;
        matched = true;
    }
    matched.then_some(total)
}

fn state_name(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => ["name", "desc", "code"]
            .iter()
            .find_map(|field| map.get(*field))
            .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string())),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn first_i64(value: &Value, fields: &[&str]) -> Option<i64> {
    fields
        .iter()
        .find_map(|field| value.get(*field).and_then(lenient_i64))
}

fn first_string(value: &Value, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|field| match value.get(*field) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
