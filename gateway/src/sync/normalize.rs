//! Task normalization
//!
//! Turns a loosely-typed task payload into an [`EngineTask`]: parameters may be
//! a JSON object or a JSON-encoded string, timeouts arrive in seconds and the
//! task type may be anything.

use gateway_api::TaskDefinitionPayload;
use serde_json::{Map, Value};
use tracing::warn;

use crate::models::workflow::{EngineTask, SqlType, TaskKind};

pub const DEFAULT_SHELL_SCRIPT: &str = "#!/bin/bash\necho 'No script'";
pub const DEFAULT_DATASOURCE: &str = "default_datasource";
pub const DEFAULT_SQL: &str = "SELECT 1";

/// Parse task parameters into a map.
///
/// Missing, malformed or non-object parameters yield an empty map; malformed
/// ones are logged.
pub fn parse_task_params(params: Option<&Value>) -> Map<String, Value> {
    match params {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(Value::String(raw)) => {
            if raw.trim().is_empty() {
                return Map::new();
            }
            match serde_json::from_str::<Value>(raw) {
                Ok(Value::Object(map)) => map,
                Ok(other) => {
                    warn!("Task params decoded to a non-object value: {}", other);
                    Map::new()
                }
                Err(e) => {
                    warn!("Failed to parse task params: {}", e);
                    Map::new()
                }
            }
        }
        Some(Value::Array(pairs)) => pairs_to_map(pairs).unwrap_or_else(|| {
            warn!("Task params array is not a list of key/value pairs");
            Map::new()
        }),
        Some(other) => {
            warn!("Unsupported task params type: {}", other);
            Map::new()
        }
    }
}

fn pairs_to_map(pairs: &[Value]) -> Option<Map<String, Value>> {
    pairs
        .iter()
        .map(|pair| match pair.as_array()?.as_slice() {
            [Value::String(key), value] => Some((key.clone(), value.clone())),
            _ => None,
        })
        .collect()
}

/// Convert a timeout in seconds to whole minutes, rounding up.
///
/// Non-positive values disable the timeout.
pub fn to_minutes(seconds: i64) -> i64 {
    if seconds <= 0 {
        return 0;
    }
    (seconds - 1) / 60 + 1
}

/// Normalize one task. `worker_group` is used when the task names none.
pub fn normalize(payload: &TaskDefinitionPayload, worker_group: &str) -> EngineTask {
    let params = parse_task_params(payload.task_params.as_ref());

    let kind = match payload.task_type.trim().to_uppercase().as_str() {
        "SQL" => sql_kind(&params),
        "SHELL" => shell_kind(&params),
        other => {
            warn!(
                "Task {} has unsupported type {}, submitting as SHELL",
                payload.code, other
            );
            shell_kind(&params)
        }
    };

    let timeout_minutes = if timeout_disabled(payload.timeout_flag.as_deref()) {
        0
    } else {
        to_minutes(payload.timeout)
    };

    EngineTask {
        code: payload.code,
        version: payload.version,
        name: payload.name.clone(),
        description: payload.description.clone().unwrap_or_default(),
        kind,
        priority: payload.task_priority.trim().to_uppercase(),
        worker_group: payload
            .worker_group
            .clone()
            .filter(|wg| !wg.trim().is_empty())
            .unwrap_or_else(|| worker_group.to_string()),
        environment_code: payload.environment_code.filter(|code| *code > 0),
        fail_retry_times: payload.fail_retry_times.max(0),
        fail_retry_interval: payload.fail_retry_interval.max(0),
        timeout_minutes,
        timeout_notify_strategy: payload.timeout_notify_strategy.clone(),
        enabled: !payload.flag.trim().eq_ignore_ascii_case("NO"),
    }
}

fn timeout_disabled(flag: Option<&str>) -> bool {
    flag.is_some_and(|flag| flag.trim().eq_ignore_ascii_case("CLOSE"))
}

fn shell_kind(params: &Map<String, Value>) -> TaskKind {
    TaskKind::Shell {
        raw_script: string_param(params, "rawScript")
            .unwrap_or_else(|| DEFAULT_SHELL_SCRIPT.to_string()),
    }
}

fn sql_kind(params: &Map<String, Value>) -> TaskKind {
    let sql_type = params
        .get("sqlType")
        .and_then(dolphin_api::lenient_i64)
        .unwrap_or(0);
    TaskKind::Sql {
        datasource_name: string_param(params, "datasourceName")
            .or_else(|| string_param(params, "datasource"))
            .unwrap_or_else(|| DEFAULT_DATASOURCE.to_string()),
        sql: string_param(params, "sql").unwrap_or_else(|| DEFAULT_SQL.to_string()),
        sql_type: SqlType::from_code(sql_type),
    }
}

fn string_param(params: &Map<String, Value>, key: &str) -> Option<String> {
    match params.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}
