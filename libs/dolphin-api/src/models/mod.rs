//! Scheduler API models

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::envelope::lenient_i64;

/// `POST /login` payload
#[derive(Debug, Clone, Deserialize)]
pub struct LoginData {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

/// Project record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRecord {
    #[serde(deserialize_with = "de_lenient_i64")]
    pub code: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Datasource record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasourceRecord {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default, rename = "type")]
    pub datasource_type: Option<String>,
    #[serde(default, alias = "dbName")]
    pub database: Option<String>,
    #[serde(default, alias = "description")]
    pub note: Option<String>,
}

/// Task instance record, as listed under a workflow instance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInstanceRecord {
    #[serde(deserialize_with = "de_lenient_i64")]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub start_time: Option<Value>,
}

/// Task definition as the scheduler stores it (`taskDefinitionJson` entries)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDefinitionJson {
    pub code: i64,
    pub version: i32,
    pub name: String,
    pub description: String,
    pub task_type: String,
    pub task_params: Value,
    pub flag: String,
    pub task_priority: String,
    pub worker_group: String,
    pub environment_code: i64,
    pub fail_retry_times: i32,
    pub fail_retry_interval: i32,
    pub timeout_flag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_notify_strategy: Option<String>,
    pub timeout: i64,
    pub delay_time: i32,
}

/// Dependency edge (`taskRelationJson` entries)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRelationJson {
    pub name: String,
    pub pre_task_code: i64,
    pub pre_task_version: i32,
    pub post_task_code: i64,
    pub post_task_version: i32,
    pub condition_type: String,
    pub condition_params: Value,
}

impl TaskRelationJson {
    pub fn new(pre: (i64, i32), post: (i64, i32)) -> Self {
        Self {
            name: String::new(),
            pre_task_code: pre.0,
            pre_task_version: pre.1,
            post_task_code: post.0,
            post_task_version: post.1,
            condition_type: "NONE".to_string(),
            condition_params: Value::Object(Default::default()),
        }
    }
}

/// Canvas position (`locations` entries)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskLocationJson {
    pub task_code: i64,
    pub x: i64,
    pub y: i64,
}

/// Read the workflow code out of a `query-by-name` payload.
///
/// Newer versions nest the definition under `processDefinition` or
/// `workflowDefinition`, older ones return it flat.
pub fn workflow_code_of(data: &Value) -> Option<i64> {
    ["processDefinition", "workflowDefinition"]
        .iter()
        .find_map(|field| data.get(*field).and_then(|d| d.get("code")))
        .or_else(|| data.get("code"))
        .and_then(lenient_i64)
}

fn de_lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    lenient_i64(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("expected an integer, got {}", value)))
}
