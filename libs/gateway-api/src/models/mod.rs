//! Gateway API models

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Standard response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub data: Value,
}

impl ApiResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            code: "OK".to_string(),
            message: "ok".to_string(),
            data,
        }
    }

    pub fn ok_with_message(data: Value, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::ok(data)
        }
    }

    pub fn fail(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            code: code.into(),
            message: message.into(),
            data: Value::Object(Default::default()),
        }
    }
}

/// Health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Version response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionResponse {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

// ================================ WORKFLOWS ===================================== //

/// Deprecated workflow bootstrap request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnsureWorkflowRequest {
    pub workflow_name: String,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub tenant_code: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub execution_type: Option<String>,
    #[serde(default)]
    pub worker_group: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnsureWorkflowResponse {
    pub workflow_code: i64,
    pub created: bool,
}

/// A single task as submitted by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDefinitionPayload {
    /// Client-assigned task code, unique within the request
    pub code: i64,

    pub name: String,

    #[serde(default = "default_version")]
    pub version: i32,

    #[serde(default)]
    pub description: Option<String>,

    /// SHELL or SQL; anything else is treated as SHELL
    #[serde(default = "default_task_type")]
    pub task_type: String,

    /// Either a JSON object or a JSON-encoded string
    #[serde(default)]
    pub task_params: Option<Value>,

    #[serde(default = "default_priority")]
    pub task_priority: String,

    /// YES (enabled) or NO
    #[serde(default = "default_flag")]
    pub flag: String,

    #[serde(default)]
    pub worker_group: Option<String>,

    #[serde(default)]
    pub environment_code: Option<i64>,

    #[serde(default)]
    pub fail_retry_times: i32,

    #[serde(default = "default_retry_interval")]
    pub fail_retry_interval: i32,

    /// Timeout in seconds, 0 disables it
    #[serde(default)]
    pub timeout: i64,

    #[serde(default)]
    pub timeout_flag: Option<String>,

    #[serde(default)]
    pub timeout_notify_strategy: Option<String>,
}

fn default_version() -> i32 {
    1
}

fn default_task_type() -> String {
    "SHELL".to_string()
}

fn default_priority() -> String {
    "MEDIUM".to_string()
}

fn default_flag() -> String {
    "YES".to_string()
}

fn default_retry_interval() -> i32 {
    1
}

/// Dependency edge, `pre_task_code == 0` marks a root task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRelationPayload {
    pub pre_task_code: i64,
    pub post_task_code: i64,
}

/// Canvas position of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskLocationPayload {
    pub task_code: i64,
    pub x: i64,
    pub y: i64,
}

/// Full workflow definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncWorkflowRequest {
    pub workflow_name: String,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub tenant_code: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub execution_type: Option<String>,
    #[serde(default)]
    pub worker_group: Option<String>,
    #[serde(default)]
    pub release_state: Option<String>,
    #[serde(default)]
    pub tasks: Vec<TaskDefinitionPayload>,
    #[serde(default)]
    pub relations: Vec<TaskRelationPayload>,
    #[serde(default)]
    pub locations: Vec<TaskLocationPayload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncWorkflowResponse {
    pub workflow_code: i64,
    pub task_count: usize,
    /// Relations skipped because an endpoint was missing from the task list
    #[serde(default)]
    pub dropped_relations: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseWorkflowRequest {
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub workflow_name: Option<String>,
    pub release_state: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseWorkflowResponse {
    pub workflow_code: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartWorkflowRequest {
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub workflow_name: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub worker_group: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartWorkflowResponse {
    /// Instance created by this start, when it could be identified
    pub instance_id: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteWorkflowRequest {
    #[serde(default)]
    pub project_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteWorkflowResponse {
    pub workflow_code: i64,
    pub deleted: bool,
}

// ================================ PROJECTS ====================================== //

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryProjectRequest {
    pub project_name: String,
    #[serde(default)]
    pub user: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryProjectResponse {
    pub project_code: i64,
    pub project_name: String,
    pub description: Option<String>,
}

// ================================ INSTANCES ===================================== //

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetInstanceRequest {
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub workflow_name: Option<String>,
    #[serde(default)]
    pub instance_id: Option<i64>,
    #[serde(default)]
    pub user: Option<String>,
}

/// One execution run of a workflow definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionInstance {
    pub instance_id: i64,
    pub workflow_code: i64,
    pub workflow_name: String,
    pub state: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    /// Duration in seconds
    pub duration: Option<i64>,
    #[serde(default)]
    pub run_times: i64,
    pub host: Option<String>,
    pub command_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListInstancesRequest {
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub workflow_name: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default = "default_page_num")]
    pub page_num: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

impl Default for ListInstancesRequest {
    fn default() -> Self {
        Self {
            project_name: None,
            workflow_name: None,
            user: None,
            page_num: default_page_num(),
            page_size: default_page_size(),
            start_date: None,
            end_date: None,
            state: None,
        }
    }
}

fn default_page_num() -> u32 {
    1
}

fn default_page_size() -> u32 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListInstancesResponse {
    pub total: u64,
    pub page_num: u32,
    pub page_size: u32,
    pub instances: Vec<ExecutionInstance>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetInstanceLogRequest {
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub workflow_name: Option<String>,
    pub instance_id: i64,
    #[serde(default)]
    pub task_name: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetInstanceLogResponse {
    pub log_content: String,
    pub task_instance_id: Option<i64>,
}

// =============================== DATASOURCES ==================================== //

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasourceItem {
    pub id: Option<i64>,
    pub name: String,
    #[serde(rename = "type")]
    pub datasource_type: Option<String>,
    pub db_name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListDatasourcesResponse {
    pub datasources: Vec<DatasourceItem>,
}
