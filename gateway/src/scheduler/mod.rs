//! Scheduler access
//!
//! [`SchedulerExt`] is everything the gateway needs from the scheduler. The
//! REST implementation lives in [`dolphin`]; tests substitute an in-memory one.

pub mod dolphin;

use async_trait::async_trait;
use dolphin_api::{DatasourceRecord, ProjectRecord, TaskInstanceRecord};
use serde_json::Value;

use crate::errors::GatewayError;
use crate::models::workflow::EngineWorkflow;

/// Start command for a released workflow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartCommand {
    pub project: String,
    pub workflow_code: i64,
    pub user: String,
    pub tenant: String,
    pub worker_group: String,
}

/// Instance listing filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceQuery {
    pub workflow_code: i64,
    pub page_no: u32,
    pub page_size: u32,
    pub search: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub state: Option<String>,
}

/// One page of raw instance records
#[derive(Debug, Clone, Default)]
pub struct InstancePage {
    pub total: u64,
    pub records: Vec<Value>,
}

/// Datasource listing filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasourceFilter {
    pub datasource_type: Option<String>,
    pub keyword: Option<String>,
}

/// Scheduler trait for testability
#[async_trait]
pub trait SchedulerExt: Send + Sync {
    /// Create the workflow when `workflow.code` is unset, update it in place
    /// otherwise. Returns the workflow code.
    async fn create_or_update(&self, workflow: &EngineWorkflow) -> Result<i64, GatewayError>;

    /// Fire a start command. The scheduler does not report the created instance.
    async fn start(&self, command: &StartCommand) -> Result<(), GatewayError>;

    /// Look up a workflow code by name
    async fn query_workflow_code(
        &self,
        user: &str,
        project: &str,
        name: &str,
    ) -> Result<i64, GatewayError>;

    async fn query_project(&self, user: &str, project: &str)
        -> Result<ProjectRecord, GatewayError>;

    async fn delete_workflow(&self, project: &str, code: i64) -> Result<(), GatewayError>;

    async fn list_instances(
        &self,
        project: &str,
        query: &InstanceQuery,
    ) -> Result<InstancePage, GatewayError>;

    async fn get_instance(&self, project: &str, instance_id: i64) -> Result<Value, GatewayError>;

    async fn list_task_instances(
        &self,
        project: &str,
        instance_id: i64,
    ) -> Result<Vec<TaskInstanceRecord>, GatewayError>;

    async fn task_log(&self, task_instance_id: i64) -> Result<String, GatewayError>;

    async fn list_datasources(
        &self,
        filter: &DatasourceFilter,
    ) -> Result<Vec<DatasourceRecord>, GatewayError>;
}
