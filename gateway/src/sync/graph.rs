//! Graph building
//!
//! Wires normalized tasks and caller relations into an [`EngineWorkflow`].

use gateway_api::SyncWorkflowRequest;
use tracing::warn;

use crate::errors::GatewayError;
use crate::models::workflow::{EngineWorkflow, ExecutionType, ReleaseState};
use crate::sync::normalize::normalize;
use crate::sync::WorkflowDefaults;

/// Upstream code meaning "no upstream"
pub const ROOT_SENTINEL: i64 = 0;

/// Result of building a workflow graph
#[derive(Debug, Clone)]
pub struct BuiltWorkflow {
    pub workflow: EngineWorkflow,
    /// Relations skipped because an endpoint is not in the task list
    pub dropped_relations: usize,
}

/// Build the engine workflow for a request.
///
/// `existing` is the scheduler's code for the workflow, 0 to create it.
pub fn build(
    request: &SyncWorkflowRequest,
    existing: i64,
    defaults: &WorkflowDefaults,
) -> Result<BuiltWorkflow, GatewayError> {
    let name = request.workflow_name.trim();
    if name.is_empty() {
        return Err(GatewayError::ValidationError(
            "workflowName is required".to_string(),
        ));
    }
    let project = defaults.project(request.project_name.as_deref());
    if project.is_empty() {
        return Err(GatewayError::ValidationError(
            "projectName is required".to_string(),
        ));
    }

    let release_state = match request.release_state.as_deref() {
        Some(state) => state.parse::<ReleaseState>()?,
        None => defaults.release_state,
    };
    let execution_type = match request.execution_type.as_deref() {
        Some(exec) if !exec.trim().is_empty() => exec.parse::<ExecutionType>()?,
        _ => defaults.execution_type,
    };
    let worker_group =
        WorkflowDefaults::or_default(request.worker_group.as_deref(), &defaults.worker_group);

    let mut workflow = EngineWorkflow::new(
        (existing != 0).then_some(existing),
        name.to_string(),
        project.to_string(),
        request.description.clone().unwrap_or_default(),
        defaults.user(request.user.as_deref()).to_string(),
        WorkflowDefaults::or_default(request.tenant_code.as_deref(), &defaults.tenant).to_string(),
        worker_group.to_string(),
        execution_type,
        release_state,
    );

    for payload in &request.tasks {
        if payload.code == ROOT_SENTINEL {
            return Err(GatewayError::ValidationError(format!(
                "Task {} uses the reserved code 0",
                payload.name
            )));
        }
        if !workflow.add_task(normalize(payload, worker_group)) {
            return Err(GatewayError::ValidationError(format!(
                "Duplicate task code {}",
                payload.code
            )));
        }
    }

    let mut dropped_relations = 0;
    for relation in &request.relations {
        if relation.pre_task_code == ROOT_SENTINEL {
            continue;
        }
        if !workflow.link(relation.pre_task_code, relation.post_task_code) {
            warn!(
                "Dropping relation {} -> {} of workflow {}: endpoint not in task list",
                relation.pre_task_code, relation.post_task_code, name
            );
            dropped_relations += 1;
        }
    }

    workflow.locations = request.locations.clone();

    Ok(BuiltWorkflow {
        workflow,
        dropped_relations,
    })
}
