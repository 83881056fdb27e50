//! Gateway facade
//!
//! One method per caller-facing operation. Handlers in `server` only translate
//! HTTP to and from these calls.

use std::sync::Arc;

use gateway_api::{
    DatasourceItem, DeleteWorkflowRequest, DeleteWorkflowResponse, EnsureWorkflowRequest,
    EnsureWorkflowResponse, ExecutionInstance, GetInstanceLogRequest, GetInstanceLogResponse,
    GetInstanceRequest, ListDatasourcesResponse, ListInstancesRequest, ListInstancesResponse,
    QueryProjectRequest, QueryProjectResponse, ReleaseWorkflowRequest, ReleaseWorkflowResponse,
    StartWorkflowRequest, StartWorkflowResponse, SyncWorkflowRequest, SyncWorkflowResponse,
};
use tokio::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::cache::definition::DefinitionCache;
use crate::correlate::poller::{await_instance, capture_baseline};
use crate::correlate::selection::select_candidate;
use crate::correlate::{self, Target};
use crate::errors::GatewayError;
use crate::models::instance::InstanceRecord;
use crate::scheduler::{DatasourceFilter, InstanceQuery, SchedulerExt, StartCommand};
use crate::sync::syncer::Syncer;
use crate::sync::WorkflowDefaults;

pub const DEGRADED_START_MESSAGE: &str = "submitted but instance id not available";
pub const START_MESSAGE: &str = "submitted";

/// Phases of a start operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartPhase {
    Verifying,
    BaselineCapture,
    Starting,
    Correlating,
    Done,
    DegradedDone,
}

/// Gateway facade
pub struct Gateway {
    scheduler: Arc<dyn SchedulerExt>,
    definition_cache: Arc<DefinitionCache>,
    defaults: Arc<WorkflowDefaults>,
    correlator: correlate::Options,
    syncer: Syncer,
}

impl Gateway {
    pub fn new(
        scheduler: Arc<dyn SchedulerExt>,
        definition_cache: Arc<DefinitionCache>,
        defaults: Arc<WorkflowDefaults>,
        correlator: correlate::Options,
    ) -> Self {
        let syncer = Syncer::new(scheduler.clone(), definition_cache.clone(), defaults.clone());
        Self {
            scheduler,
            definition_cache,
            defaults,
            correlator,
            syncer,
        }
    }

    pub fn definition_cache(&self) -> &Arc<DefinitionCache> {
        &self.definition_cache
    }

    /// Deprecated bootstrap call, workflows are created by `synchronize`
    pub async fn ensure_workflow(
        &self,
        request: EnsureWorkflowRequest,
    ) -> Result<EnsureWorkflowResponse, GatewayError> {
        warn!(
            "ensure_workflow is deprecated, workflow {} will be created on first sync",
            request.workflow_name
        );
        Ok(EnsureWorkflowResponse {
            workflow_code: 0,
            created: false,
        })
    }

    pub async fn synchronize(
        &self,
        handle: i64,
        request: SyncWorkflowRequest,
    ) -> Result<SyncWorkflowResponse, GatewayError> {
        self.syncer.synchronize(handle, request).await
    }

    pub async fn release(
        &self,
        handle: i64,
        request: ReleaseWorkflowRequest,
    ) -> Result<ReleaseWorkflowResponse, GatewayError> {
        let workflow_code = self.syncer.release(handle, &request.release_state).await?;
        Ok(ReleaseWorkflowResponse { workflow_code })
    }

    /// Start a workflow and identify the instance it created.
    ///
    /// Failing to identify the instance does not fail the start.
    pub async fn start(
        &self,
        handle: i64,
        request: StartWorkflowRequest,
    ) -> Result<StartWorkflowResponse, GatewayError> {
        let span = info_span!("start", op = %Uuid::new_v4(), workflow = handle);
        self.start_impl(handle, request).instrument(span).await
    }

    async fn start_impl(
        &self,
        handle: i64,
        request: StartWorkflowRequest,
    ) -> Result<StartWorkflowResponse, GatewayError> {
        if handle <= 0 {
            return Err(GatewayError::ValidationError(
                "A workflow code is required to start a workflow".to_string(),
            ));
        }

        let cached = self.definition_cache.get(handle).map(|entry| entry.request);
        let workflow_name = request
            .workflow_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .or_else(|| cached.as_ref().map(|c| c.workflow_name.clone()))
            .ok_or_else(|| {
                GatewayError::ValidationError("workflowName is required".to_string())
            })?;
        let project = self.defaults.project(request.project_name.as_deref());
        let user = self.defaults.user(request.user.as_deref());

        enter(StartPhase::Verifying);
        let (resolved_code, _) = futures::try_join!(
            self.scheduler.query_workflow_code(user, project, &workflow_name),
            self.scheduler.query_project(user, project),
        )
        .map_err(|e| match e {
            GatewayError::NotFound(_) | GatewayError::ValidationError(_) => e,
            other => GatewayError::NotFound(format!(
                "Workflow {} not found in project {}: {}",
                workflow_name, project, other
            )),
        })?;
        if resolved_code != handle {
            warn!(
                "Workflow {} resolves to code {} in project {}, starting requested code {}",
                workflow_name, resolved_code, project, handle
            );
        }

        let target = Target {
            project,
            workflow_code: handle,
            workflow_name: &workflow_name,
        };
        let deadline = Instant::now() + self.correlator.budget;

        enter(StartPhase::BaselineCapture);
        let baseline =
            capture_baseline(self.scheduler.as_ref(), &self.correlator, &target, deadline).await;

        enter(StartPhase::Starting);
        let worker_group = request
            .worker_group
            .as_deref()
            .or_else(|| cached.as_ref().and_then(|c| c.worker_group.as_deref()));
        let tenant = cached.as_ref().and_then(|c| c.tenant_code.as_deref());
        let command = StartCommand {
            project: project.to_string(),
            workflow_code: handle,
            user: user.to_string(),
            tenant: WorkflowDefaults::or_default(tenant, &self.defaults.tenant).to_string(),
            worker_group: WorkflowDefaults::or_default(worker_group, &self.defaults.worker_group)
                .to_string(),
        };
        self.scheduler.start(&command).await.map_err(|e| {
            error!("Failed to start workflow {}: {}", handle, e);
            e
        })?;

        enter(StartPhase::Correlating);
        let found = await_instance(
            self.scheduler.as_ref(),
            &self.correlator,
            &target,
            baseline,
            deadline,
            tokio::time::sleep,
        )
        .await;

        match found.and_then(|record| record.id) {
            Some(instance_id) => {
                enter(StartPhase::Done);
                Ok(StartWorkflowResponse {
                    instance_id: Some(instance_id.to_string()),
                    message: START_MESSAGE.to_string(),
                })
            }
            None => {
                enter(StartPhase::DegradedDone);
                Ok(StartWorkflowResponse {
                    instance_id: None,
                    message: DEGRADED_START_MESSAGE.to_string(),
                })
            }
        }
    }

    /// Fetch one instance, or the newest one when no id is given
    pub async fn get_instance(
        &self,
        handle: i64,
        request: GetInstanceRequest,
    ) -> Result<ExecutionInstance, GatewayError> {
        let project = self.defaults.project(request.project_name.as_deref());
        let workflow_name = self.workflow_name(handle, request.workflow_name.as_deref());

        let record = match request.instance_id {
            Some(instance_id) => {
                let payload = self.scheduler.get_instance(project, instance_id).await?;
                let mut record = InstanceRecord::from_value(&payload);
                record.id.get_or_insert(instance_id);
                record
            }
            None => {
                let query = InstanceQuery {
                    workflow_code: handle,
                    page_no: 1,
                    page_size: self.correlator.page_size,
                    ..Default::default()
                };
                let page = self.scheduler.list_instances(project, &query).await?;
                let records = page.records.iter().map(InstanceRecord::from_value).collect();
                let target = Target {
                    project,
                    workflow_code: handle,
                    workflow_name: &workflow_name,
                };
                select_candidate(records, &target, None).ok_or_else(|| {
                    GatewayError::NotFound(format!("No instances found for workflow {}", handle))
                })?
            }
        };

        record
            .into_execution_instance(handle, &workflow_name)
            .ok_or_else(|| GatewayError::UpstreamError("Instance payload has no id".to_string()))
    }

    pub async fn list_instances(
        &self,
        handle: i64,
        request: ListInstancesRequest,
    ) -> Result<ListInstancesResponse, GatewayError> {
        let project = self.defaults.project(request.project_name.as_deref());
        let workflow_name = self.workflow_name(handle, request.workflow_name.as_deref());

        let query = InstanceQuery {
            workflow_code: handle,
            page_no: request.page_num.max(1),
            page_size: request.page_size.max(1),
            search: None,
            start_date: request.start_date.clone(),
            end_date: request.end_date.clone(),
            state: request.state.clone(),
        };
        let page = self.scheduler.list_instances(project, &query).await?;

        let instances: Vec<ExecutionInstance> = page
            .records
            .iter()
            .filter_map(|value| {
                let instance = InstanceRecord::from_value(value)
                    .into_execution_instance(handle, &workflow_name);
                if instance.is_none() {
                    debug!("Skipping instance record without id: {}", value);
                }
                instance
            })
            .collect();

        Ok(ListInstancesResponse {
            total: page.total,
            page_num: query.page_no,
            page_size: query.page_size,
            instances,
        })
    }

    /// Log of one task of an instance, the most recent task when none is named
    pub async fn get_instance_log(
        &self,
        handle: i64,
        request: GetInstanceLogRequest,
    ) -> Result<GetInstanceLogResponse, GatewayError> {
        let project = self.defaults.project(request.project_name.as_deref());
        let tasks = self
            .scheduler
            .list_task_instances(project, request.instance_id)
            .await?;

        let task = match request.task_name.as_deref().filter(|n| !n.trim().is_empty()) {
            Some(name) => tasks.into_iter().find(|t| t.name == name).ok_or_else(|| {
                GatewayError::NotFound(format!(
                    "Task {} not found in instance {}",
                    name, request.instance_id
                ))
            })?,
            None => tasks.into_iter().max_by_key(|t| t.id).ok_or_else(|| {
                GatewayError::NotFound(format!(
                    "Instance {} of workflow {} has no task instances",
                    request.instance_id, handle
                ))
            })?,
        };

        let log_content = self.scheduler.task_log(task.id).await?;
        Ok(GetInstanceLogResponse {
            log_content,
            task_instance_id: Some(task.id),
        })
    }

    pub async fn query_project(
        &self,
        request: QueryProjectRequest,
    ) -> Result<QueryProjectResponse, GatewayError> {
        let name = request.project_name.trim();
        if name.is_empty() {
            return Err(GatewayError::ValidationError(
                "projectName is required".to_string(),
            ));
        }
        let user = self.defaults.user(request.user.as_deref());

        let project = self
            .scheduler
            .query_project(user, name)
            .await
            .map_err(|e| match e {
                GatewayError::NotFound(_) => e,
                other => GatewayError::NotFound(format!(
                    "Project {} not found or error querying the scheduler: {}",
                    name, other
                )),
            })?;

        Ok(QueryProjectResponse {
            project_code: project.code,
            project_name: project.name,
            description: project.description,
        })
    }

    pub async fn list_datasources(
        &self,
        filter: DatasourceFilter,
    ) -> Result<ListDatasourcesResponse, GatewayError> {
        let records = self.scheduler.list_datasources(&filter).await?;
        Ok(ListDatasourcesResponse {
            datasources: records
                .into_iter()
                .map(|ds| DatasourceItem {
                    id: ds.id,
                    name: ds.name,
                    datasource_type: ds.datasource_type,
                    db_name: ds.database,
                    description: ds.note,
                })
                .collect(),
        })
    }

    /// Delete a workflow. Never fails: remote errors are logged and the cached
    /// definition is dropped regardless.
    pub async fn delete_workflow(
        &self,
        handle: i64,
        request: DeleteWorkflowRequest,
    ) -> Result<DeleteWorkflowResponse, GatewayError> {
        let project = self.defaults.project(request.project_name.as_deref());

        let _guard = self.definition_cache.lock_handle(handle).await;
        let deleted = match self.scheduler.delete_workflow(project, handle).await {
            Ok(()) => {
                info!("Deleted workflow {} from project {}", handle, project);
                true
            }
            Err(e) => {
                error!("Failed to delete workflow {} from project {}: {}", handle, project, e);
                false
            }
        };

        if self.definition_cache.remove(handle).is_some() {
            debug!("Dropped cached definition of workflow {}", handle);
        }

        Ok(DeleteWorkflowResponse {
            workflow_code: handle,
            deleted,
        })
    }

    fn workflow_name(&self, handle: i64, requested: Option<&str>) -> String {
        requested
            .filter(|name| !name.trim().is_empty())
            .map(str::to_string)
            .or_else(|| {
                self.definition_cache
                    .get(handle)
                    .map(|entry| entry.request.workflow_name)
            })
            .unwrap_or_default()
    }
}

fn enter(phase: StartPhase) {
    debug!(?phase, "start phase");
}
