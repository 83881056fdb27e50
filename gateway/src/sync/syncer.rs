//! Workflow synchronization

use std::sync::Arc;

use gateway_api::{SyncWorkflowRequest, SyncWorkflowResponse};
use tracing::{debug, info};

use crate::cache::definition::DefinitionCache;
use crate::errors::GatewayError;
use crate::models::workflow::ReleaseState;
use crate::scheduler::SchedulerExt;
use crate::sync::graph::build;
use crate::sync::WorkflowDefaults;

/// Workflow syncer
pub struct Syncer {
    scheduler: Arc<dyn SchedulerExt>,
    definition_cache: Arc<DefinitionCache>,
    defaults: Arc<WorkflowDefaults>,
}

impl Syncer {
    /// Create a new syncer
    pub fn new(
        scheduler: Arc<dyn SchedulerExt>,
        definition_cache: Arc<DefinitionCache>,
        defaults: Arc<WorkflowDefaults>,
    ) -> Self {
        Self {
            scheduler,
            definition_cache,
            defaults,
        }
    }

    /// Create or update a workflow and remember the request for later releases.
    ///
    /// `handle` is the scheduler's workflow code, 0 to create. Creates share no
    /// lock; the new code is only locked while its cache entry is written.
    pub async fn synchronize(
        &self,
        handle: i64,
        request: SyncWorkflowRequest,
    ) -> Result<SyncWorkflowResponse, GatewayError> {
        if handle == 0 {
            return self.submit(handle, request).await;
        }
        let _guard = self.definition_cache.lock_handle(handle).await;
        self.submit(handle, request).await
    }

    /// Flip a workflow online or offline by resubmitting its cached definition
    pub async fn release(&self, handle: i64, desired: &str) -> Result<i64, GatewayError> {
        let state: ReleaseState = desired.parse()?;

        let _guard = self.definition_cache.lock_handle(handle).await;
        let cached = self.definition_cache.get(handle).ok_or_else(|| {
            GatewayError::NotFound(format!(
                "Workflow {} has not been synchronized by this gateway, synchronize it before changing its release state",
                handle
            ))
        })?;

        let mut request = cached.request;
        request.release_state = Some(state.as_str().to_string());

        info!("Setting workflow {} release state to {}", handle, state);
        let response = self.submit(handle, request).await?;
        Ok(response.workflow_code)
    }

    /// Caller must hold the lock of a non-zero `handle`
    async fn submit(
        &self,
        handle: i64,
        request: SyncWorkflowRequest,
    ) -> Result<SyncWorkflowResponse, GatewayError> {
        let built = build(&request, handle, &self.defaults)?;
        let task_count = request.tasks.len();

        debug!(
            "Submitting workflow {} ({} tasks, {} edges) to project {}",
            built.workflow.name,
            task_count,
            built.workflow.edges().len(),
            built.workflow.project
        );

        let workflow_code = self.scheduler.create_or_update(&built.workflow).await?;

        if handle == 0 {
            info!(
                "Created workflow {} with code {}",
                built.workflow.name, workflow_code
            );
        } else {
            info!("Updated workflow {} ({})", built.workflow.name, workflow_code);
        }

        if workflow_code == handle {
            self.definition_cache.put(workflow_code, request);
        } else {
            let _guard = self.definition_cache.lock_handle(workflow_code).await;
            self.definition_cache.put(workflow_code, request);
        }

        Ok(SyncWorkflowResponse {
            workflow_code,
            task_count,
            dropped_relations: built.dropped_relations,
        })
    }
}
