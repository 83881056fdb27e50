//! DolphinScheduler REST implementation of [`SchedulerExt`]

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use dolphin_api::{DatasourceRecord, ProjectRecord, TaskInstanceRecord};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::authn::credential::Credential;
use crate::authn::session_mngr::SessionManagerExt;
use crate::errors::GatewayError;
use crate::http::client::HttpClient;
use crate::http::workflows::DefinitionForm;
use crate::models::workflow::{EngineWorkflow, ReleaseState, TaskKind};
use crate::scheduler::{DatasourceFilter, InstancePage, InstanceQuery, SchedulerExt, StartCommand};

const DATASOURCE_PAGE_SIZE: u32 = 100;

/// Scheduler reached over its REST API
pub struct DolphinScheduler {
    http_client: Arc<HttpClient>,
    sessions: Arc<dyn SessionManagerExt>,
    project_codes: RwLock<HashMap<String, i64>>,
    log_limit: u32,
}

impl DolphinScheduler {
    pub fn new(
        http_client: Arc<HttpClient>,
        sessions: Arc<dyn SessionManagerExt>,
        log_limit: u32,
    ) -> Self {
        Self {
            http_client,
            sessions,
            project_codes: RwLock::new(HashMap::new()),
            log_limit,
        }
    }

    /// Run a call with the current credential, logging in again once if the
    /// session was rejected
    async fn authed<T, F, Fut>(&self, op: F) -> Result<T, GatewayError>
    where
        F: Fn(Credential) -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let credential = self.sessions.get_credential().await?;
        let retry = credential.is_session();
        match op(credential).await {
            Err(GatewayError::AuthError(msg)) if retry => {
                warn!("Scheduler session rejected, logging in again: {}", msg);
                self.sessions.invalidate().await;
                let credential = self.sessions.get_credential().await?;
                op(credential).await
            }
            other => other,
        }
    }

    async fn find_project(&self, project: &str) -> Result<ProjectRecord, GatewayError> {
        let http = &self.http_client;
        let record = self
            .authed(|credential| async move { http.find_project(project, &credential).await })
            .await?
            .ok_or_else(|| {
                GatewayError::NotFound(format!("Project {} not found", project))
            })?;

        let mut codes = self.project_codes.write().await;
        codes.insert(project.to_string(), record.code);
        Ok(record)
    }

    async fn project_code(&self, project: &str) -> Result<i64, GatewayError> {
        {
            let codes = self.project_codes.read().await;
            if let Some(code) = codes.get(project) {
                return Ok(*code);
            }
        }
        Ok(self.find_project(project).await?.code)
    }

    /// Resolve every datasource named by a SQL task
    async fn resolve_datasources(
        &self,
        workflow: &EngineWorkflow,
    ) -> Result<HashMap<String, DatasourceRecord>, GatewayError> {
        let names: BTreeSet<&str> = workflow
            .tasks()
            .filter_map(|task| match &task.kind {
                TaskKind::Sql {
                    datasource_name, ..
                } => Some(datasource_name.as_str()),
                TaskKind::Shell { .. } => None,
            })
            .collect();

        let http = &self.http_client;
        let mut resolved = HashMap::new();
        for name in names {
            let candidates = self
                .authed(|credential| async move {
                    http.list_datasources(Some(name), None, DATASOURCE_PAGE_SIZE, &credential)
                        .await
                })
                .await?;
            match candidates.into_iter().find(|ds| ds.name == name) {
                Some(datasource) => {
                    debug!("Resolved datasource {} to id {:?}", name, datasource.id);
                    resolved.insert(name.to_string(), datasource);
                }
                None => warn!("Datasource {} is not known to the scheduler", name),
            }
        }
        Ok(resolved)
    }

    async fn release(
        &self,
        project_code: i64,
        code: i64,
        state: ReleaseState,
    ) -> Result<(), GatewayError> {
        let http = &self.http_client;
        self.authed(|credential| async move {
            http.release_process_definition(project_code, code, state, &credential)
                .await
        })
        .await
    }
}

#[async_trait]
impl SchedulerExt for DolphinScheduler {
    async fn create_or_update(&self, workflow: &EngineWorkflow) -> Result<i64, GatewayError> {
        let project_code = self.project_code(&workflow.project).await?;
        let datasources = self.resolve_datasources(workflow).await?;
        let form = DefinitionForm::build(workflow, &datasources)?;
        let form = &form;
        let http = &self.http_client;

        let code = match workflow.code {
            None => {
                self.authed(|credential| async move {
                    http.create_process_definition(project_code, form, &credential)
                        .await
                })
                .await?
            }
            Some(code) => {
                // the scheduler refuses to edit online definitions
                if let Err(e) = self.release(project_code, code, ReleaseState::Offline).await {
                    debug!("Taking workflow {} offline before update failed: {}", code, e);
                }
                self.authed(|credential| async move {
                    http.update_process_definition(project_code, code, form, &credential)
                        .await
                })
                .await?;
                code
            }
        };

        if workflow.release_state == ReleaseState::Online {
            self.release(project_code, code, ReleaseState::Online).await?;
        }

        Ok(code)
    }

    async fn start(&self, command: &StartCommand) -> Result<(), GatewayError> {
        let project_code = self.project_code(&command.project).await?;
        let http = &self.http_client;
        info!(
            "Starting workflow {} in project {} as {}",
            command.workflow_code, command.project, command.user
        );
        self.authed(|credential| async move {
            http.start_process_instance(project_code, command, &credential)
                .await
        })
        .await
    }

    async fn query_workflow_code(
        &self,
        user: &str,
        project: &str,
        name: &str,
    ) -> Result<i64, GatewayError> {
        debug!("Looking up workflow {} in {} for {}", name, project, user);
        let project_code = self.project_code(project).await?;
        let http = &self.http_client;
        self.authed(|credential| async move {
            http.query_process_definition_by_name(project_code, name, &credential)
                .await
        })
        .await?
        .ok_or_else(|| {
            GatewayError::NotFound(format!(
                "Workflow {} not found in project {}",
                name, project
            ))
        })
    }

    async fn query_project(
        &self,
        user: &str,
        project: &str,
    ) -> Result<ProjectRecord, GatewayError> {
        debug!("Looking up project {} for {}", project, user);
        self.find_project(project).await
    }

    async fn delete_workflow(&self, project: &str, code: i64) -> Result<(), GatewayError> {
        let project_code = self.project_code(project).await?;
        if let Err(e) = self.release(project_code, code, ReleaseState::Offline).await {
            debug!("Taking workflow {} offline before delete failed: {}", code, e);
        }
        let http = &self.http_client;
        self.authed(|credential| async move {
            http.delete_process_definition(project_code, code, &credential)
                .await
        })
        .await
    }

    async fn list_instances(
        &self,
        project: &str,
        query: &InstanceQuery,
    ) -> Result<InstancePage, GatewayError> {
        let project_code = self.project_code(project).await?;
        let http = &self.http_client;
        self.authed(|credential| async move {
            http.list_workflow_instances(project_code, query, &credential)
                .await
        })
        .await
    }

    async fn get_instance(&self, project: &str, instance_id: i64) -> Result<Value, GatewayError> {
        let project_code = self.project_code(project).await?;
        let http = &self.http_client;
        self.authed(|credential| async move {
            http.get_workflow_instance(project_code, instance_id, &credential)
                .await
        })
        .await
    }

    async fn list_task_instances(
        &self,
        project: &str,
        instance_id: i64,
    ) -> Result<Vec<TaskInstanceRecord>, GatewayError> {
        let project_code = self.project_code(project).await?;
        let http = &self.http_client;
        self.authed(|credential| async move {
            http.list_task_instances(project_code, instance_id, &credential)
                .await
        })
        .await
    }

    async fn task_log(&self, task_instance_id: i64) -> Result<String, GatewayError> {
        let http = &self.http_client;
        let limit = self.log_limit;
        self.authed(|credential| async move {
            http.task_instance_log(task_instance_id, limit, &credential)
                .await
        })
        .await
    }

    async fn list_datasources(
        &self,
        filter: &DatasourceFilter,
    ) -> Result<Vec<DatasourceRecord>, GatewayError> {
        let http = &self.http_client;
        let keyword = filter.keyword.as_deref();
        let datasource_type = filter.datasource_type.as_deref();
        self.authed(|credential| async move {
            http.list_datasources(keyword, datasource_type, DATASOURCE_PAGE_SIZE, &credential)
                .await
        })
        .await
    }
}
