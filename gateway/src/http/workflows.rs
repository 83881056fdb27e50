//! Workflow definition API client

use std::collections::HashMap;

use dolphin_api::{
    workflow_code_of, DatasourceRecord, TaskDefinitionJson, TaskLocationJson,
    TaskRelationJson,
};
use serde::Serialize;
use serde_json::json;

use crate::authn::credential::Credential;
use crate::errors::GatewayError;
use crate::http::client::HttpClient;
use crate::models::workflow::{EngineTask, EngineWorkflow, ReleaseState, TaskKind};
use crate::scheduler::StartCommand;

/// Form body of a create/update call
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionForm {
    pub name: String,
    pub description: String,
    pub tenant_code: String,
    pub execution_type: String,
    pub task_definition_json: String,
    pub task_relation_json: String,
    pub locations: String,
    pub global_params: String,
    pub timeout: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_state: Option<String>,
}

impl DefinitionForm {
    /// Serialize a workflow. SQL tasks are bound to the datasource records in
    /// `datasources`, keyed by name.
    pub fn build(
        workflow: &EngineWorkflow,
        datasources: &HashMap<String, DatasourceRecord>,
    ) -> Result<Self, GatewayError> {
        let tasks = workflow
            .tasks()
            .map(|task| task_definition(task, datasources))
            .collect::<Result<Vec<_>, _>>()?;

        let version_of = |code: i64| workflow.task(code).map(|t| t.version).unwrap_or(0);
        let relations: Vec<TaskRelationJson> = workflow
            .edges()
            .into_iter()
            .map(|(pre, post)| TaskRelationJson::new((pre, version_of(pre)), (post, version_of(post))))
            .collect();

        let locations: Vec<TaskLocationJson> = workflow
            .locations
            .iter()
            .map(|l| TaskLocationJson {
                task_code: l.task_code,
                x: l.x,
                y: l.y,
            })
            .collect();

        Ok(Self {
            name: workflow.name.clone(),
            description: workflow.description.clone(),
            tenant_code: workflow.tenant.clone(),
            execution_type: workflow.execution_type.as_str().to_string(),
            task_definition_json: serde_json::to_string(&tasks)?,
            task_relation_json: serde_json::to_string(&relations)?,
            locations: serde_json::to_string(&locations)?,
            global_params: "[]".to_string(),
            timeout: 0,
            release_state: None,
        })
    }
}

fn task_definition(
    task: &EngineTask,
    datasources: &HashMap<String, DatasourceRecord>,
) -> Result<TaskDefinitionJson, GatewayError> {
    let task_params = match &task.kind {
        TaskKind::Shell { raw_script } => json!({
            "localParams": [],
            "resourceList": [],
            "rawScript": raw_script,
        }),
        TaskKind::Sql {
            datasource_name,
            sql,
            sql_type,
        } => {
            let datasource = datasources.get(datasource_name).ok_or_else(|| {
                GatewayError::NotFound(format!(
                    "Datasource {} not found for task {}",
                    datasource_name, task.name
                ))
            })?;
            json!({
                "localParams": [],
                "resourceList": [],
                "type": datasource.datasource_type,
                "datasource": datasource.id,
                "sql": sql,
                "sqlType": sql_type.code(),
                "preStatements": [],
                "postStatements": [],
                "displayRows": 10,
            })
        }
    };

    Ok(TaskDefinitionJson {
        code: task.code,
        version: task.version,
        name: task.name.clone(),
        description: task.description.clone(),
        task_type: task.kind.task_type().to_string(),
        task_params,
        flag: if task.enabled { "YES" } else { "NO" }.to_string(),
        task_priority: task.priority.clone(),
        worker_group: task.worker_group.clone(),
        environment_code: task.environment_code.unwrap_or(-1),
        fail_retry_times: task.fail_retry_times,
        fail_retry_interval: task.fail_retry_interval,
        timeout_flag: if task.timeout_minutes > 0 { "OPEN" } else { "CLOSE" }.to_string(),
        timeout_notify_strategy: (task.timeout_minutes > 0).then(|| {
            task.timeout_notify_strategy
                .clone()
                .unwrap_or_else(|| "WARN".to_string())
        }),
        timeout: task.timeout_minutes,
        delay_time: 0,
    })
}

/// Form body of a start call
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct StartForm<'a> {
    process_definition_code: i64,
    failure_strategy: &'a str,
    warning_type: &'a str,
    warning_group_id: i64,
    exec_type: &'a str,
    run_mode: &'a str,
    process_instance_priority: &'a str,
    worker_group: &'a str,
    tenant_code: &'a str,
    dry_run: i32,
    schedule_time: &'a str,
}

impl HttpClient {
    /// Create a workflow definition, returning its code
    pub async fn create_process_definition(
        &self,
        project_code: i64,
        form: &DefinitionForm,
        credential: &Credential,
    ) -> Result<i64, GatewayError> {
        let path = format!("/projects/{}/process-definition", project_code);
        let data = self.post_form(&path, form, credential).await?;
        workflow_code_of(&data).ok_or_else(|| {
            GatewayError::UpstreamError(format!(
                "Create of workflow {} returned no code",
                form.name
            ))
        })
    }

    /// Replace a workflow definition
    pub async fn update_process_definition(
        &self,
        project_code: i64,
        code: i64,
        form: &DefinitionForm,
        credential: &Credential,
    ) -> Result<(), GatewayError> {
        let path = format!("/projects/{}/process-definition/{}", project_code, code);
        self.put_form(&path, form, credential).await?;
        Ok(())
    }

    /// Set a workflow definition online or offline
    pub async fn release_process_definition(
        &self,
        project_code: i64,
        code: i64,
        state: ReleaseState,
        credential: &Credential,
    ) -> Result<(), GatewayError> {
        let path = format!(
            "/projects/{}/process-definition/{}/release",
            project_code, code
        );
        self.post_form(&path, &[("releaseState", state.as_str())], credential)
            .await?;
        Ok(())
    }

    /// Look up a workflow code by name
    pub async fn query_process_definition_by_name(
        &self,
        project_code: i64,
        name: &str,
        credential: &Credential,
    ) -> Result<Option<i64>, GatewayError> {
        let path = format!(
            "/projects/{}/process-definition/query-by-name",
            project_code
        );
        let data = self
            .get(&path, &[("name", name.to_string())], credential)
            .await?;
        Ok(workflow_code_of(&data))
    }

    /// Delete a workflow definition
    pub async fn delete_process_definition(
        &self,
        project_code: i64,
        code: i64,
        credential: &Credential,
    ) -> Result<(), GatewayError> {
        let path = format!("/projects/{}/process-definition/{}", project_code, code);
        self.delete(&path, credential).await?;
        Ok(())
    }

    /// Start a workflow instance. The scheduler does not return its id.
    pub async fn start_process_instance(
        &self,
        project_code: i64,
        command: &StartCommand,
        credential: &Credential,
    ) -> Result<(), GatewayError> {
        let path = format!(
            "/projects/{}/executors/start-process-instance",
            project_code
        );
        let form = StartForm {
            process_definition_code: command.workflow_code,
            failure_strategy: "CONTINUE",
            warning_type: "NONE",
            warning_group_id: 0,
            exec_type: "START_PROCESS",
            run_mode: "RUN_MODE_SERIAL",
            process_instance_priority: "MEDIUM",
            worker_group: &command.worker_group,
            tenant_code: &command.tenant,
            dry_run: 0,
            schedule_time: "",
        };
        self.post_form(&path, &form, credential).await?;
        Ok(())
    }
}
