//! Instance API client
//!
//! Instance endpoints were renamed from `process-instances` to
//! `workflow-instances` across scheduler versions, so every call tries both.

use dolphin_api::{extract_records, extract_total, TaskInstanceRecord};
use serde_json::Value;
use tracing::{debug, warn};

use crate::authn::credential::Credential;
use crate::errors::GatewayError;
use crate::http::client::HttpClient;
use crate::scheduler::{InstanceQuery, InstancePage};

/// Instance endpoint names, in the order they are tried
pub const INSTANCE_ENDPOINTS: [&str; 2] = ["workflow-instances", "process-instances"];

impl HttpClient {
    /// List workflow instances.
    ///
    /// The first endpoint that answers with a non-empty record list wins. A
    /// successful but empty answer is kept as the result if no later endpoint
    /// does better.
    pub async fn list_workflow_instances(
        &self,
        project_code: i64,
        query: &InstanceQuery,
        credential: &Credential,
    ) -> Result<InstancePage, GatewayError> {
        let params = listing_params(query);
        let mut fallback: Option<InstancePage> = None;
        let mut last_err: Option<GatewayError> = None;

        for endpoint in INSTANCE_ENDPOINTS {
            let path = format!("/projects/{}/{}", project_code, endpoint);
            match self.get(&path, &params, credential).await {
                Ok(data) => match extract_records(&data) {
                    Some(records) if !records.is_empty() => {
                        let total = extract_total(&data, &records);
                        return Ok(InstancePage { total, records });
                    }
                    Some(_) => {
                        debug!("{} returned no instances", endpoint);
                        fallback.get_or_insert_with(InstancePage::default);
                    }
                    None => {
                        debug!("{} returned no recognizable record list", endpoint);
                    }
                },
                Err(e @ GatewayError::AuthError(_)) => return Err(e),
                Err(e) => {
                    debug!("Listing instances via {} failed: {}", endpoint, e);
                    last_err = Some(e);
                }
            }
        }

        match (fallback, last_err) {
            (Some(page), _) => Ok(page),
            (None, Some(e)) => Err(e),
            (None, None) => Ok(InstancePage::default()),
        }
    }

    /// Get one workflow instance
    pub async fn get_workflow_instance(
        &self,
        project_code: i64,
        instance_id: i64,
        credential: &Credential,
    ) -> Result<Value, GatewayError> {
        let mut last_err = None;

        for endpoint in INSTANCE_ENDPOINTS {
            let path = format!("/projects/{}/{}/{}", project_code, endpoint, instance_id);
            match self.get(&path, &[], credential).await {
                Ok(data) if data.is_object() => return Ok(data),
                Ok(_) => debug!("{} returned an empty instance", endpoint),
                Err(e @ GatewayError::AuthError(_)) => return Err(e),
                Err(e) => {
                    debug!("Fetching instance via {} failed: {}", endpoint, e);
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            GatewayError::NotFound(format!("Instance {} not found", instance_id))
        }))
    }

    /// List the task instances of a workflow instance
    pub async fn list_task_instances(
        &self,
        project_code: i64,
        instance_id: i64,
        credential: &Credential,
    ) -> Result<Vec<TaskInstanceRecord>, GatewayError> {
        let path = format!("/projects/{}/task-instances", project_code);
        let params = [
            ("pageNo", "1".to_string()),
            ("pageSize", "100".to_string()),
            ("processInstanceId", instance_id.to_string()),
            ("workflowInstanceId", instance_id.to_string()),
        ];
        let data = self.get(&path, &params, credential).await?;

        let records = extract_records(&data).unwrap_or_default();
        Ok(records
            .into_iter()
            .filter_map(|record| match serde_json::from_value(record) {
                Ok(task) => Some(task),
                Err(e) => {
                    warn!("Skipping malformed task instance: {}", e);
                    None
                }
            })
            .collect())
    }

    /// Fetch the log of a task instance
    pub async fn task_instance_log(
        &self,
        task_instance_id: i64,
        limit: u32,
        credential: &Credential,
    ) -> Result<String, GatewayError> {
        let params = [
            ("taskInstanceId", task_instance_id.to_string()),
            ("skipLineNum", "0".to_string()),
            ("limit", limit.to_string()),
        ];
        let data = self.get("/log/detail", &params, credential).await?;

        Ok(match data {
            Value::String(log) => log,
            Value::Null => String::new(),
            other => other
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| other.to_string()),
        })
    }
}

fn listing_params(query: &InstanceQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("pageNo", query.page_no.max(1).to_string()),
        ("pageSize", query.page_size.max(1).to_string()),
    ];
    if query.workflow_code != 0 {
        params.push(("workflowDefinitionCode", query.workflow_code.to_string()));
        params.push(("processDefinitionCode", query.workflow_code.to_string()));
    }
    let optional = [
        ("searchVal", &query.search),
        ("startDate", &query.start_date),
        ("endDate", &query.end_date),
        ("stateType", &query.state),
    ];
    for (key, value) in optional {
        if let Some(value) = value.as_ref().filter(|v| !v.trim().is_empty()) {
            params.push((key, value.clone()));
        }
    }
    params
}
