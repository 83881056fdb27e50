//! HTTP request handlers

use std::future::Future;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use gateway_api::{
    ApiResponse, DeleteWorkflowRequest, EnsureWorkflowRequest, GetInstanceLogRequest,
    GetInstanceRequest, HealthResponse, ListInstancesRequest, QueryProjectRequest,
    ReleaseWorkflowRequest, StartWorkflowRequest, SyncWorkflowRequest, VersionResponse,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::errors::GatewayError;
use crate::scheduler::DatasourceFilter;
use crate::server::state::ServerState;
use crate::utils::version_info;

type HandlerResult = Result<Json<ApiResponse>, GatewayError>;

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    let version = version_info();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "flowgate".to_string(),
        version: version.version,
    })
}

/// Version handler
pub async fn version_handler() -> impl IntoResponse {
    let version = version_info();
    Json(VersionResponse {
        version: version.version,
        git_hash: version.git_hash,
        build_time: version.build_time,
    })
}

pub async fn ensure_handler(State(state): State<Arc<ServerState>>, body: Bytes) -> HandlerResult {
    let request: EnsureWorkflowRequest = parse_required(&body)?;
    respond(&state, "ensure", state.gateway.ensure_workflow(request)).await
}

pub async fn sync_handler(
    State(state): State<Arc<ServerState>>,
    Path(code): Path<String>,
    body: Bytes,
) -> HandlerResult {
    let handle = parse_code(&code)?;
    let request: SyncWorkflowRequest = parse_required(&body)?;
    respond(&state, "sync", state.gateway.synchronize(handle, request)).await
}

pub async fn release_handler(
    State(state): State<Arc<ServerState>>,
    Path(code): Path<String>,
    body: Bytes,
) -> HandlerResult {
    let handle = parse_code(&code)?;
    let request: ReleaseWorkflowRequest = parse_required(&body)?;
    respond(&state, "release", state.gateway.release(handle, request)).await
}

pub async fn start_handler(
    State(state): State<Arc<ServerState>>,
    Path(code): Path<String>,
    body: Bytes,
) -> HandlerResult {
    let handle = parse_code(&code)?;
    let request: StartWorkflowRequest = parse_optional(&body)?;
    let response = with_timeout(&state, "start", state.gateway.start(handle, request)).await?;
    let message = response.message.clone();
    Ok(Json(ApiResponse::ok_with_message(
        serde_json::to_value(response)?,
        message,
    )))
}

pub async fn delete_handler(
    State(state): State<Arc<ServerState>>,
    Path(code): Path<String>,
    body: Bytes,
) -> HandlerResult {
    let handle = parse_code(&code)?;
    let request: DeleteWorkflowRequest = parse_optional(&body)?;
    respond(&state, "delete", state.gateway.delete_workflow(handle, request)).await
}

pub async fn get_instance_handler(
    State(state): State<Arc<ServerState>>,
    Path(code): Path<String>,
    body: Bytes,
) -> HandlerResult {
    let handle = parse_code(&code)?;
    let request: GetInstanceRequest = parse_optional(&body)?;
    respond(&state, "get instance", state.gateway.get_instance(handle, request)).await
}

pub async fn instance_by_id_handler(
    State(state): State<Arc<ServerState>>,
    Path((code, instance_id)): Path<(String, String)>,
    body: Bytes,
) -> HandlerResult {
    let handle = parse_code(&code)?;
    let instance_id = parse_code(&instance_id)?;
    let mut request: GetInstanceRequest = parse_optional(&body)?;
    request.instance_id = Some(instance_id);
    respond(&state, "get instance", state.gateway.get_instance(handle, request)).await
}

pub async fn list_instances_handler(
    State(state): State<Arc<ServerState>>,
    Path(code): Path<String>,
    body: Bytes,
) -> HandlerResult {
    let handle = parse_code(&code)?;
    let request: ListInstancesRequest = parse_optional(&body)?;
    respond(&state, "list instances", state.gateway.list_instances(handle, request)).await
}

pub async fn instance_log_handler(
    State(state): State<Arc<ServerState>>,
    Path(code): Path<String>,
    body: Bytes,
) -> HandlerResult {
    let handle = parse_code(&code)?;
    let request: GetInstanceLogRequest = parse_required(&body)?;
    respond(&state, "instance log", state.gateway.get_instance_log(handle, request)).await
}

pub async fn query_project_handler(
    State(state): State<Arc<ServerState>>,
    body: Bytes,
) -> HandlerResult {
    let request: QueryProjectRequest = parse_required(&body)?;
    respond(&state, "query project", state.gateway.query_project(request)).await
}

/// Datasource listing query string
#[derive(Debug, Default, Deserialize)]
pub struct DatasourceParams {
    #[serde(default, rename = "type")]
    pub datasource_type: Option<String>,
    #[serde(default)]
    pub keyword: Option<String>,
}

pub async fn datasources_handler(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<DatasourceParams>,
) -> HandlerResult {
    let filter = DatasourceFilter {
        datasource_type: params.datasource_type,
        keyword: params.keyword,
    };
    respond(&state, "list datasources", state.gateway.list_datasources(filter)).await
}

// ================================= HELPERS ====================================== //

async fn with_timeout<T, F>(state: &ServerState, operation: &str, fut: F) -> Result<T, GatewayError>
where
    F: Future<Output = Result<T, GatewayError>>,
{
    tokio::time::timeout(state.request_timeout, fut)
        .await
        .map_err(|_| {
            GatewayError::Timeout(format!(
                "{} did not complete within {:?}",
                operation, state.request_timeout
            ))
        })?
}

async fn respond<T, F>(state: &ServerState, operation: &str, fut: F) -> HandlerResult
where
    T: Serialize,
    F: Future<Output = Result<T, GatewayError>>,
{
    let result = with_timeout(state, operation, fut).await?;
    Ok(Json(ApiResponse::ok(serde_json::to_value(result)?)))
}

fn parse_code(raw: &str) -> Result<i64, GatewayError> {
    raw.trim()
        .parse()
        .map_err(|_| GatewayError::ValidationError(format!("Invalid numeric code: {}", raw)))
}

fn parse_required<T: DeserializeOwned>(body: &Bytes) -> Result<T, GatewayError> {
    serde_json::from_slice(body)
        .map_err(|e| GatewayError::ValidationError(format!("Invalid request body: {}", e)))
}

fn parse_optional<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, GatewayError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    parse_required(body)
}
