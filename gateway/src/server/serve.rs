//! HTTP server setup

use std::future::Future;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app::options::ServerOptions;
use crate::errors::GatewayError;
use crate::server::handlers::{
    datasources_handler, delete_handler, ensure_handler, get_instance_handler, health_handler,
    instance_by_id_handler, instance_log_handler, list_instances_handler, query_project_handler,
    release_handler, start_handler, sync_handler, version_handler,
};
use crate::server::state::ServerState;

/// Build the router
pub fn router(state: Arc<ServerState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health and version
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        // Workflows
        .route("/api/v1/workflows/ensure", post(ensure_handler))
        .route("/api/v1/workflows/{code}/sync", post(sync_handler))
        .route("/api/v1/workflows/{code}/release", post(release_handler))
        .route("/api/v1/workflows/{code}/start", post(start_handler))
        .route("/api/v1/workflows/{code}/delete", post(delete_handler))
        // Instances
        .route(
            "/api/v1/workflows/{code}/instances/get",
            post(get_instance_handler),
        )
        .route(
            "/api/v1/workflows/{code}/instances/list",
            post(list_instances_handler),
        )
        .route(
            "/api/v1/workflows/{code}/instances/log",
            post(instance_log_handler),
        )
        .route(
            "/api/v1/workflows/{code}/instances/{instance_id}",
            post(instance_by_id_handler),
        )
        // Projects and datasources
        .route("/api/v1/projects/query", post(query_project_handler))
        .route("/api/v1/dolphin/datasources", get(datasources_handler))
        // State and middleware
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server
pub async fn serve(
    options: &ServerOptions,
    state: Arc<ServerState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<Result<(), GatewayError>>, GatewayError> {
    let app = router(state);

    let addr = format!("{}:{}", options.host, options.port);
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| GatewayError::ServerError(e.to_string()))?;

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| GatewayError::ServerError(e.to_string()))
    });

    Ok(handle)
}
