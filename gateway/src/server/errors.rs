//! Error responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use gateway_api::ApiResponse;
use tracing::{error, warn};

use crate::errors::{ErrorKind, GatewayError};

impl ErrorKind {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Upstream => StatusCode::BAD_GATEWAY,
            ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        match kind {
            ErrorKind::Validation | ErrorKind::NotFound => warn!("Request rejected: {}", self),
            _ => error!("Request failed: {}", self),
        }

        let body = ApiResponse::fail(kind.as_code(), self.to_string());
        (kind.status_code(), Json(body)).into_response()
    }
}
