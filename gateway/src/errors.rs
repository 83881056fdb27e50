//! Error types for the gateway

use thiserror::Error;

/// Caller-facing classification of a [`GatewayError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Upstream,
    Timeout,
    Internal,
}

impl ErrorKind {
    pub fn as_code(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Upstream => "UPSTREAM_ERROR",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::Internal => "INTERNAL_ERROR",
        }
    }
}

/// Main error type for the gateway
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Scheduler error: {0}")]
    UpstreamError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::ValidationError(_) => ErrorKind::Validation,
            GatewayError::NotFound(_) => ErrorKind::NotFound,
            GatewayError::HttpError(_)
            | GatewayError::JsonError(_)
            | GatewayError::AuthError(_)
            | GatewayError::UpstreamError(_) => ErrorKind::Upstream,
            GatewayError::Timeout(_) => ErrorKind::Timeout,
            GatewayError::IoError(_)
            | GatewayError::ConfigError(_)
            | GatewayError::ServerError(_)
            | GatewayError::ShutdownError(_)
            | GatewayError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<anyhow::Error> for GatewayError {
    fn from(err: anyhow::Error) -> Self {
        GatewayError::Internal(format!("{:#}", err))
    }
}

impl From<dolphin_api::EnvelopeError> for GatewayError {
    fn from(err: dolphin_api::EnvelopeError) -> Self {
        GatewayError::UpstreamError(err.to_string())
    }
}
