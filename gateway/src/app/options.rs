//! Application configuration options

use std::time::Duration;

use secrecy::SecretString;

use crate::correlate;
use crate::sync::WorkflowDefaults;

/// Main application options
#[derive(Debug)]
pub struct AppOptions {
    /// HTTP server configuration
    pub server: ServerOptions,

    /// Scheduler connection
    pub scheduler: SchedulerOptions,

    /// Values for fields a request leaves unset
    pub workflow_defaults: WorkflowDefaults,

    /// Instance correlation
    pub correlator: correlate::Options,

    /// Maximum cached definitions, 0 for no limit
    pub definition_cache_capacity: usize,

    /// Upper bound on handling one request
    pub request_timeout: Duration,

    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            server: ServerOptions::default(),
            scheduler: SchedulerOptions::default(),
            workflow_defaults: WorkflowDefaults::default(),
            correlator: correlate::Options::default(),
            definition_cache_capacity: 1024,
            request_timeout: Duration::from_secs(60),
            max_shutdown_delay: Duration::from_secs(30),
        }
    }
}

/// Scheduler connection options
#[derive(Debug)]
pub struct SchedulerOptions {
    /// REST API base URL
    pub base_url: String,

    /// Static access token; when set no login happens
    pub api_token: Option<SecretString>,

    /// Login user
    pub user_name: String,

    /// Login password
    pub user_password: SecretString,

    /// Timeout of a single REST call
    pub http_timeout: Duration,

    /// Lines fetched per task log
    pub log_limit: u32,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:12345/dolphinscheduler".to_string(),
            api_token: None,
            user_name: "admin".to_string(),
            user_password: SecretString::from("dolphinscheduler123".to_string()),
            http_timeout: Duration::from_secs(10),
            log_limit: 1000,
        }
    }
}

/// HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}
