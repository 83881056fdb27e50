//! Settings loading
//!
//! Settings come from an optional JSON file, then environment overrides. They
//! are read once at startup and turned into [`AppOptions`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};

use crate::app::options::{AppOptions, SchedulerOptions, ServerOptions};
use crate::correlate;
use crate::logs::{LogLevel, LogOptions};
use crate::models::workflow::{ExecutionType, ReleaseState};
use crate::sync::WorkflowDefaults;

/// Gateway settings
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit JSON logs on stdout
    #[serde(default)]
    pub log_json: bool,

    /// Directory for rolling log files
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerSettings,

    /// Scheduler configuration
    #[serde(default)]
    pub dolphin: DolphinSettings,

    /// Request handling configuration
    #[serde(default)]
    pub gateway: GatewaySettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_json: false,
            log_dir: None,
            server: ServerSettings::default(),
            dolphin: DolphinSettings::default(),
            gateway: GatewaySettings::default(),
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Scheduler settings
#[derive(Debug, Deserialize)]
pub struct DolphinSettings {
    /// REST API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Static access token
    #[serde(default, deserialize_with = "de_optional_secret")]
    pub api_token: Option<SecretString>,

    #[serde(default = "default_user_name")]
    pub user_name: String,

    #[serde(default = "default_user_password", deserialize_with = "de_secret")]
    pub user_password: SecretString,

    #[serde(default = "default_tenant")]
    pub tenant: String,

    #[serde(default = "default_project")]
    pub project: String,

    #[serde(default = "default_worker_group")]
    pub worker_group: String,

    #[serde(default = "default_execution_type")]
    pub execution_type: String,

    #[serde(default = "default_release_state")]
    pub release_state: String,

    /// Timeout of a single REST call in seconds
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    /// Lines fetched per task log
    #[serde(default = "default_log_limit")]
    pub log_limit: u32,
}

fn default_base_url() -> String {
    "http://localhost:12345/dolphinscheduler".to_string()
}

fn default_user_name() -> String {
    "admin".to_string()
}

fn default_user_password() -> SecretString {
    SecretString::from("dolphinscheduler123".to_string())
}

fn default_tenant() -> String {
    "default".to_string()
}

fn default_project() -> String {
    "opendataworks".to_string()
}

fn default_worker_group() -> String {
    "default".to_string()
}

fn default_execution_type() -> String {
    "PARALLEL".to_string()
}

fn default_release_state() -> String {
    "OFFLINE".to_string()
}

fn default_http_timeout() -> u64 {
    10
}

fn default_log_limit() -> u32 {
    1000
}

impl Default for DolphinSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_token: None,
            user_name: default_user_name(),
            user_password: default_user_password(),
            tenant: default_tenant(),
            project: default_project(),
            worker_group: default_worker_group(),
            execution_type: default_execution_type(),
            release_state: default_release_state(),
            http_timeout_secs: default_http_timeout(),
            log_limit: default_log_limit(),
        }
    }
}

/// Request handling settings
#[derive(Debug, Clone, Deserialize)]
pub struct GatewaySettings {
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum cached definitions, 0 for no limit
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    #[serde(default = "default_correlation_attempts")]
    pub correlation_attempts: u32,

    #[serde(default = "default_correlation_interval")]
    pub correlation_interval_ms: u64,

    #[serde(default = "default_correlation_page_size")]
    pub correlation_page_size: u32,

    #[serde(default = "default_correlation_budget")]
    pub correlation_budget_secs: u64,

    #[serde(default = "default_max_shutdown_delay")]
    pub max_shutdown_delay_secs: u64,
}

fn default_request_timeout() -> u64 {
    60
}

fn default_cache_capacity() -> usize {
    1024
}

fn default_correlation_attempts() -> u32 {
    8
}

fn default_correlation_interval() -> u64 {
    1000
}

fn default_correlation_page_size() -> u32 {
    20
}

fn default_correlation_budget() -> u64 {
    15
}

fn default_max_shutdown_delay() -> u64 {
    30
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout(),
            cache_capacity: default_cache_capacity(),
            correlation_attempts: default_correlation_attempts(),
            correlation_interval_ms: default_correlation_interval(),
            correlation_page_size: default_correlation_page_size(),
            correlation_budget_secs: default_correlation_budget(),
            max_shutdown_delay_secs: default_max_shutdown_delay(),
        }
    }
}

fn de_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

fn de_optional_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .filter(|s| !s.trim().is_empty())
        .map(SecretString::from))
}

impl Settings {
    /// Load settings from an optional file and the process environment
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut settings = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading settings file {}", path.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("parsing settings file {}", path.display()))?
            }
            None => Settings::default(),
        };

        settings.apply_env(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    /// Apply overrides from a variable lookup
    pub fn apply_env<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(host) = var("DS_SERVICE_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("DS_SERVICE_PORT") {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("DS_SERVICE_PORT is not a port: {}", port))?;
        }
        if let Some(base_url) = var("DS_API_BASE_URL") {
            self.dolphin.base_url = base_url;
        }
        if let Some(token) = var("DS_API_TOKEN") {
            self.dolphin.api_token = Some(SecretString::from(token));
        }
        if let Some(user) = var("PYDS_USER_NAME") {
            self.dolphin.user_name = user;
        }
        if let Some(password) = var("PYDS_USER_PASSWORD") {
            self.dolphin.user_password = SecretString::from(password);
        }
        if let Some(tenant) = var("PYDS_USER_TENANT") {
            self.dolphin.tenant = tenant;
        }
        if let Some(project) = var("PYDS_WORKFLOW_PROJECT") {
            self.dolphin.project = project;
        }
        if let Some(worker_group) = var("PYDS_WORKFLOW_WORKER_GROUP") {
            self.dolphin.worker_group = worker_group;
        }
        if let Some(execution_type) = var("PYDS_WORKFLOW_EXECUTION_TYPE") {
            self.dolphin.execution_type = execution_type;
        }
        if let Some(release_state) = var("PYDS_WORKFLOW_RELEASE_STATE") {
            self.dolphin.release_state = release_state;
        }
        if let Some(capacity) = var("DS_CACHE_CAPACITY") {
            self.gateway.cache_capacity = capacity
                .trim()
                .parse()
                .with_context(|| format!("DS_CACHE_CAPACITY is not a number: {}", capacity))?;
        }
        if let Some(level) = var("LOG_LEVEL") {
            self.log_level = level.parse().map_err(anyhow::Error::msg)?;
        }
        Ok(())
    }

    /// Check the settings are usable
    pub fn validate(&self) -> anyhow::Result<()> {
        let url = url::Url::parse(&self.dolphin.base_url)
            .with_context(|| format!("invalid scheduler base URL {}", self.dolphin.base_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("scheduler base URL must use http or https: {}", url);
        }
        if self.server.port == 0 {
            bail!("server port must not be 0");
        }
        if self.dolphin.project.trim().is_empty() {
            bail!("default project must not be empty");
        }
        if self.dolphin.api_token.is_none() && self.dolphin.user_password.expose_secret().is_empty()
        {
            bail!("either an API token or a user password is required");
        }
        self.dolphin
            .release_state
            .parse::<ReleaseState>()
            .context("invalid default release state")?;
        self.dolphin
            .execution_type
            .parse::<ExecutionType>()
            .context("invalid default execution type")?;
        Ok(())
    }

    pub fn log_options(&self) -> LogOptions {
        LogOptions {
            log_level: self.log_level.clone(),
            json_format: self.log_json,
            log_dir: self.log_dir.clone(),
            ..Default::default()
        }
    }

    /// Convert into application options
    pub fn into_options(self) -> anyhow::Result<AppOptions> {
        let workflow_defaults = WorkflowDefaults {
            project: self.dolphin.project,
            user: self.dolphin.user_name.clone(),
            tenant: self.dolphin.tenant,
            worker_group: self.dolphin.worker_group,
            execution_type: self
                .dolphin
                .execution_type
                .parse()
                .context("invalid default execution type")?,
            release_state: self
                .dolphin
                .release_state
                .parse()
                .context("invalid default release state")?,
        };

        Ok(AppOptions {
            server: ServerOptions {
                host: self.server.host,
                port: self.server.port,
            },
            scheduler: SchedulerOptions {
                base_url: self.dolphin.base_url,
                api_token: self.dolphin.api_token,
                user_name: self.dolphin.user_name,
                user_password: self.dolphin.user_password,
                http_timeout: Duration::from_secs(self.dolphin.http_timeout_secs.max(1)),
                log_limit: self.dolphin.log_limit,
            },
            workflow_defaults,
            correlator: correlate::Options {
                attempts: self.gateway.correlation_attempts.max(1),
                interval: Duration::from_millis(self.gateway.correlation_interval_ms),
                page_size: self.gateway.correlation_page_size.max(1),
                budget: Duration::from_secs(self.gateway.correlation_budget_secs),
            },
            definition_cache_capacity: self.gateway.cache_capacity,
            request_timeout: Duration::from_secs(self.gateway.request_timeout_secs.max(1)),
            max_shutdown_delay: Duration::from_secs(self.gateway.max_shutdown_delay_secs),
        })
    }
}
