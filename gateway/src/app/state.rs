//! Application state management

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tracing::info;

use crate::app::options::AppOptions;
use crate::authn::session_mngr::SessionManager;
use crate::cache::definition::DefinitionCache;
use crate::errors::GatewayError;
use crate::http::client::HttpClient;
use crate::scheduler::dolphin::DolphinScheduler;
use crate::scheduler::SchedulerExt;
use crate::services::gateway::Gateway;

/// Main application state
pub struct AppState {
    /// Scheduler access
    pub scheduler: Arc<dyn SchedulerExt>,

    /// Last synchronized definitions
    pub definition_cache: Arc<DefinitionCache>,

    /// Gateway facade
    pub gateway: Arc<Gateway>,
}

impl AppState {
    /// Initialize application state
    pub fn init(options: &AppOptions) -> Result<Self, GatewayError> {
        info!("Initializing application state...");

        let scheduler_options = &options.scheduler;
        let http_client = Arc::new(HttpClient::new(
            &scheduler_options.base_url,
            scheduler_options.http_timeout,
        )?);

        let sessions = Arc::new(SessionManager::new(
            http_client.clone(),
            scheduler_options.user_name.clone(),
            copy_secret(&scheduler_options.user_password),
            scheduler_options.api_token.as_ref().map(copy_secret),
        ));

        let scheduler: Arc<dyn SchedulerExt> = Arc::new(DolphinScheduler::new(
            http_client,
            sessions,
            scheduler_options.log_limit,
        ));

        Ok(Self::with_scheduler(scheduler, options))
    }

    /// Assemble state around a given scheduler
    pub fn with_scheduler(
        scheduler: Arc<dyn SchedulerExt>,
        options: &AppOptions,
    ) -> Self {
        let definition_cache = Arc::new(DefinitionCache::new(options.definition_cache_capacity));
        if options.definition_cache_capacity == 0 {
            info!("Definition cache is unbounded");
        }

        let gateway = Arc::new(Gateway::new(
            scheduler.clone(),
            definition_cache.clone(),
            Arc::new(options.workflow_defaults.clone()),
            options.correlator.clone(),
        ));

        Self {
            scheduler,
            definition_cache,
            gateway,
        }
    }

    /// Shutdown application state
    pub async fn shutdown(&self) -> Result<(), GatewayError> {
        info!(
            "Shutting down application state, dropping {} cached definitions",
            self.definition_cache.len()
        );
        Ok(())
    }
}

fn copy_secret(secret: &SecretString) -> SecretString {
    SecretString::from(secret.expose_secret().to_string())
}
