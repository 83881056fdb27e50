//! Session manager for scheduler authentication

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::authn::credential::Credential;
use crate::errors::GatewayError;
use crate::http::client::HttpClient;

/// Session manager trait for testability
#[async_trait]
pub trait SessionManagerExt: Send + Sync {
    /// Get the credential to send, logging in if needed
    async fn get_credential(&self) -> Result<Credential, GatewayError>;

    /// Drop the cached session so the next call logs in again
    async fn invalidate(&self);
}

/// Session manager implementation.
///
/// Uses the static API token when one is configured, otherwise logs in with
/// the configured user and caches the session id.
pub struct SessionManager {
    http_client: Arc<HttpClient>,
    user_name: String,
    user_password: SecretString,
    api_token: Option<Arc<SecretString>>,
    cached_session: RwLock<Option<Arc<SecretString>>>,
}

impl SessionManager {
    /// Create a new session manager
    pub fn new(
        http_client: Arc<HttpClient>,
        user_name: String,
        user_password: SecretString,
        api_token: Option<SecretString>,
    ) -> Self {
        Self {
            http_client,
            user_name,
            user_password,
            api_token: api_token
                .filter(|token| !token.expose_secret().trim().is_empty())
                .map(Arc::new),
            cached_session: RwLock::new(None),
        }
    }

    async fn login(&self) -> Result<Arc<SecretString>, GatewayError> {
        let mut cached = self.cached_session.write().await;
        // another caller may have logged in while we waited for the lock
        if let Some(session) = cached.as_ref() {
            return Ok(session.clone());
        }

        info!("Logging in to the scheduler as {}", self.user_name);
        let session_id = self
            .http_client
            .login(&self.user_name, &self.user_password)
            .await?;
        let session = Arc::new(SecretString::from(session_id));
        *cached = Some(session.clone());

        Ok(session)
    }
}

#[async_trait]
impl SessionManagerExt for SessionManager {
    async fn get_credential(&self) -> Result<Credential, GatewayError> {
        if let Some(token) = &self.api_token {
            return Ok(Credential::Token(token.clone()));
        }

        {
            let cached = self.cached_session.read().await;
            if let Some(session) = cached.as_ref() {
                return Ok(Credential::Session(session.clone()));
            }
        }

        self.login().await.map(Credential::Session)
    }

    async fn invalidate(&self) {
        debug!("Invalidating scheduler session");
        let mut cached = self.cached_session.write().await;
        *cached = None;
    }
}
