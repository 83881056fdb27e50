//! HTTP client implementation

use std::time::Duration;

use dolphin_api::{Envelope, LoginData};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error};

use crate::authn::credential::Credential;
use crate::errors::GatewayError;

/// Query string pairs
pub type Query<'a> = [(&'a str, String)];

/// HTTP client for the scheduler REST API
pub struct HttpClient {
    client: Client,
    base_url: String,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str, credential: &Credential) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);
        credential.apply(self.client.request(method, url))
    }

    /// Make a GET request and unwrap the envelope
    pub async fn get(
        &self,
        path: &str,
        query: &Query<'_>,
        credential: &Credential,
    ) -> Result<Value, GatewayError> {
        let request = self.request(Method::GET, path, credential).query(query);
        self.execute("GET", path, request).await
    }

    /// Make a form-encoded POST request and unwrap the envelope
    pub async fn post_form<B: Serialize + ?Sized>(
        &self,
        path: &str,
        form: &B,
        credential: &Credential,
    ) -> Result<Value, GatewayError> {
        let request = self.request(Method::POST, path, credential).form(form);
        self.execute("POST", path, request).await
    }

    /// Make a form-encoded PUT request and unwrap the envelope
    pub async fn put_form<B: Serialize + ?Sized>(
        &self,
        path: &str,
        form: &B,
        credential: &Credential,
    ) -> Result<Value, GatewayError> {
        let request = self.request(Method::PUT, path, credential).form(form);
        self.execute("PUT", path, request).await
    }

    /// Make a DELETE request and unwrap the envelope
    pub async fn delete(
        &self,
        path: &str,
        credential: &Credential,
    ) -> Result<Value, GatewayError> {
        let request = self.request(Method::DELETE, path, credential);
        self.execute("DELETE", path, request).await
    }

    /// Log in and return the session id
    pub async fn login(
        &self,
        user_name: &str,
        user_password: &SecretString,
    ) -> Result<String, GatewayError> {
        let url = format!("{}/login", self.base_url);
        debug!("POST {} (login)", url);

        let request = self.client.post(&url).form(&[
            ("userName", user_name),
            ("userPassword", user_password.expose_secret()),
        ]);

        let data = self.execute("POST", "/login", request).await.map_err(|e| match e {
            GatewayError::UpstreamError(msg) | GatewayError::AuthError(msg) => {
                GatewayError::AuthError(format!("Login failed for {}: {}", user_name, msg))
            }
            other => other,
        })?;

        let login: LoginData = serde_json::from_value(data)
            .map_err(|e| GatewayError::AuthError(format!("Login returned no session: {}", e)))?;
        Ok(login.session_id)
    }

    async fn execute(
        &self,
        method: &str,
        path: &str,
        request: RequestBuilder,
    ) -> Result<Value, GatewayError> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(GatewayError::AuthError(format!(
                "{} {} was rejected: {}",
                method, path, status
            )));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("HTTP {} {} failed: {} - {}", method, path, status, body);
            return Err(GatewayError::UpstreamError(format!("{}: {}", status, body)));
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        let envelope: Envelope = serde_json::from_str(&body).map_err(|e| {
            GatewayError::UpstreamError(format!(
                "Malformed response from {} {}: {}",
                method, path, e
            ))
        })?;

        envelope.into_data().map_err(|e| {
            debug!("{} {} returned {}", method, path, e);
            GatewayError::from(e)
        })
    }
}
