//! Scheduler credentials

use std::sync::Arc;

use reqwest::{header, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};

/// How a request authenticates against the scheduler
#[derive(Clone)]
pub enum Credential {
    /// Static access token, sent as the `token` header
    Token(Arc<SecretString>),
    /// Session obtained from `POST /login`
    Session(Arc<SecretString>),
}

impl Credential {
    pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Credential::Token(token) => request.header("token", token.expose_secret()),
            Credential::Session(session_id) => {
                let session_id = session_id.expose_secret();
                request
                    .header("sessionId", session_id)
                    .header(header::COOKIE, format!("sessionId={}", session_id))
            }
        }
    }

    pub fn is_session(&self) -> bool {
        matches!(self, Credential::Session(_))
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::Token(_) => f.write_str("Credential::Token([REDACTED])"),
            Credential::Session(_) => f.write_str("Credential::Session([REDACTED])"),
        }
    }
}
