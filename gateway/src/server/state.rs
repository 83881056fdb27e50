//! Server state

use std::sync::Arc;
use std::time::Duration;

use crate::services::gateway::Gateway;

/// Server state shared across handlers
pub struct ServerState {
    pub gateway: Arc<Gateway>,
    pub request_timeout: Duration,
}

impl ServerState {
    pub fn new(gateway: Arc<Gateway>, request_timeout: Duration) -> Self {
        Self {
            gateway,
            request_timeout,
        }
    }
}
