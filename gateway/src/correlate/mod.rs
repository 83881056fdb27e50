//! Instance correlation
//!
//! A start command does not return the instance it creates. The correlator
//! records the newest instance id before the start and then polls the listing
//! until a newer one appears.

pub mod poller;
pub mod selection;

use std::time::Duration;

/// Correlator options
#[derive(Debug, Clone)]
pub struct Options {
    /// Maximum polling passes after the start
    pub attempts: u32,

    /// Delay between passes
    pub interval: Duration,

    /// Instances fetched per pass
    pub page_size: u32,

    /// Upper bound on baseline capture plus polling
    pub budget: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            attempts: 8,
            interval: Duration::from_secs(1),
            page_size: 20,
            budget: Duration::from_secs(15),
        }
    }
}

/// Workflow whose instance is being looked for
#[derive(Debug, Clone, Copy)]
pub struct Target<'a> {
    pub project: &'a str,
    pub workflow_code: i64,
    pub workflow_name: &'a str,
}
