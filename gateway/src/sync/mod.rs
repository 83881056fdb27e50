pub mod graph;
pub mod normalize;
pub mod syncer;

use crate::models::workflow::{ExecutionType, ReleaseState};

/// Values applied when a request leaves a field unset
#[derive(Debug, Clone)]
pub struct WorkflowDefaults {
    pub project: String,
    pub user: String,
    pub tenant: String,
    pub worker_group: String,
    pub execution_type: ExecutionType,
    pub release_state: ReleaseState,
}

impl Default for WorkflowDefaults {
    fn default() -> Self {
        Self {
            project: "opendataworks".to_string(),
            user: "admin".to_string(),
            tenant: "default".to_string(),
            worker_group: "default".to_string(),
            execution_type: ExecutionType::Parallel,
            release_state: ReleaseState::Offline,
        }
    }
}

impl WorkflowDefaults {
    /// Requested value, or the default when missing or blank
    pub fn or_default<'a>(requested: Option<&'a str>, default: &'a str) -> &'a str {
        match requested.map(str::trim) {
            Some(value) if !value.is_empty() => value,
            _ => default,
        }
    }

    pub fn project<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        Self::or_default(requested, &self.project)
    }

    pub fn user<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        Self::or_default(requested, &self.user)
    }
}
