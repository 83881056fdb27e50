//! Workflow models
//!
//! The engine-side representation of a workflow: what the gateway hands to the
//! scheduler after normalizing the caller's payload.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use gateway_api::TaskLocationPayload;
use serde::{Deserialize, Serialize};

use crate::errors::GatewayError;

/// Whether a workflow definition may be started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReleaseState {
    Online,
    Offline,
}

impl ReleaseState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseState::Online => "ONLINE",
            ReleaseState::Offline => "OFFLINE",
        }
    }
}

impl std::str::FromStr for ReleaseState {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ONLINE" => Ok(ReleaseState::Online),
            "OFFLINE" => Ok(ReleaseState::Offline),
            _ => Err(GatewayError::ValidationError(
                "releaseState must be ONLINE or OFFLINE".to_string(),
            )),
        }
    }
}

impl fmt::Display for ReleaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How concurrent runs of the same workflow are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionType {
    Parallel,
    SerialWait,
    SerialDiscard,
    SerialPriority,
}

impl ExecutionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionType::Parallel => "PARALLEL",
            ExecutionType::SerialWait => "SERIAL_WAIT",
            ExecutionType::SerialDiscard => "SERIAL_DISCARD",
            ExecutionType::SerialPriority => "SERIAL_PRIORITY",
        }
    }
}

impl std::str::FromStr for ExecutionType {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PARALLEL" => Ok(ExecutionType::Parallel),
            "SERIAL" | "SERIAL_WAIT" => Ok(ExecutionType::SerialWait),
            "SERIAL_DISCARD" => Ok(ExecutionType::SerialDiscard),
            "SERIAL_PRIORITY" => Ok(ExecutionType::SerialPriority),
            other => Err(GatewayError::ValidationError(format!(
                "Unknown execution type: {}",
                other
            ))),
        }
    }
}

/// SQL statement kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SqlType {
    NonQuery,
    Query,
}

impl SqlType {
    pub fn from_code(code: i64) -> Self {
        if code == 1 {
            SqlType::Query
        } else {
            SqlType::NonQuery
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            SqlType::NonQuery => 0,
            SqlType::Query => 1,
        }
    }
}

/// Task-type specific payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TaskKind {
    Shell {
        raw_script: String,
    },
    /// The datasource is referenced by name only; the scheduler resolves its type.
    Sql {
        datasource_name: String,
        sql: String,
        sql_type: SqlType,
    },
}

impl TaskKind {
    pub fn task_type(&self) -> &'static str {
        match self {
            TaskKind::Shell { .. } => "SHELL",
            TaskKind::Sql { .. } => "SQL",
        }
    }
}

/// A task ready for submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineTask {
    pub code: i64,
    pub version: i32,
    pub name: String,
    pub description: String,
    pub kind: TaskKind,
    pub priority: String,
    pub worker_group: String,
    pub environment_code: Option<i64>,
    pub fail_retry_times: i32,
    pub fail_retry_interval: i32,
    /// Minutes, 0 when disabled
    pub timeout_minutes: i64,
    pub timeout_notify_strategy: Option<String>,
    pub enabled: bool,
}

/// A workflow definition with its dependency graph
#[derive(Debug, Clone, PartialEq)]
pub struct EngineWorkflow {
    /// Existing scheduler code, `None` to create
    pub code: Option<i64>,
    pub name: String,
    pub project: String,
    pub description: String,
    pub user: String,
    pub tenant: String,
    pub worker_group: String,
    pub execution_type: ExecutionType,
    pub release_state: ReleaseState,
    pub locations: Vec<TaskLocationPayload>,
    tasks: BTreeMap<i64, EngineTask>,
    upstreams: BTreeMap<i64, BTreeSet<i64>>,
}

impl EngineWorkflow {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        code: Option<i64>,
        name: String,
        project: String,
        description: String,
        user: String,
        tenant: String,
        worker_group: String,
        execution_type: ExecutionType,
        release_state: ReleaseState,
    ) -> Self {
        Self {
            code,
            name,
            project,
            description,
            user,
            tenant,
            worker_group,
            execution_type,
            release_state,
            locations: Vec::new(),
            tasks: BTreeMap::new(),
            upstreams: BTreeMap::new(),
        }
    }

    /// Add a task, returning false if its code is already taken
    pub fn add_task(&mut self, task: EngineTask) -> bool {
        if self.tasks.contains_key(&task.code) {
            return false;
        }
        self.tasks.insert(task.code, task);
        true
    }

    pub fn task(&self, code: i64) -> Option<&EngineTask> {
        self.tasks.get(&code)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &EngineTask> {
        self.tasks.values()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Declare `upstream >> downstream`. Both tasks must already be present.
    pub fn link(&mut self, upstream: i64, downstream: i64) -> bool {
        if !self.tasks.contains_key(&upstream) || !self.tasks.contains_key(&downstream) {
            return false;
        }
        self.upstreams.entry(downstream).or_default().insert(upstream);
        true
    }

    /// Every edge in the scheduler's model: one `(pre, post)` per declared
    /// dependency and `(0, post)` for each task without upstreams.
    pub fn edges(&self) -> Vec<(i64, i64)> {
        let mut edges = Vec::new();
        for code in self.tasks.keys() {
            match self.upstreams.get(code) {
                Some(upstreams) if !upstreams.is_empty() => {
                    edges.extend(upstreams.iter().map(|pre| (*pre, *code)));
                }
                _ => edges.push((0, *code)),
            }
        }
        edges
    }
}
