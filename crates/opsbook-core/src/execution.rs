//! Execution records and results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::ExecutionContext;

/// Lifecycle status of an execution record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Queued for a retry attempt.
    Pending,
    /// Currently executing.
    Running,
    /// Finished successfully (including skipped runs).
    Completed,
    /// Finished with a terminal error.
    Failed,
}

impl ExecutionStatus {
    /// Whether this status is terminal for the current run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// One run of a playbook against one target object.
///
/// Created in `running` state at the start of an orchestrator run and
/// transitions exactly once to a terminal state per run; retries cycle
/// the same record through `pending` -> `running` again. Never deleted
/// by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Record identifier.
    pub id: String,

    /// Playbook that ran.
    pub playbook_id: String,

    /// Target business object.
    pub object_id: String,

    /// Owning organization (tenant).
    pub organization_id: String,

    /// Property within the organization.
    pub property_id: String,

    /// Lifecycle status.
    pub status: ExecutionStatus,

    /// Number of retry attempts so far.
    pub retry_count: u32,

    /// Structured per-action outcomes, or the simulation report for
    /// committed dry runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<serde_json::Value>,

    /// Terminal error messages.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// When the run reached a terminal state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ExecutionRecord {
    /// Create a new record in `running` state.
    pub fn new(playbook_id: impl Into<String>, object_id: impl Into<String>, ctx: &ExecutionContext) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            playbook_id: playbook_id.into(),
            object_id: object_id.into(),
            organization_id: ctx.organization_id.clone(),
            property_id: ctx.property_id.clone(),
            status: ExecutionStatus::Running,
            retry_count: 0,
            results: None,
            errors: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Transition to `completed` with aggregate results.
    pub fn complete(&mut self, results: serde_json::Value) {
        self.status = ExecutionStatus::Completed;
        self.results = Some(results);
        self.completed_at = Some(Utc::now());
    }

    /// Transition to `failed` with a terminal error.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = ExecutionStatus::Failed;
        self.errors.push(error.into());
        self.completed_at = Some(Utc::now());
    }
}

/// Outcome of a single action within an execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionOutcome {
    /// Action kind tag.
    pub action: String,

    /// Whether the action succeeded.
    pub success: bool,

    /// Action-specific result data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    /// Error message when the action failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionOutcome {
    /// Create a successful outcome.
    pub fn success(action: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            action: action.into(),
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create a failed outcome.
    pub fn failure(action: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Structured result returned to callers.
///
/// `execute_playbook` converts terminal errors into this shape rather
/// than raising them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Whether the run reached `completed`.
    pub success: bool,

    /// Execution record identifier.
    pub execution_id: String,

    /// Whether conditions were unmet and actions were skipped.
    #[serde(default)]
    pub skipped: bool,

    /// Number of actions that executed successfully.
    pub actions_executed: usize,

    /// Per-action outcomes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<ActionOutcome>,

    /// Terminal errors when `success` is false.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl ExecutionResult {
    /// Result for a completed run.
    pub fn completed(execution_id: impl Into<String>, results: Vec<ActionOutcome>) -> Self {
        let actions_executed = results.iter().filter(|r| r.success).count();
        Self {
            success: true,
            execution_id: execution_id.into(),
            skipped: false,
            actions_executed,
            results,
            errors: Vec::new(),
        }
    }

    /// Result for a run whose conditions were unmet. A successful
    /// no-op, not a failure.
    pub fn skipped(execution_id: impl Into<String>) -> Self {
        Self {
            success: true,
            execution_id: execution_id.into(),
            skipped: true,
            actions_executed: 0,
            results: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Result for a failed run.
    pub fn failed(execution_id: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            success: false,
            execution_id: execution_id.into(),
            skipped: false,
            actions_executed: 0,
            results: Vec::new(),
            errors,
        }
    }
}
