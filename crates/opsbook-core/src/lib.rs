//! Opsbook Core
//!
//! Domain types and collaborator traits for the playbook automation
//! engine.
//!
//! This crate provides:
//! - Playbook definitions: condition trees, actions, SLA enforcements
//! - Object snapshots with typed attribute value slots
//! - Execution records and per-action outcomes
//! - Collaborator traits for object, task, playbook, and execution
//!   persistence plus the outbound event sink
//! - The tenant-scoped execution context threaded through every call

pub mod context;
pub mod error;
pub mod execution;
pub mod object;
pub mod playbook;
pub mod store;
pub mod task;

pub use context::ExecutionContext;
pub use error::{EngineError, EngineResult};
pub use execution::{ActionOutcome, ExecutionRecord, ExecutionResult, ExecutionStatus};
pub use object::{Assignment, Attribute, NewObject, ObjectSnapshot, Reservation};
pub use playbook::{
    Action, AssignToUserConfig, ConditionGroup, ConditionNode, ConditionOperator,
    CreateObjectConfig, CreateTaskConfig, Enforcements, LogicalOperator, Playbook, RelativeTime,
    SendNotificationConfig, SetDueDateConfig, SlaSpec, TriggerWebhookConfig,
    UpdateObjectStatusConfig, WebhookMethod,
};
pub use store::{EngineEvent, EventSink, ExecutionStore, ObjectStore, PlaybookStore, TaskStore};
pub use task::{NewTask, TaskPriority, TaskType};
