//! Playbook definitions: condition trees, actions, SLA enforcements.
//!
//! Rules and actions are closed sum types dispatched on a `type` tag.
//! Unrecognized tags deserialize to the `Unknown` variants so a
//! playbook authored against a newer schema still loads: unknown rules
//! evaluate fail-open, unknown actions fail with a typed error.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::object::Attribute;
use crate::task::{TaskPriority, TaskType};

/// A stored automation definition: trigger conditions plus an ordered
/// action list and an optional SLA block. Immutable per execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playbook {
    /// Playbook identifier.
    pub id: String,

    /// Human-readable name.
    pub name: String,

    /// Whether triggers may fire this playbook.
    #[serde(default = "default_active")]
    pub is_active: bool,

    /// Condition tree. Absence means "always execute".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<ConditionGroup>,

    /// Ordered action list. Order is significant and preserved.
    #[serde(default)]
    pub actions: Vec<Action>,

    /// SLA enforcement block.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enforcements: Option<Enforcements>,
}

fn default_active() -> bool {
    true
}

/// Logical combinator for a condition group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOperator {
    #[default]
    And,
    Or,
}

/// A logical combination of typed comparison rules.
///
/// An empty rule list is vacuously true.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionGroup {
    /// AND / OR combinator.
    #[serde(default)]
    pub operator: LogicalOperator,

    /// Rules evaluated in order.
    #[serde(default)]
    pub rules: Vec<ConditionNode>,
}

/// Comparison operator carried by a condition rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Equals,
    In,
    NotEquals,
    Contains,
    GreaterThan,
    LessThan,
    IsEmpty,
    Before,
    After,
    Between,
    StatusEquals,
    CheckinWithin,
}

/// A single typed comparison rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConditionNode {
    /// Compare the object's workflow status.
    ObjectStatus {
        operator: ConditionOperator,
        value: serde_json::Value,
    },

    /// Compare an attached attribute's resolved value.
    ObjectAttribute {
        field_key: String,
        operator: ConditionOperator,
        #[serde(default)]
        value: serde_json::Value,
    },

    /// Compare "now" to a timestamp or range.
    TimeCondition {
        operator: ConditionOperator,
        value: serde_json::Value,
    },

    /// Compare the linked reservation's status or check-in proximity.
    ReservationStatus {
        operator: ConditionOperator,
        #[serde(default)]
        value: serde_json::Value,
    },

    /// Rule type from a newer schema; evaluates fail-open.
    #[serde(other)]
    Unknown,
}

impl ConditionNode {
    /// Rule kind tag, for reports and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ObjectStatus { .. } => "object_status",
            Self::ObjectAttribute { .. } => "object_attribute",
            Self::TimeCondition { .. } => "time_condition",
            Self::ReservationStatus { .. } => "reservation_status",
            Self::Unknown => "unknown",
        }
    }
}

/// One typed, independently-failing side-effecting step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    CreateObject(CreateObjectConfig),
    UpdateObjectStatus(UpdateObjectStatusConfig),
    SetDueDate(SetDueDateConfig),
    AssignToUser(AssignToUserConfig),
    CreateTask(CreateTaskConfig),
    SendNotification(SendNotificationConfig),
    TriggerWebhook(TriggerWebhookConfig),

    /// Action type from a newer schema; fails with a typed error.
    #[serde(other)]
    Unknown,
}

impl Action {
    /// Action kind tag, for outcomes and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateObject(_) => "create_object",
            Self::UpdateObjectStatus(_) => "update_object_status",
            Self::SetDueDate(_) => "set_due_date",
            Self::AssignToUser(_) => "assign_to_user",
            Self::CreateTask(_) => "create_task",
            Self::SendNotification(_) => "send_notification",
            Self::TriggerWebhook(_) => "trigger_webhook",
            Self::Unknown => "unknown",
        }
    }
}

/// Configuration for the create-object action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateObjectConfig {
    /// Type of object to create.
    pub object_type: String,

    /// Initial status (default "open").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Optional deadline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_at: Option<DateTime<Utc>>,

    /// Initial attribute set.
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

/// Configuration for the update-object-status action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateObjectStatusConfig {
    /// Status to set.
    pub new_status: String,
}

/// Relative deadline offset from "now".
///
/// Hours and minutes default to zero independently: an absent or zero
/// hours offset must not drop a minutes offset.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RelativeTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hours: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub minutes: Option<i64>,
}

/// Configuration for the set-due-date action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetDueDateConfig {
    /// Offset from "now".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relative_time: Option<RelativeTime>,

    /// Absolute deadline (used when no offset is configured).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_at: Option<DateTime<Utc>>,
}

/// Configuration for the assign-to-user action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignToUserConfig {
    /// Single assignee.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Multiple assignees.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub user_ids: Vec<String>,
}

/// Configuration for the create-task action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskConfig {
    /// Task title. Required at execution time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Task category (default OTHER).
    #[serde(default)]
    pub task_type: TaskType,

    /// Task priority (default MEDIUM).
    #[serde(default)]
    pub priority: TaskPriority,

    /// Optional deadline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_at: Option<DateTime<Utc>>,
}

/// Configuration for the send-notification action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendNotificationConfig {
    /// Channel-agnostic recipient identifiers.
    #[serde(default)]
    pub recipients: Vec<String>,

    /// Notification subject.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// Notification body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    /// Arbitrary payload passed through to the delivery collaborator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// HTTP method for outbound webhook intents.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[allow(clippy::upper_case_acronyms)] // HTTP methods are conventionally uppercase
pub enum WebhookMethod {
    GET,
    #[default]
    POST,
    PUT,
    PATCH,
    DELETE,
}

impl std::fmt::Display for WebhookMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GET => write!(f, "GET"),
            Self::POST => write!(f, "POST"),
            Self::PUT => write!(f, "PUT"),
            Self::PATCH => write!(f, "PATCH"),
            Self::DELETE => write!(f, "DELETE"),
        }
    }
}

/// Configuration for the trigger-webhook action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerWebhookConfig {
    /// Target URL.
    pub url: String,

    /// HTTP method (default POST).
    #[serde(default)]
    pub method: WebhookMethod,

    /// Request headers.
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Request payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

/// Enforcement block attached to a playbook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enforcements {
    /// SLA specification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sla: Option<SlaSpec>,
}

/// Service-level timer specification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlaSpec {
    /// Deadline offset in hours (default 24).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_in_hours: Option<i64>,

    /// Escalation rule configuration, passed through to downstream
    /// schedulers on the tracking event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalation: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playbook_deserialization() {
        let playbook: Playbook = serde_json::from_str(
            r#"{
                "id": "pb-1",
                "name": "Escalate stale requests",
                "conditions": {
                    "operator": "AND",
                    "rules": [
                        {"type": "object_status", "operator": "equals", "value": "open"},
                        {"type": "object_attribute", "field_key": "room", "operator": "is_empty"}
                    ]
                },
                "actions": [
                    {"type": "update_object_status", "new_status": "escalated"},
                    {"type": "create_task", "title": "Check room", "priority": "HIGH"}
                ],
                "enforcements": {"sla": {"due_in_hours": 4}}
            }"#,
        )
        .unwrap();

        assert!(playbook.is_active);
        let group = playbook.conditions.unwrap();
        assert_eq!(group.operator, LogicalOperator::And);
        assert_eq!(group.rules.len(), 2);
        assert_eq!(playbook.actions.len(), 2);
        assert_eq!(
            playbook.enforcements.unwrap().sla.unwrap().due_in_hours,
            Some(4)
        );
    }

    #[test]
    fn test_unknown_rule_type() {
        let node: ConditionNode = serde_json::from_str(
            r#"{"type": "weather_condition", "operator": "equals", "value": "sunny"}"#,
        )
        .unwrap();
        assert!(matches!(node, ConditionNode::Unknown));
        assert_eq!(node.kind(), "unknown");
    }

    #[test]
    fn test_unknown_action_type() {
        let action: Action =
            serde_json::from_str(r#"{"type": "launch_drone", "target": "room 204"}"#).unwrap();
        assert!(matches!(action, Action::Unknown));
    }

    #[test]
    fn test_action_kind() {
        let action: Action =
            serde_json::from_str(r#"{"type": "update_object_status", "new_status": "closed"}"#)
                .unwrap();
        assert_eq!(action.kind(), "update_object_status");
    }

    #[test]
    fn test_logical_operator_serde() {
        assert_eq!(
            serde_json::to_string(&LogicalOperator::Or).unwrap(),
            "\"OR\""
        );
        let op: LogicalOperator = serde_json::from_str("\"AND\"").unwrap();
        assert_eq!(op, LogicalOperator::And);
    }

    #[test]
    fn test_relative_time_partial() {
        let config: SetDueDateConfig =
            serde_json::from_str(r#"{"relative_time": {"minutes": 30}}"#).unwrap();
        let rel = config.relative_time.unwrap();
        assert_eq!(rel.hours, None);
        assert_eq!(rel.minutes, Some(30));
    }

    #[test]
    fn test_webhook_method_default() {
        let config: TriggerWebhookConfig =
            serde_json::from_str(r#"{"url": "https://example.com/hook"}"#).unwrap();
        assert_eq!(config.method.to_string(), "POST");
    }
}
