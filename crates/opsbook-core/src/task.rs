//! Task entities created by playbook actions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Task category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    Housekeeping,
    Maintenance,
    GuestRequest,
    FollowUp,
    #[default]
    Other,
}

/// Task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

/// Payload for creating a task through the task store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    /// Task title.
    pub title: String,

    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Task category (default OTHER).
    #[serde(default)]
    pub task_type: TaskType,

    /// Task priority (default MEDIUM).
    #[serde(default)]
    pub priority: TaskPriority,

    /// Entity kind the task links back to.
    pub related_entity: String,

    /// Identifier of the linked entity.
    pub related_id: String,

    /// Optional deadline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_defaults() {
        assert_eq!(TaskType::default(), TaskType::Other);
        assert_eq!(TaskPriority::default(), TaskPriority::Medium);
    }

    #[test]
    fn test_task_serialization() {
        let task = NewTask {
            title: "Inspect room 204".to_string(),
            description: None,
            task_type: TaskType::default(),
            priority: TaskPriority::High,
            related_entity: "object".to_string(),
            related_id: "obj-1".to_string(),
            due_at: None,
        };

        let json = serde_json::to_string(&task).unwrap();
        assert!(json.contains("\"task_type\":\"OTHER\""));
        assert!(json.contains("\"priority\":\"HIGH\""));
    }

    #[test]
    fn test_task_deserialization_defaults() {
        let task: NewTask = serde_json::from_str(
            r#"{"title": "t", "related_entity": "object", "related_id": "obj-1"}"#,
        )
        .unwrap();
        assert_eq!(task.task_type, TaskType::Other);
        assert_eq!(task.priority, TaskPriority::Medium);
    }
}
