//! Business object snapshots and attribute value resolution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of a business object read for condition evaluation.
///
/// Mutations go through the [`crate::store::ObjectStore`] collaborator;
/// the snapshot itself is never written back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectSnapshot {
    /// Object identifier.
    pub id: String,

    /// Object type (e.g., "maintenance_request", "guest_complaint").
    pub object_type: String,

    /// Current workflow status.
    pub status: String,

    /// Deadline, if one has been set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_at: Option<DateTime<Utc>>,

    /// Linked guest, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest_id: Option<String>,

    /// Linked reservation, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reservation_id: Option<String>,

    /// Attached key/value attributes.
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

impl ObjectSnapshot {
    /// Find an attribute by key.
    pub fn attribute(&self, key: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.key == key)
    }
}

/// A key/value attribute with typed value slots.
///
/// At most one slot is populated per attribute. The slots mirror the
/// storage model: string, number, boolean, date, relationship, select,
/// file, money, structured.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute key.
    pub key: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_string: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_number: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_boolean: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_date: Option<DateTime<Utc>>,

    /// Identifier of a related entity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_relationship: Option<String>,

    /// Selected option key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_select: Option<String>,

    /// Stored file key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_file: Option<String>,

    /// Monetary amount.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_money: Option<f64>,

    /// Arbitrary structured value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_json: Option<serde_json::Value>,
}

impl Attribute {
    /// Create an attribute with no populated slot.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    /// Create a string attribute.
    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            value_string: Some(value.into()),
            ..Self::new(key)
        }
    }

    /// Create a number attribute.
    pub fn number(key: impl Into<String>, value: f64) -> Self {
        Self {
            value_number: Some(value),
            ..Self::new(key)
        }
    }

    /// Create a boolean attribute.
    pub fn boolean(key: impl Into<String>, value: bool) -> Self {
        Self {
            value_boolean: Some(value),
            ..Self::new(key)
        }
    }

    /// Create a date attribute.
    pub fn date(key: impl Into<String>, value: DateTime<Utc>) -> Self {
        Self {
            value_date: Some(value),
            ..Self::new(key)
        }
    }

    /// Create a structured attribute.
    pub fn structured(key: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            value_json: Some(value),
            ..Self::new(key)
        }
    }

    /// Resolve the single populated value as JSON.
    ///
    /// Slot precedence is fixed and shared by condition evaluation and
    /// presence checks: string, number, boolean, date, relationship,
    /// select, file, money, structured. Returns `None` when no slot is
    /// populated.
    pub fn resolved_value(&self) -> Option<serde_json::Value> {
        if let Some(v) = &self.value_string {
            return Some(serde_json::json!(v));
        }
        if let Some(v) = self.value_number {
            return Some(serde_json::json!(v));
        }
        if let Some(v) = self.value_boolean {
            return Some(serde_json::json!(v));
        }
        if let Some(v) = self.value_date {
            return Some(serde_json::json!(v.to_rfc3339()));
        }
        if let Some(v) = &self.value_relationship {
            return Some(serde_json::json!(v));
        }
        if let Some(v) = &self.value_select {
            return Some(serde_json::json!(v));
        }
        if let Some(v) = &self.value_file {
            return Some(serde_json::json!(v));
        }
        if let Some(v) = self.value_money {
            return Some(serde_json::json!(v));
        }
        self.value_json.clone()
    }

    /// Whether no slot is populated.
    pub fn is_empty(&self) -> bool {
        self.resolved_value().is_none()
    }
}

/// Reservation referenced by a business object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    /// Reservation identifier.
    pub id: String,

    /// Reservation status (e.g., "confirmed", "checked_in").
    pub status: String,

    /// Check-in timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_in: Option<DateTime<Utc>>,

    /// Check-out timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_out: Option<DateTime<Utc>>,
}

/// Payload for creating a business object through the object store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewObject {
    /// Object type.
    pub object_type: String,

    /// Initial status.
    pub status: String,

    /// Optional deadline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_at: Option<DateTime<Utc>>,

    /// Linked guest.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest_id: Option<String>,

    /// Linked reservation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reservation_id: Option<String>,

    /// Initial attribute set.
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

/// Assignment record persisted by the assign-to-user action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    /// Assigned user identifiers.
    pub user_ids: Vec<String>,

    /// When the assignment was made.
    pub assigned_at: DateTime<Utc>,

    /// Who made the assignment ("system" for automated runs).
    pub assigned_by: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_value_precedence() {
        // String wins over number when both are populated.
        let attr = Attribute {
            value_number: Some(5.0),
            ..Attribute::string("room", "101")
        };
        assert_eq!(attr.resolved_value(), Some(serde_json::json!("101")));

        // Number wins over boolean.
        let attr = Attribute {
            value_boolean: Some(true),
            ..Attribute::number("floor", 3.0)
        };
        assert_eq!(attr.resolved_value(), Some(serde_json::json!(3.0)));
    }

    #[test]
    fn test_resolved_value_empty() {
        let attr = Attribute::new("notes");
        assert_eq!(attr.resolved_value(), None);
        assert!(attr.is_empty());
    }

    #[test]
    fn test_resolved_value_structured() {
        let attr = Attribute::structured("meta", serde_json::json!({"a": 1}));
        assert_eq!(attr.resolved_value(), Some(serde_json::json!({"a": 1})));
        assert!(!attr.is_empty());
    }

    #[test]
    fn test_snapshot_attribute_lookup() {
        let object = ObjectSnapshot {
            id: "obj-1".to_string(),
            object_type: "maintenance_request".to_string(),
            status: "open".to_string(),
            due_at: None,
            guest_id: None,
            reservation_id: None,
            attributes: vec![Attribute::string("room", "204")],
        };

        assert!(object.attribute("room").is_some());
        assert!(object.attribute("missing").is_none());
    }

    #[test]
    fn test_attribute_serialization() {
        let attr = Attribute::string("room", "204");
        let json = serde_json::to_string(&attr).unwrap();
        assert!(json.contains("\"value_string\":\"204\""));
        // Unpopulated slots are omitted
        assert!(!json.contains("value_number"));
    }
}
