//! Condition evaluation against business object snapshots.
//!
//! Pure except for reservation lookups through the object store.
//! Evaluation never raises: malformed dates and type-mismatched
//! comparisons evaluate to `false`, and unrecognized rule types
//! evaluate to `true` (fail-open) so schema drift does not block
//! unrelated automations. Fail-open evaluations are logged and
//! counted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use opsbook_core::{
    ConditionGroup, ConditionNode, ConditionOperator, ExecutionContext, LogicalOperator,
    ObjectSnapshot, ObjectStore,
};

/// Evaluates condition trees against object snapshots.
pub struct ConditionEvaluator {
    objects: Arc<dyn ObjectStore>,
    fail_open_count: AtomicU64,
}

impl ConditionEvaluator {
    /// Create a new condition evaluator.
    pub fn new(objects: Arc<dyn ObjectStore>) -> Self {
        Self {
            objects,
            fail_open_count: AtomicU64::new(0),
        }
    }

    /// Number of fail-open evaluations of unrecognized rule types.
    pub fn fail_open_count(&self) -> u64 {
        self.fail_open_count.load(Ordering::Relaxed)
    }

    /// Evaluate a condition group. A missing or empty group is
    /// vacuously true.
    ///
    /// Rules are evaluated in order: AND short-circuits on the first
    /// false rule, OR on the first true rule.
    pub async fn evaluate(
        &self,
        group: Option<&ConditionGroup>,
        object: &ObjectSnapshot,
        ctx: &ExecutionContext,
    ) -> bool {
        let Some(group) = group else {
            return true;
        };
        if group.rules.is_empty() {
            return true;
        }

        for rule in &group.rules {
            let matched = self.evaluate_node(rule, object, ctx).await;
            match group.operator {
                LogicalOperator::And if !matched => return false,
                LogicalOperator::Or if matched => return true,
                _ => {}
            }
        }

        // No short-circuit fired: all rules passed under AND, none
        // matched under OR.
        matches!(group.operator, LogicalOperator::And)
    }

    /// Evaluate a single rule.
    pub async fn evaluate_node(
        &self,
        node: &ConditionNode,
        object: &ObjectSnapshot,
        ctx: &ExecutionContext,
    ) -> bool {
        match node {
            ConditionNode::ObjectStatus { operator, value } => {
                status_matches(*operator, &object.status, value)
            }
            ConditionNode::ObjectAttribute {
                field_key,
                operator,
                value,
            } => evaluate_attribute(object, field_key, *operator, value),
            ConditionNode::TimeCondition { operator, value } => {
                evaluate_time(*operator, value, Utc::now())
            }
            ConditionNode::ReservationStatus { operator, value } => {
                self.evaluate_reservation(object, *operator, value, ctx).await
            }
            ConditionNode::Unknown => {
                // Fail-open by policy: an unrecognized rule type from a
                // newer schema must not block unrelated automations.
                self.fail_open_count.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    object_id = %object.id,
                    "Unrecognized condition rule type, evaluating as matched"
                );
                true
            }
        }
    }

    async fn evaluate_reservation(
        &self,
        object: &ObjectSnapshot,
        operator: ConditionOperator,
        value: &serde_json::Value,
        ctx: &ExecutionContext,
    ) -> bool {
        let Some(reservation_id) = object.reservation_id.as_deref() else {
            return false;
        };

        let reservation = match self.objects.find_reservation(reservation_id, ctx).await {
            Ok(Some(r)) => r,
            Ok(None) => {
                tracing::warn!(
                    object_id = %object.id,
                    reservation_id = %reservation_id,
                    "Referenced reservation not found"
                );
                return false;
            }
            Err(e) => {
                tracing::warn!(
                    object_id = %object.id,
                    reservation_id = %reservation_id,
                    error = %e,
                    "Reservation lookup failed"
                );
                return false;
            }
        };

        match operator {
            ConditionOperator::StatusEquals | ConditionOperator::Equals => {
                value.as_str() == Some(reservation.status.as_str())
            }
            ConditionOperator::CheckinWithin => {
                let Some(check_in) = reservation.check_in else {
                    return false;
                };
                let Some(threshold_hours) = value.as_f64() else {
                    return false;
                };
                let hours_away = (Utc::now() - check_in).num_minutes().abs() as f64 / 60.0;
                hours_away <= threshold_hours
            }
            _ => false,
        }
    }
}

/// Compare a status string per operator. Unknown operators for this
/// rule type evaluate to false.
fn status_matches(operator: ConditionOperator, status: &str, value: &serde_json::Value) -> bool {
    match operator {
        ConditionOperator::Equals => value.as_str() == Some(status),
        ConditionOperator::NotEquals => value.as_str().map(|v| v != status).unwrap_or(false),
        ConditionOperator::In => value
            .as_array()
            .map(|arr| arr.iter().any(|v| v.as_str() == Some(status)))
            .unwrap_or(false),
        _ => false,
    }
}

fn evaluate_attribute(
    object: &ObjectSnapshot,
    field_key: &str,
    operator: ConditionOperator,
    value: &serde_json::Value,
) -> bool {
    let Some(attribute) = object.attribute(field_key) else {
        // A missing attribute satisfies only the emptiness check.
        return matches!(operator, ConditionOperator::IsEmpty);
    };

    let resolved = attribute.resolved_value();

    if matches!(operator, ConditionOperator::IsEmpty) {
        return resolved.is_none();
    }

    let Some(actual) = resolved else {
        return false;
    };

    compare_values(operator, &actual, value)
}

/// Compare a resolved attribute value against the rule's comparison
/// value. Type mismatches evaluate to false.
fn compare_values(
    operator: ConditionOperator,
    actual: &serde_json::Value,
    expected: &serde_json::Value,
) -> bool {
    match operator {
        ConditionOperator::Equals => actual == expected,
        ConditionOperator::NotEquals => actual != expected,
        ConditionOperator::Contains => match (actual.as_str(), expected.as_str()) {
            (Some(a), Some(e)) => a.contains(e),
            _ => false,
        },
        ConditionOperator::In => expected
            .as_array()
            .map(|arr| arr.contains(actual))
            .unwrap_or(false),
        ConditionOperator::GreaterThan => match (actual.as_f64(), expected.as_f64()) {
            (Some(a), Some(e)) => a > e,
            _ => false,
        },
        ConditionOperator::LessThan => match (actual.as_f64(), expected.as_f64()) {
            (Some(a), Some(e)) => a < e,
            _ => false,
        },
        ConditionOperator::Before => match (parse_datetime(actual), parse_datetime(expected)) {
            (Some(a), Some(e)) => a < e,
            _ => false,
        },
        ConditionOperator::After => match (parse_datetime(actual), parse_datetime(expected)) {
            (Some(a), Some(e)) => a > e,
            _ => false,
        },
        _ => false,
    }
}

/// Compare "now" to a parsed timestamp or range. Malformed dates
/// evaluate to false rather than raising.
fn evaluate_time(
    operator: ConditionOperator,
    value: &serde_json::Value,
    now: DateTime<Utc>,
) -> bool {
    match operator {
        ConditionOperator::Before => parse_datetime(value).map(|t| now < t).unwrap_or(false),
        ConditionOperator::After => parse_datetime(value).map(|t| now > t).unwrap_or(false),
        ConditionOperator::Between => {
            let Some(range) = value.as_array().filter(|arr| arr.len() == 2) else {
                return false;
            };
            match (parse_datetime(&range[0]), parse_datetime(&range[1])) {
                (Some(start), Some(end)) => now >= start && now <= end,
                _ => false,
            }
        }
        _ => false,
    }
}

fn parse_datetime(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    value
        .as_str()
        .and_then(|s| s.parse::<DateTime<Utc>>().ok())
}
