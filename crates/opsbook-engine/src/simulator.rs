//! Dry-run simulation for playbook authoring.
//!
//! Validates a playbook's structure, evaluates its rules against a
//! synthetic object built from caller-supplied test data, and checks
//! each action's configuration without touching any real store. A
//! committed run additionally persists the report as an execution
//! record; it still performs no side effects.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use opsbook_core::{
    Action, Attribute, ConditionNode, EngineError, EngineResult, ExecutionContext,
    ExecutionRecord, ExecutionStore, LogicalOperator, ObjectSnapshot, Playbook, PlaybookStore,
    Reservation,
};

use crate::evaluator::ConditionEvaluator;
use crate::testing::InMemoryObjectStore;

/// Simulation request.
#[derive(Debug, Clone, Deserialize)]
pub struct TestPlaybookRequest {
    /// Playbook to simulate.
    pub playbook_id: String,

    /// Synthetic object fields and mock reservation data.
    #[serde(default)]
    pub test_data: Value,

    /// When false, the report is persisted as an execution record.
    #[serde(default = "default_dry_run")]
    pub dry_run: bool,
}

fn default_dry_run() -> bool {
    true
}

/// Per-rule evaluation result.
#[derive(Debug, Clone, Serialize)]
pub struct RuleCheck {
    /// Rule kind tag.
    pub rule: String,

    /// Whether the rule matched the synthetic object.
    pub passed: bool,
}

/// Per-action configuration check.
#[derive(Debug, Clone, Serialize)]
pub struct ActionCheck {
    /// Action kind tag.
    pub action: String,

    /// Whether the action would run cleanly as configured.
    pub would_execute: bool,

    /// Configuration problem blocking execution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<String>,

    /// Sketch of the action's effect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_result: Option<Value>,
}

/// Full simulation report.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    /// Playbook simulated.
    pub playbook_id: String,

    /// Whether the playbook has no blocking issues.
    pub valid: bool,

    /// Blocking structural problems.
    pub issues: Vec<String>,

    /// Non-blocking observations.
    pub warnings: Vec<String>,

    /// Per-rule results against the synthetic object.
    pub rule_checks: Vec<RuleCheck>,

    /// Cumulative condition outcome under the group's operator.
    pub conditions_met: bool,

    /// Per-action configuration checks.
    pub action_checks: Vec<ActionCheck>,

    /// Whether this was a dry run.
    pub dry_run: bool,

    /// Record identifier, for committed runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,
}

/// Simulates playbook runs without side effects.
pub struct DryRunSimulator {
    playbooks: Arc<dyn PlaybookStore>,
    executions: Arc<dyn ExecutionStore>,
}

impl DryRunSimulator {
    pub fn new(playbooks: Arc<dyn PlaybookStore>, executions: Arc<dyn ExecutionStore>) -> Self {
        Self {
            playbooks,
            executions,
        }
    }

    /// Simulate a playbook against synthetic test data.
    pub async fn test_playbook(
        &self,
        request: &TestPlaybookRequest,
        ctx: &ExecutionContext,
    ) -> EngineResult<SimulationReport> {
        let playbook = self
            .playbooks
            .find_by_id(&request.playbook_id, ctx)
            .await?
            .ok_or_else(|| EngineError::PlaybookNotFound(request.playbook_id.clone()))?;

        let mut issues = Vec::new();
        let mut warnings = Vec::new();

        if !playbook.is_active {
            warnings.push("Playbook is inactive and will not fire on triggers".to_string());
        }

        let object = synthetic_object(&request.test_data);
        let store = Arc::new(InMemoryObjectStore::new());
        if let Some(reservation) = mock_reservation(&request.test_data) {
            store.put_reservation(reservation).await;
        }
        let evaluator = ConditionEvaluator::new(store);

        let (rule_checks, conditions_met) = self
            .check_conditions(&playbook, &object, &evaluator, &mut issues, &mut warnings, ctx)
            .await;

        let action_checks = check_actions(&playbook.actions);

        let mut report = SimulationReport {
            playbook_id: playbook.id.clone(),
            valid: issues.is_empty(),
            issues,
            warnings,
            rule_checks,
            conditions_met,
            action_checks,
            dry_run: request.dry_run,
            execution_id: None,
        };

        if !request.dry_run {
            let mut record = ExecutionRecord::new(&playbook.id, &object.id, ctx);
            record.complete(serde_json::to_value(&report)?);
            self.executions.create(&record).await?;
            report.execution_id = Some(record.id);
        }

        Ok(report)
    }

    async fn check_conditions(
        &self,
        playbook: &Playbook,
        object: &ObjectSnapshot,
        evaluator: &ConditionEvaluator,
        issues: &mut Vec<String>,
        warnings: &mut Vec<String>,
        ctx: &ExecutionContext,
    ) -> (Vec<RuleCheck>, bool) {
        let Some(group) = &playbook.conditions else {
            return (Vec::new(), true);
        };

        if group.rules.is_empty() {
            issues.push("Condition group has no rules".to_string());
            return (Vec::new(), true);
        }

        let mut checks = Vec::with_capacity(group.rules.len());
        // First short-circuit decides the cumulative outcome, but every
        // rule is still evaluated so the report covers all of them.
        let mut decided: Option<bool> = None;

        for rule in &group.rules {
            match rule {
                ConditionNode::ObjectAttribute { field_key, .. } if field_key.trim().is_empty() => {
                    issues.push("object_attribute rule has an empty field_key".to_string());
                }
                ConditionNode::ReservationStatus { .. }
                    if object.reservation_id.is_none() =>
                {
                    warnings.push(
                        "reservation_status rule but test_data has no reservation".to_string(),
                    );
                }
                ConditionNode::Unknown => {
                    warnings.push(
                        "Unrecognized rule type will evaluate as matched".to_string(),
                    );
                }
                _ => {}
            }

            let passed = evaluator.evaluate_node(rule, object, ctx).await;
            if decided.is_none() {
                match group.operator {
                    LogicalOperator::And if !passed => decided = Some(false),
                    LogicalOperator::Or if passed => decided = Some(true),
                    _ => {}
                }
            }
            checks.push(RuleCheck {
                rule: rule.kind().to_string(),
                passed,
            });
        }

        let conditions_met =
            decided.unwrap_or(matches!(group.operator, LogicalOperator::And));
        (checks, conditions_met)
    }
}

/// Build the synthetic object the rules are evaluated against.
fn synthetic_object(test_data: &Value) -> ObjectSnapshot {
    let str_field = |key: &str, default: &str| -> String {
        test_data
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or(default)
            .to_string()
    };

    let attributes = test_data
        .get("attributes")
        .and_then(|v| v.as_object())
        .map(|map| {
            map.iter()
                .map(|(key, value)| match value {
                    Value::String(s) => Attribute::string(key, s.clone()),
                    Value::Number(n) => Attribute::number(key, n.as_f64().unwrap_or(0.0)),
                    Value::Bool(b) => Attribute::boolean(key, *b),
                    Value::Null => Attribute::new(key),
                    other => Attribute::structured(key, other.clone()),
                })
                .collect()
        })
        .unwrap_or_default();

    let reservation_id = if test_data.get("reservation").is_some() {
        Some("test-reservation".to_string())
    } else {
        test_data
            .get("reservation_id")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    };

    ObjectSnapshot {
        id: str_field("object_id", "test-object"),
        object_type: str_field("object_type", "test"),
        status: str_field("status", "open"),
        due_at: None,
        guest_id: None,
        reservation_id,
        attributes,
    }
}

/// Build the mock reservation referenced by the synthetic object.
fn mock_reservation(test_data: &Value) -> Option<Reservation> {
    let data = test_data.get("reservation")?;
    Some(Reservation {
        id: "test-reservation".to_string(),
        status: data
            .get("status")
            .and_then(|v| v.as_str())
            .unwrap_or("confirmed")
            .to_string(),
        check_in: data
            .get("check_in")
            .and_then(|v| v.as_str())
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&chrono::Utc)),
        check_out: None,
    })
}

/// Structural checks mirroring the executor's configuration errors.
fn check_actions(actions: &[Action]) -> Vec<ActionCheck> {
    actions
        .iter()
        .map(|action| {
            let kind = action.kind().to_string();
            let (issue, expected_result) = match action {
                Action::CreateObject(config) => (
                    None,
                    Some(json!({ "object_type": config.object_type })),
                ),
                Action::UpdateObjectStatus(config) => {
                    (None, Some(json!({ "status": config.new_status })))
                }
                Action::SetDueDate(config) => {
                    if config.relative_time.is_none() && config.due_at.is_none() {
                        (
                            Some("set_due_date requires relative_time or due_at".to_string()),
                            None,
                        )
                    } else {
                        (None, Some(json!({ "sets_due_date": true })))
                    }
                }
                Action::AssignToUser(config) => {
                    if config.user_id.is_none() && config.user_ids.is_empty() {
                        (
                            Some("assign_to_user requires user_id or user_ids".to_string()),
                            None,
                        )
                    } else {
                        let count =
                            usize::from(config.user_id.is_some()) + config.user_ids.len();
                        (None, Some(json!({ "assignees": count })))
                    }
                }
                Action::CreateTask(config) => {
                    match config.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
                        Some(title) => (None, Some(json!({ "title": title }))),
                        None => (Some("create_task requires a title".to_string()), None),
                    }
                }
                Action::SendNotification(config) => {
                    if config.recipients.is_empty() {
                        (
                            Some("send_notification requires recipients".to_string()),
                            None,
                        )
                    } else {
                        (None, Some(json!({ "recipients": config.recipients.len() })))
                    }
                }
                Action::TriggerWebhook(config) => {
                    if config.url.trim().is_empty() {
                        (Some("trigger_webhook requires a url".to_string()), None)
                    } else {
                        (None, Some(json!({ "url": config.url })))
                    }
                }
                Action::Unknown => (Some("Unknown action type".to_string()), None),
            };

            ActionCheck {
                action: kind,
                would_execute: issue.is_none(),
                issue,
                expected_result,
            }
        })
        .collect()
}
