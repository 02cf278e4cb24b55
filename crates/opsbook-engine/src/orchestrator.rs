//! Execution orchestration.
//!
//! Drives one playbook run end to end: load the playbook and target
//! object, evaluate conditions, execute actions with per-action failure
//! isolation, apply SLA enforcement, and persist the execution record
//! through its lifecycle. Terminal errors are converted into a
//! structured result rather than raised, so a broken playbook never
//! takes down the caller.

use std::sync::Arc;

use serde_json::json;

use opsbook_core::{
    ActionOutcome, EngineError, EngineEvent, EngineResult, EventSink, ExecutionContext,
    ExecutionRecord, ExecutionResult, ExecutionStatus, ExecutionStore, ObjectStore, Playbook,
    PlaybookStore, TaskStore,
};

use crate::actions::ActionExecutor;
use crate::config::EngineConfig;
use crate::evaluator::ConditionEvaluator;
use crate::sla::SlaEnforcer;

/// Coordinates evaluator, action executor, and SLA enforcer for a
/// single playbook run.
pub struct PlaybookOrchestrator {
    playbooks: Arc<dyn PlaybookStore>,
    objects: Arc<dyn ObjectStore>,
    executions: Arc<dyn ExecutionStore>,
    events: Arc<dyn EventSink>,
    evaluator: ConditionEvaluator,
    actions: ActionExecutor,
    sla: SlaEnforcer,
}

impl PlaybookOrchestrator {
    pub fn new(
        playbooks: Arc<dyn PlaybookStore>,
        objects: Arc<dyn ObjectStore>,
        tasks: Arc<dyn TaskStore>,
        executions: Arc<dyn ExecutionStore>,
        events: Arc<dyn EventSink>,
        config: &EngineConfig,
    ) -> Self {
        let evaluator = ConditionEvaluator::new(objects.clone());
        let actions = ActionExecutor::new(objects.clone(), tasks, events.clone());
        let sla = SlaEnforcer::new(objects.clone(), events.clone())
            .with_default_due_hours(config.default_sla_hours);
        Self {
            playbooks,
            objects,
            executions,
            events,
            evaluator,
            actions,
            sla,
        }
    }

    /// Run a playbook against a target object.
    ///
    /// Creates a fresh execution record. Record creation failures are
    /// raised; everything after that is captured on the record and
    /// reported through the returned [`ExecutionResult`].
    pub async fn execute_playbook(
        &self,
        playbook_id: &str,
        object_id: &str,
        ctx: &ExecutionContext,
    ) -> EngineResult<ExecutionResult> {
        let record = ExecutionRecord::new(playbook_id, object_id, ctx);
        self.executions.create(&record).await?;
        self.run(record, ctx).await
    }

    /// Re-run an existing record, typically a retry attempt. The record
    /// keeps its identity and retry count across runs.
    pub async fn execute_with_record(
        &self,
        mut record: ExecutionRecord,
        ctx: &ExecutionContext,
    ) -> EngineResult<ExecutionResult> {
        record.status = ExecutionStatus::Running;
        record.completed_at = None;
        self.executions.update(&record).await?;
        self.run(record, ctx).await
    }

    /// Load the execution history for a target object, newest first.
    pub async fn execution_history(
        &self,
        object_id: &str,
        ctx: &ExecutionContext,
    ) -> EngineResult<Vec<ExecutionRecord>> {
        self.executions.find_by_object(object_id, ctx).await
    }

    async fn run(
        &self,
        mut record: ExecutionRecord,
        ctx: &ExecutionContext,
    ) -> EngineResult<ExecutionResult> {
        match self.run_inner(&mut record, ctx).await {
            Ok(result) => Ok(result),
            Err(e) => {
                let message = e.to_string();
                tracing::warn!(
                    execution_id = %record.id,
                    playbook_id = %record.playbook_id,
                    error = %message,
                    "playbook execution failed"
                );
                record.fail(&message);
                // Best effort: the caller still gets a structured
                // failure even if the record cannot be persisted.
                if let Err(store_err) = self.executions.update(&record).await {
                    tracing::warn!(
                        execution_id = %record.id,
                        error = %store_err,
                        "failed to persist failed execution record"
                    );
                }
                self.emit(
                    "playbook.execution.failed",
                    json!({
                        "execution_id": record.id,
                        "playbook_id": record.playbook_id,
                        "object_id": record.object_id,
                        "error": message,
                    }),
                    ctx,
                )
                .await;
                Ok(ExecutionResult::failed(record.id.clone(), vec![message]))
            }
        }
    }

    async fn run_inner(
        &self,
        record: &mut ExecutionRecord,
        ctx: &ExecutionContext,
    ) -> EngineResult<ExecutionResult> {
        let playbook = self.load_playbook(&record.playbook_id, ctx).await?;

        let object = self
            .objects
            .find(&record.object_id, ctx)
            .await?
            .ok_or_else(|| EngineError::ObjectNotFound(record.object_id.clone()))?;

        self.emit(
            "playbook.execution.started",
            json!({
                "execution_id": record.id,
                "playbook_id": playbook.id,
                "object_id": object.id,
                "retry_count": record.retry_count,
            }),
            ctx,
        )
        .await;

        let conditions_met = self
            .evaluator
            .evaluate(playbook.conditions.as_ref(), &object, ctx)
            .await;

        if !conditions_met {
            tracing::debug!(
                execution_id = %record.id,
                playbook_id = %playbook.id,
                "conditions unmet, skipping actions"
            );
            record.complete(json!({ "skipped": true }));
            self.executions.update(record).await?;
            self.emit(
                "playbook.execution.skipped",
                json!({
                    "execution_id": record.id,
                    "playbook_id": playbook.id,
                    "object_id": object.id,
                }),
                ctx,
            )
            .await;
            return Ok(ExecutionResult::skipped(record.id.clone()));
        }

        let mut outcomes = Vec::with_capacity(playbook.actions.len());
        for action in &playbook.actions {
            let kind = action.kind();
            match self.actions.execute(action, &object.id, ctx).await {
                Ok(data) => outcomes.push(ActionOutcome::success(kind, data)),
                Err(e) => {
                    tracing::warn!(
                        execution_id = %record.id,
                        action = kind,
                        error = %e,
                        "action failed, continuing with remaining actions"
                    );
                    outcomes.push(ActionOutcome::failure(kind, e.to_string()));
                }
            }
        }

        self.sla
            .enforce(playbook.enforcements.as_ref(), &object.id, ctx)
            .await?;

        record.complete(serde_json::to_value(&outcomes)?);
        self.executions.update(record).await?;

        self.emit(
            "playbook.execution.completed",
            json!({
                "execution_id": record.id,
                "playbook_id": playbook.id,
                "object_id": object.id,
                "actions_executed": outcomes.iter().filter(|o| o.success).count(),
            }),
            ctx,
        )
        .await;

        Ok(ExecutionResult::completed(record.id.clone(), outcomes))
    }

    async fn load_playbook(
        &self,
        playbook_id: &str,
        ctx: &ExecutionContext,
    ) -> EngineResult<Playbook> {
        let playbook = self
            .playbooks
            .find_by_id(playbook_id, ctx)
            .await?
            .ok_or_else(|| EngineError::PlaybookNotFound(playbook_id.to_string()))?;

        if !playbook.is_active {
            return Err(EngineError::PlaybookInactive(playbook_id.to_string()));
        }
        Ok(playbook)
    }

    /// Emit a lifecycle event, logging on sink failure. Lifecycle
    /// telemetry never fails an execution.
    async fn emit(&self, event_type: &str, payload: serde_json::Value, ctx: &ExecutionContext) {
        if let Err(e) = self
            .events
            .emit(EngineEvent::new(event_type, payload, ctx))
            .await
        {
            tracing::warn!(event_type, error = %e, "failed to emit lifecycle event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        InMemoryExecutionStore, InMemoryObjectStore, InMemoryPlaybookStore, InMemoryTaskStore,
        RecordingEventSink,
    };
    use opsbook_core::{
        Action, ConditionGroup, ConditionNode, ConditionOperator, CreateTaskConfig, Enforcements,
        LogicalOperator, ObjectSnapshot, SlaSpec, UpdateObjectStatusConfig,
    };

    struct Harness {
        playbooks: Arc<InMemoryPlaybookStore>,
        objects: Arc<InMemoryObjectStore>,
        executions: Arc<InMemoryExecutionStore>,
        events: Arc<RecordingEventSink>,
        orchestrator: PlaybookOrchestrator,
    }

    fn harness() -> Harness {
        let playbooks = Arc::new(InMemoryPlaybookStore::new());
        let objects = Arc::new(InMemoryObjectStore::new());
        let tasks = Arc::new(InMemoryTaskStore::new());
        let executions = Arc::new(InMemoryExecutionStore::new());
        let events = Arc::new(RecordingEventSink::new());
        let orchestrator = PlaybookOrchestrator::new(
            playbooks.clone(),
            objects.clone(),
            tasks,
            executions.clone(),
            events.clone(),
            &EngineConfig::default(),
        );
        Harness {
            playbooks,
            objects,
            executions,
            events,
            orchestrator,
        }
    }

    fn snapshot(id: &str, status: &str) -> ObjectSnapshot {
        ObjectSnapshot {
            id: id.to_string(),
            object_type: "maintenance_request".to_string(),
            status: status.to_string(),
            due_at: None,
            guest_id: None,
            reservation_id: None,
            attributes: vec![],
        }
    }

    fn ctx() -> ExecutionContext {
        ExecutionContext::new("org-1", "prop-1")
    }

    fn close_playbook(id: &str, conditions: Option<ConditionGroup>) -> opsbook_core::Playbook {
        opsbook_core::Playbook {
            id: id.to_string(),
            name: "Close stale requests".to_string(),
            is_active: true,
            conditions,
            actions: vec![Action::UpdateObjectStatus(UpdateObjectStatusConfig {
                new_status: "closed".to_string(),
            })],
            enforcements: None,
        }
    }

    #[tokio::test]
    async fn test_unconditional_playbook_executes_actions() {
        let h = harness();
        h.playbooks.put(close_playbook("pb-1", None)).await;
        h.objects.put_object(snapshot("obj-1", "open")).await;

        let result = h
            .orchestrator
            .execute_playbook("pb-1", "obj-1", &ctx())
            .await
            .unwrap();

        assert!(result.success);
        assert!(!result.skipped);
        assert_eq!(result.actions_executed, 1);
        assert_eq!(h.objects.get("obj-1").await.unwrap().status, "closed");

        let record = h.executions.get(&result.execution_id).await.unwrap();
        assert_eq!(record.status, ExecutionStatus::Completed);
        assert!(record.completed_at.is_some());

        assert_eq!(
            h.events
                .events_of_type("playbook.execution.completed")
                .await
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_unmet_conditions_skip_actions() {
        let h = harness();
        let conditions = ConditionGroup {
            operator: LogicalOperator::And,
            rules: vec![ConditionNode::ObjectStatus {
                operator: ConditionOperator::Equals,
                value: serde_json::json!("open"),
            }],
        };
        h.playbooks.put(close_playbook("pb-1", Some(conditions))).await;
        h.objects.put_object(snapshot("obj-1", "resolved")).await;

        let result = h
            .orchestrator
            .execute_playbook("pb-1", "obj-1", &ctx())
            .await
            .unwrap();

        assert!(result.success);
        assert!(result.skipped);
        assert_eq!(result.actions_executed, 0);
        // Target untouched.
        assert_eq!(h.objects.get("obj-1").await.unwrap().status, "resolved");

        let record = h.executions.get(&result.execution_id).await.unwrap();
        assert_eq!(record.status, ExecutionStatus::Completed);
        assert_eq!(record.results, Some(serde_json::json!({"skipped": true})));
        assert_eq!(
            h.events
                .events_of_type("playbook.execution.skipped")
                .await
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_action_failure_is_isolated() {
        let h = harness();
        let playbook = opsbook_core::Playbook {
            id: "pb-1".to_string(),
            name: "Mixed actions".to_string(),
            is_active: true,
            conditions: None,
            actions: vec![
                Action::CreateTask(CreateTaskConfig {
                    title: None, // misconfigured: fails at execution
                    description: None,
                    task_type: Default::default(),
                    priority: Default::default(),
                    due_at: None,
                }),
                Action::UpdateObjectStatus(UpdateObjectStatusConfig {
                    new_status: "escalated".to_string(),
                }),
            ],
            enforcements: None,
        };
        h.playbooks.put(playbook).await;
        h.objects.put_object(snapshot("obj-1", "open")).await;

        let result = h
            .orchestrator
            .execute_playbook("pb-1", "obj-1", &ctx())
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.actions_executed, 1);
        assert_eq!(result.results.len(), 2);
        assert!(!result.results[0].success);
        assert!(result.results[1].success);
        // The later action still ran.
        assert_eq!(h.objects.get("obj-1").await.unwrap().status, "escalated");
    }

    #[tokio::test]
    async fn test_missing_playbook_fails_structurally() {
        let h = harness();
        h.objects.put_object(snapshot("obj-1", "open")).await;

        let result = h
            .orchestrator
            .execute_playbook("pb-missing", "obj-1", &ctx())
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result.errors[0].contains("Playbook not found"));

        let record = h.executions.get(&result.execution_id).await.unwrap();
        assert_eq!(record.status, ExecutionStatus::Failed);
        assert_eq!(
            h.events
                .events_of_type("playbook.execution.failed")
                .await
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_inactive_playbook_fails() {
        let h = harness();
        let mut playbook = close_playbook("pb-1", None);
        playbook.is_active = false;
        h.playbooks.put(playbook).await;
        h.objects.put_object(snapshot("obj-1", "open")).await;

        let result = h
            .orchestrator
            .execute_playbook("pb-1", "obj-1", &ctx())
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result.errors[0].contains("inactive"));
    }

    #[tokio::test]
    async fn test_missing_object_fails() {
        let h = harness();
        h.playbooks.put(close_playbook("pb-1", None)).await;

        let result = h
            .orchestrator
            .execute_playbook("pb-1", "obj-missing", &ctx())
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result.errors[0].contains("Object not found"));
    }

    #[tokio::test]
    async fn test_sla_enforcement_applies_deadline() {
        let h = harness();
        let mut playbook = close_playbook("pb-1", None);
        playbook.enforcements = Some(Enforcements {
            sla: Some(SlaSpec {
                due_in_hours: Some(4),
                escalation: None,
            }),
        });
        h.playbooks.put(playbook).await;
        h.objects.put_object(snapshot("obj-1", "open")).await;

        let result = h
            .orchestrator
            .execute_playbook("pb-1", "obj-1", &ctx())
            .await
            .unwrap();

        assert!(result.success);
        assert!(h.objects.get("obj-1").await.unwrap().due_at.is_some());
        assert_eq!(h.events.events_of_type("sla.applied").await.len(), 1);
    }

    #[tokio::test]
    async fn test_sla_failure_fails_execution() {
        let h = harness();
        let mut playbook = close_playbook("pb-1", None);
        playbook.enforcements = Some(Enforcements {
            sla: Some(SlaSpec {
                due_in_hours: Some(4),
                escalation: None,
            }),
        });
        h.playbooks.put(playbook).await;
        h.objects.put_object(snapshot("obj-1", "open")).await;
        h.objects.fail_due_date_writes(true);

        let result = h
            .orchestrator
            .execute_playbook("pb-1", "obj-1", &ctx())
            .await
            .unwrap();

        assert!(!result.success);
        let record = h.executions.get(&result.execution_id).await.unwrap();
        assert_eq!(record.status, ExecutionStatus::Failed);
        // Actions ran before the enforcement step failed.
        assert_eq!(h.objects.get("obj-1").await.unwrap().status, "closed");
    }

    #[tokio::test]
    async fn test_concurrent_runs_on_one_object() {
        // No per-object serialization: two runs against the same
        // object may interleave writes. Both must still complete with
        // independent records.
        let h = harness();
        h.playbooks.put(close_playbook("pb-1", None)).await;
        h.objects.put_object(snapshot("obj-1", "open")).await;
        let ctx = ctx();

        let (first, second) = tokio::join!(
            h.orchestrator.execute_playbook("pb-1", "obj-1", &ctx),
            h.orchestrator.execute_playbook("pb-1", "obj-1", &ctx),
        );
        let first = first.unwrap();
        let second = second.unwrap();

        assert!(first.success);
        assert!(second.success);
        assert_ne!(first.execution_id, second.execution_id);
        assert_eq!(h.executions.record_count().await, 2);
        for id in [&first.execution_id, &second.execution_id] {
            let record = h.executions.get(id).await.unwrap();
            assert_eq!(record.status, ExecutionStatus::Completed);
        }
        // Last write wins on the object; both wrote the same status.
        assert_eq!(h.objects.get("obj-1").await.unwrap().status, "closed");
    }

    #[tokio::test]
    async fn test_execution_history() {
        let h = harness();
        h.playbooks.put(close_playbook("pb-1", None)).await;
        h.objects.put_object(snapshot("obj-1", "open")).await;
        let ctx = ctx();

        h.orchestrator
            .execute_playbook("pb-1", "obj-1", &ctx)
            .await
            .unwrap();
        h.orchestrator
            .execute_playbook("pb-1", "obj-1", &ctx)
            .await
            .unwrap();

        let history = h
            .orchestrator
            .execution_history("obj-1", &ctx)
            .await
            .unwrap();
        assert_eq!(history.len(), 2);

        // Other tenants see nothing.
        let other = ExecutionContext::new("org-2", "prop-1");
        let history = h
            .orchestrator
            .execution_history("obj-1", &other)
            .await
            .unwrap();
        assert!(history.is_empty());
    }
}
