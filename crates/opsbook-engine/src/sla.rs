//! SLA enforcement.
//!
//! Applies a playbook's service-level deadline to the target object.
//! The due-date write is set-if-unset, so re-running a playbook never
//! moves an existing deadline. Escalation scheduling is downstream: the
//! enforcer emits a tracking event carrying the escalation config.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;

use opsbook_core::{
    EngineEvent, EngineResult, Enforcements, EventSink, ExecutionContext, ObjectStore,
};

/// Applies SLA enforcement blocks after a playbook's actions run.
pub struct SlaEnforcer {
    objects: Arc<dyn ObjectStore>,
    events: Arc<dyn EventSink>,
    default_due_hours: i64,
}

impl SlaEnforcer {
    pub fn new(objects: Arc<dyn ObjectStore>, events: Arc<dyn EventSink>) -> Self {
        Self {
            objects,
            events,
            default_due_hours: 24,
        }
    }

    /// Override the default deadline offset.
    pub fn with_default_due_hours(mut self, hours: i64) -> Self {
        self.default_due_hours = hours;
        self
    }

    /// Apply the enforcement block, if any, to the object.
    ///
    /// Errors here fail the execution: a playbook that promises an SLA
    /// but cannot record it has not completed.
    pub async fn enforce(
        &self,
        enforcements: Option<&Enforcements>,
        object_id: &str,
        ctx: &ExecutionContext,
    ) -> EngineResult<()> {
        let Some(sla) = enforcements.and_then(|e| e.sla.as_ref()) else {
            return Ok(());
        };

        let due_in_hours = sla.due_in_hours.unwrap_or(self.default_due_hours);
        let due_at = Utc::now() + Duration::hours(due_in_hours);

        self.objects
            .set_due_date_if_unset(object_id, due_at, ctx)
            .await?;

        tracing::debug!(object_id, due_in_hours, "sla applied");
        self.events
            .emit(EngineEvent::new(
                "sla.applied",
                json!({
                    "object_id": object_id,
                    "due_at": due_at,
                    "due_in_hours": due_in_hours,
                    "escalation": sla.escalation,
                }),
                ctx,
            ))
            .await?;

        Ok(())
    }
}
