//! Action execution.
//!
//! Each action runs in isolation: a failing action reports its error
//! and the orchestrator continues with the next one. Outbound
//! notifications and webhooks are emitted as intent events for
//! downstream delivery workers rather than performed inline.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::{json, Value};

use opsbook_core::{
    Action, AssignToUserConfig, Assignment, CreateObjectConfig, CreateTaskConfig, EngineError,
    EngineEvent, EngineResult, EventSink, ExecutionContext, NewObject, NewTask, ObjectStore,
    SendNotificationConfig, SetDueDateConfig, TaskStore, TriggerWebhookConfig,
    UpdateObjectStatusConfig,
};

/// Executes individual playbook actions against the store collaborators.
pub struct ActionExecutor {
    objects: Arc<dyn ObjectStore>,
    tasks: Arc<dyn TaskStore>,
    events: Arc<dyn EventSink>,
}

impl ActionExecutor {
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        tasks: Arc<dyn TaskStore>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            objects,
            tasks,
            events,
        }
    }

    /// Execute one action against the object identified by `object_id`.
    ///
    /// Returns an action-specific result payload on success.
    pub async fn execute(
        &self,
        action: &Action,
        object_id: &str,
        ctx: &ExecutionContext,
    ) -> EngineResult<Value> {
        tracing::debug!(action = action.kind(), object_id, "executing action");
        match action {
            Action::CreateObject(config) => self.create_object(config, ctx).await,
            Action::UpdateObjectStatus(config) => {
                self.update_object_status(config, object_id, ctx).await
            }
            Action::SetDueDate(config) => self.set_due_date(config, object_id, ctx).await,
            Action::AssignToUser(config) => self.assign_to_user(config, object_id, ctx).await,
            Action::CreateTask(config) => self.create_task(config, object_id, ctx).await,
            Action::SendNotification(config) => {
                self.send_notification(config, object_id, ctx).await
            }
            Action::TriggerWebhook(config) => self.trigger_webhook(config, object_id, ctx).await,
            Action::Unknown => Err(EngineError::UnknownAction("unknown".to_string())),
        }
    }

    async fn create_object(
        &self,
        config: &CreateObjectConfig,
        ctx: &ExecutionContext,
    ) -> EngineResult<Value> {
        let new_object = NewObject {
            object_type: config.object_type.clone(),
            status: config
                .status
                .clone()
                .unwrap_or_else(|| "open".to_string()),
            due_at: config.due_at,
            // Linkage is inherited from the trigger so spawned objects
            // stay attached to the same guest and reservation.
            guest_id: ctx.trigger_str("guest_id"),
            reservation_id: ctx.trigger_str("reservation_id"),
            attributes: config.attributes.clone(),
        };

        let id = self.objects.create(new_object, ctx).await?;
        Ok(json!({
            "object_id": id,
            "object_type": config.object_type,
        }))
    }

    async fn update_object_status(
        &self,
        config: &UpdateObjectStatusConfig,
        object_id: &str,
        ctx: &ExecutionContext,
    ) -> EngineResult<Value> {
        self.objects
            .update_status(object_id, &config.new_status, ctx)
            .await?;
        Ok(json!({ "status": config.new_status }))
    }

    async fn set_due_date(
        &self,
        config: &SetDueDateConfig,
        object_id: &str,
        ctx: &ExecutionContext,
    ) -> EngineResult<Value> {
        let due_at = if let Some(rel) = &config.relative_time {
            // Hours and minutes default to zero independently so a
            // minutes-only offset is honored.
            Utc::now()
                + Duration::hours(rel.hours.unwrap_or(0))
                + Duration::minutes(rel.minutes.unwrap_or(0))
        } else if let Some(due_at) = config.due_at {
            due_at
        } else {
            return Err(EngineError::Configuration(
                "set_due_date requires relative_time or due_at".to_string(),
            ));
        };

        self.objects.set_due_date(object_id, due_at, ctx).await?;
        Ok(json!({ "due_at": due_at }))
    }

    async fn assign_to_user(
        &self,
        config: &AssignToUserConfig,
        object_id: &str,
        ctx: &ExecutionContext,
    ) -> EngineResult<Value> {
        let mut user_ids: Vec<String> = config.user_id.iter().cloned().collect();
        user_ids.extend(config.user_ids.iter().cloned());

        if user_ids.is_empty() {
            return Err(EngineError::Configuration(
                "assign_to_user requires user_id or user_ids".to_string(),
            ));
        }

        let assignment = Assignment {
            user_ids: user_ids.clone(),
            assigned_at: Utc::now(),
            assigned_by: ctx.acting_user().to_string(),
        };
        self.objects.set_assignment(object_id, assignment, ctx).await?;
        Ok(json!({ "assignees": user_ids }))
    }

    async fn create_task(
        &self,
        config: &CreateTaskConfig,
        object_id: &str,
        ctx: &ExecutionContext,
    ) -> EngineResult<Value> {
        let title = config
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                EngineError::Configuration("create_task requires a title".to_string())
            })?;

        let task = NewTask {
            title: title.to_string(),
            description: config.description.clone(),
            task_type: config.task_type,
            priority: config.priority,
            related_entity: "object".to_string(),
            related_id: object_id.to_string(),
            due_at: config.due_at,
        };

        let task_id = self.tasks.create(task, ctx).await?;
        Ok(json!({ "task_id": task_id, "title": title }))
    }

    async fn send_notification(
        &self,
        config: &SendNotificationConfig,
        object_id: &str,
        ctx: &ExecutionContext,
    ) -> EngineResult<Value> {
        if config.recipients.is_empty() {
            return Err(EngineError::Configuration(
                "send_notification requires recipients".to_string(),
            ));
        }

        let payload = json!({
            "object_id": object_id,
            "recipients": config.recipients,
            "subject": config.subject,
            "body": config.body,
            "data": config.data,
        });
        self.events
            .emit(EngineEvent::new("notification.requested", payload, ctx))
            .await?;

        Ok(json!({ "queued": true, "recipients": config.recipients.len() }))
    }

    async fn trigger_webhook(
        &self,
        config: &TriggerWebhookConfig,
        object_id: &str,
        ctx: &ExecutionContext,
    ) -> EngineResult<Value> {
        if config.url.trim().is_empty() {
            return Err(EngineError::Configuration(
                "trigger_webhook requires a url".to_string(),
            ));
        }

        let payload = json!({
            "object_id": object_id,
            "url": config.url,
            "method": config.method.to_string(),
            "headers": config.headers,
            "payload": config.payload,
        });
        self.events
            .emit(EngineEvent::new("webhook.requested", payload, ctx))
            .await?;

        Ok(json!({ "queued": true, "url": config.url }))
    }
}
