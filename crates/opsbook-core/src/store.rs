//! Collaborator traits and the outbound event envelope.
//!
//! Persistence and delivery are external concerns. The engine talks to
//! them through these traits; every method takes the explicit
//! [`ExecutionContext`] for tenant scoping.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::ExecutionContext;
use crate::error::EngineResult;
use crate::execution::ExecutionRecord;
use crate::object::{Assignment, NewObject, ObjectSnapshot, Reservation};
use crate::playbook::Playbook;
use crate::task::NewTask;

/// Event envelope emitted to the outbound sink.
///
/// Fire-and-forget: the engine never consumes a delivery result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineEvent {
    /// Event type (e.g., "notification.requested", "sla.applied").
    pub event_type: String,

    /// Event-specific payload.
    pub payload: serde_json::Value,

    /// Owning organization (tenant).
    pub organization_id: String,

    /// Property within the organization.
    pub property_id: String,

    /// Correlation identifier of the originating invocation.
    pub correlation_id: String,

    /// When the event was emitted.
    pub timestamp: DateTime<Utc>,
}

impl EngineEvent {
    /// Create an event stamped from the invocation context.
    pub fn new(
        event_type: impl Into<String>,
        payload: serde_json::Value,
        ctx: &ExecutionContext,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
            organization_id: ctx.organization_id.clone(),
            property_id: ctx.property_id.clone(),
            correlation_id: ctx.correlation_id.clone(),
            timestamp: Utc::now(),
        }
    }
}

/// Business object persistence.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Load an object snapshot.
    async fn find(&self, id: &str, ctx: &ExecutionContext) -> EngineResult<Option<ObjectSnapshot>>;

    /// Create an object; returns its identifier.
    async fn create(&self, object: NewObject, ctx: &ExecutionContext) -> EngineResult<String>;

    /// Set the object's workflow status.
    async fn update_status(&self, id: &str, status: &str, ctx: &ExecutionContext) -> EngineResult<()>;

    /// Set the object's deadline unconditionally.
    async fn set_due_date(
        &self,
        id: &str,
        due_at: DateTime<Utc>,
        ctx: &ExecutionContext,
    ) -> EngineResult<()>;

    /// Set the object's deadline only if none is currently set.
    /// Backs SLA idempotence; the engine never reads the outcome.
    async fn set_due_date_if_unset(
        &self,
        id: &str,
        due_at: DateTime<Utc>,
        ctx: &ExecutionContext,
    ) -> EngineResult<()>;

    /// Persist an assignment record on the object.
    async fn set_assignment(
        &self,
        id: &str,
        assignment: Assignment,
        ctx: &ExecutionContext,
    ) -> EngineResult<()>;

    /// Load a reservation referenced by an object.
    async fn find_reservation(
        &self,
        id: &str,
        ctx: &ExecutionContext,
    ) -> EngineResult<Option<Reservation>>;
}

/// Task persistence.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Create a task; returns its identifier.
    async fn create(&self, task: NewTask, ctx: &ExecutionContext) -> EngineResult<String>;
}

/// Playbook definition lookup.
#[async_trait]
pub trait PlaybookStore: Send + Sync {
    /// Load a playbook by id, scoped to the tenant. The engine
    /// distinguishes a missing playbook from an inactive one.
    async fn find_by_id(&self, id: &str, ctx: &ExecutionContext) -> EngineResult<Option<Playbook>>;
}

/// Execution record persistence.
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// Persist a new record.
    async fn create(&self, record: &ExecutionRecord) -> EngineResult<()>;

    /// Persist changes to an existing record.
    async fn update(&self, record: &ExecutionRecord) -> EngineResult<()>;

    /// Load a record by id.
    async fn find_by_id(&self, id: &str) -> EngineResult<Option<ExecutionRecord>>;

    /// Load the records for a target object, newest first.
    async fn find_by_object(
        &self,
        object_id: &str,
        ctx: &ExecutionContext,
    ) -> EngineResult<Vec<ExecutionRecord>>;
}

/// Outbound event sink (notification/webhook delivery, SLA tracking).
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Emit an event. Delivery is not guaranteed by this engine.
    async fn emit(&self, event: EngineEvent) -> EngineResult<()>;
}
