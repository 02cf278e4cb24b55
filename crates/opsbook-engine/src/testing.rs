//! In-memory collaborator implementations.
//!
//! Back the dry-run simulator's synthetic lookups, the `opsbook`
//! runner binary, and unit tests. Not wired to any real persistence.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use opsbook_core::{
    Assignment, EngineError, EngineEvent, EngineResult, EventSink, ExecutionContext,
    ExecutionRecord, ExecutionStore, NewObject, NewTask, ObjectSnapshot, ObjectStore, Playbook,
    PlaybookStore, Reservation, TaskStore,
};

/// In-memory business object store.
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: Mutex<HashMap<String, ObjectSnapshot>>,
    reservations: Mutex<HashMap<String, Reservation>>,
    assignments: Mutex<HashMap<String, Assignment>>,
    fail_due_date_writes: AtomicBool,
}

impl InMemoryObjectStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object snapshot.
    pub async fn put_object(&self, object: ObjectSnapshot) {
        self.objects.lock().await.insert(object.id.clone(), object);
    }

    /// Seed a reservation.
    pub async fn put_reservation(&self, reservation: Reservation) {
        self.reservations
            .lock()
            .await
            .insert(reservation.id.clone(), reservation);
    }

    /// Read back an object snapshot.
    pub async fn get(&self, id: &str) -> Option<ObjectSnapshot> {
        self.objects.lock().await.get(id).cloned()
    }

    /// Read back the assignment recorded for an object.
    pub async fn assignment(&self, id: &str) -> Option<Assignment> {
        self.assignments.lock().await.get(id).cloned()
    }

    /// Number of stored objects.
    pub async fn object_count(&self) -> usize {
        self.objects.lock().await.len()
    }

    /// Simulate storage failures for due-date writes.
    pub fn fail_due_date_writes(&self, fail: bool) {
        self.fail_due_date_writes.store(fail, Ordering::Relaxed);
    }

    fn check_due_date_failure(&self) -> EngineResult<()> {
        if self.fail_due_date_writes.load(Ordering::Relaxed) {
            return Err(EngineError::Store("due date write failed".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn find(
        &self,
        id: &str,
        _ctx: &ExecutionContext,
    ) -> EngineResult<Option<ObjectSnapshot>> {
        Ok(self.objects.lock().await.get(id).cloned())
    }

    async fn create(&self, object: NewObject, _ctx: &ExecutionContext) -> EngineResult<String> {
        let id = format!("obj-{}", uuid::Uuid::new_v4());
        let snapshot = ObjectSnapshot {
            id: id.clone(),
            object_type: object.object_type,
            status: object.status,
            due_at: object.due_at,
            guest_id: object.guest_id,
            reservation_id: object.reservation_id,
            attributes: object.attributes,
        };
        self.objects.lock().await.insert(id.clone(), snapshot);
        Ok(id)
    }

    async fn update_status(
        &self,
        id: &str,
        status: &str,
        _ctx: &ExecutionContext,
    ) -> EngineResult<()> {
        let mut objects = self.objects.lock().await;
        let object = objects
            .get_mut(id)
            .ok_or_else(|| EngineError::ObjectNotFound(id.to_string()))?;
        object.status = status.to_string();
        Ok(())
    }

    async fn set_due_date(
        &self,
        id: &str,
        due_at: DateTime<Utc>,
        _ctx: &ExecutionContext,
    ) -> EngineResult<()> {
        self.check_due_date_failure()?;
        let mut objects = self.objects.lock().await;
        let object = objects
            .get_mut(id)
            .ok_or_else(|| EngineError::ObjectNotFound(id.to_string()))?;
        object.due_at = Some(due_at);
        Ok(())
    }

    async fn set_due_date_if_unset(
        &self,
        id: &str,
        due_at: DateTime<Utc>,
        _ctx: &ExecutionContext,
    ) -> EngineResult<()> {
        self.check_due_date_failure()?;
        let mut objects = self.objects.lock().await;
        let object = objects
            .get_mut(id)
            .ok_or_else(|| EngineError::ObjectNotFound(id.to_string()))?;
        if object.due_at.is_none() {
            object.due_at = Some(due_at);
        }
        Ok(())
    }

    async fn set_assignment(
        &self,
        id: &str,
        assignment: Assignment,
        _ctx: &ExecutionContext,
    ) -> EngineResult<()> {
        if !self.objects.lock().await.contains_key(id) {
            return Err(EngineError::ObjectNotFound(id.to_string()));
        }
        self.assignments
            .lock()
            .await
            .insert(id.to_string(), assignment);
        Ok(())
    }

    async fn find_reservation(
        &self,
        id: &str,
        _ctx: &ExecutionContext,
    ) -> EngineResult<Option<Reservation>> {
        Ok(self.reservations.lock().await.get(id).cloned())
    }
}

/// In-memory task store.
#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: Mutex<Vec<NewTask>>,
}

impl InMemoryTaskStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read back all created tasks.
    pub async fn tasks(&self) -> Vec<NewTask> {
        self.tasks.lock().await.clone()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn create(&self, task: NewTask, _ctx: &ExecutionContext) -> EngineResult<String> {
        let mut tasks = self.tasks.lock().await;
        tasks.push(task);
        Ok(format!("task-{}", tasks.len()))
    }
}

/// In-memory playbook store.
#[derive(Default)]
pub struct InMemoryPlaybookStore {
    playbooks: Mutex<HashMap<String, Playbook>>,
}

impl InMemoryPlaybookStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a playbook definition.
    pub async fn put(&self, playbook: Playbook) {
        self.playbooks
            .lock()
            .await
            .insert(playbook.id.clone(), playbook);
    }
}

#[async_trait]
impl PlaybookStore for InMemoryPlaybookStore {
    async fn find_by_id(
        &self,
        id: &str,
        _ctx: &ExecutionContext,
    ) -> EngineResult<Option<Playbook>> {
        Ok(self.playbooks.lock().await.get(id).cloned())
    }
}

/// In-memory execution record store.
#[derive(Default)]
pub struct InMemoryExecutionStore {
    records: Mutex<HashMap<String, ExecutionRecord>>,
}

impl InMemoryExecutionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read back a record.
    pub async fn get(&self, id: &str) -> Option<ExecutionRecord> {
        self.records.lock().await.get(id).cloned()
    }

    /// Number of stored records.
    pub async fn record_count(&self) -> usize {
        self.records.lock().await.len()
    }
}

#[async_trait]
impl ExecutionStore for InMemoryExecutionStore {
    async fn create(&self, record: &ExecutionRecord) -> EngineResult<()> {
        self.records
            .lock()
            .await
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn update(&self, record: &ExecutionRecord) -> EngineResult<()> {
        self.records
            .lock()
            .await
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> EngineResult<Option<ExecutionRecord>> {
        Ok(self.records.lock().await.get(id).cloned())
    }

    async fn find_by_object(
        &self,
        object_id: &str,
        ctx: &ExecutionContext,
    ) -> EngineResult<Vec<ExecutionRecord>> {
        let mut records: Vec<ExecutionRecord> = self
            .records
            .lock()
            .await
            .values()
            .filter(|r| r.object_id == object_id && r.organization_id == ctx.organization_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(records)
    }
}

/// Event sink that records emitted events.
#[derive(Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<EngineEvent>>,
}

impl RecordingEventSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read back all emitted events.
    pub async fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().await.clone()
    }

    /// Read back emitted events of one type.
    pub async fn events_of_type(&self, event_type: &str) -> Vec<EngineEvent> {
        self.events
            .lock()
            .await
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EventSink for RecordingEventSink {
    async fn emit(&self, event: EngineEvent) -> EngineResult<()> {
        self.events.lock().await.push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn ctx() -> ExecutionContext {
        ExecutionContext::new("org-1", "prop-1")
    }

    #[tokio::test]
    async fn test_object_create_and_find() {
        let store = InMemoryObjectStore::new();
        let id = store
            .create(
                NewObject {
                    object_type: "maintenance_request".to_string(),
                    status: "open".to_string(),
                    due_at: None,
                    guest_id: None,
                    reservation_id: None,
                    attributes: vec![],
                },
                &ctx(),
            )
            .await
            .unwrap();

        let found = store.find(&id, &ctx()).await.unwrap().unwrap();
        assert_eq!(found.status, "open");
    }

    #[tokio::test]
    async fn test_set_due_date_if_unset_does_not_clobber() {
        let store = InMemoryObjectStore::new();
        let id = store
            .create(
                NewObject {
                    object_type: "t".to_string(),
                    status: "open".to_string(),
                    due_at: None,
                    guest_id: None,
                    reservation_id: None,
                    attributes: vec![],
                },
                &ctx(),
            )
            .await
            .unwrap();

        let first = Utc::now() + Duration::hours(1);
        let second = Utc::now() + Duration::hours(5);
        store.set_due_date_if_unset(&id, first, &ctx()).await.unwrap();
        store.set_due_date_if_unset(&id, second, &ctx()).await.unwrap();

        let object = store.get(&id).await.unwrap();
        assert_eq!(object.due_at, Some(first));
    }

    #[tokio::test]
    async fn test_execution_history_newest_first() {
        let store = InMemoryExecutionStore::new();
        let ctx = ctx();

        let mut older = ExecutionRecord::new("pb-1", "obj-1", &ctx);
        older.started_at = Utc::now() - Duration::hours(1);
        let newer = ExecutionRecord::new("pb-1", "obj-1", &ctx);

        store.create(&older).await.unwrap();
        store.create(&newer).await.unwrap();

        let history = store.find_by_object("obj-1", &ctx).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, newer.id);
    }
}
