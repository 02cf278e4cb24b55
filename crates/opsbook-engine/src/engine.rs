//! Engine facade.

use std::sync::Arc;

use opsbook_core::{
    EngineResult, EventSink, ExecutionContext, ExecutionRecord, ExecutionResult, ExecutionStore,
    ObjectStore, PlaybookStore, TaskStore,
};

use crate::config::EngineConfig;
use crate::orchestrator::PlaybookOrchestrator;
use crate::retry::RetryManager;
use crate::simulator::{DryRunSimulator, SimulationReport, TestPlaybookRequest};

/// Entry point bundling orchestration, retry, and simulation behind
/// one surface. Collaborators are injected once at construction.
pub struct PlaybookEngine {
    orchestrator: Arc<PlaybookOrchestrator>,
    retry: RetryManager,
    simulator: DryRunSimulator,
}

impl PlaybookEngine {
    /// Build an engine with default configuration.
    pub fn new(
        playbooks: Arc<dyn PlaybookStore>,
        objects: Arc<dyn ObjectStore>,
        tasks: Arc<dyn TaskStore>,
        executions: Arc<dyn ExecutionStore>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self::with_config(
            playbooks,
            objects,
            tasks,
            executions,
            events,
            EngineConfig::default(),
        )
    }

    /// Build an engine with explicit configuration.
    pub fn with_config(
        playbooks: Arc<dyn PlaybookStore>,
        objects: Arc<dyn ObjectStore>,
        tasks: Arc<dyn TaskStore>,
        executions: Arc<dyn ExecutionStore>,
        events: Arc<dyn EventSink>,
        config: EngineConfig,
    ) -> Self {
        let orchestrator = Arc::new(PlaybookOrchestrator::new(
            playbooks.clone(),
            objects,
            tasks,
            executions.clone(),
            events,
            &config,
        ));
        let retry = RetryManager::new(
            executions.clone(),
            orchestrator.clone(),
            config.default_max_retries,
        );
        let simulator = DryRunSimulator::new(playbooks, executions);
        Self {
            orchestrator,
            retry,
            simulator,
        }
    }

    /// Run a playbook against a target object.
    pub async fn execute_playbook(
        &self,
        playbook_id: &str,
        object_id: &str,
        ctx: &ExecutionContext,
    ) -> EngineResult<ExecutionResult> {
        self.orchestrator
            .execute_playbook(playbook_id, object_id, ctx)
            .await
    }

    /// Retry a failed execution within the retry budget.
    pub async fn retry_failed_execution(
        &self,
        execution_id: &str,
        ctx: &ExecutionContext,
        max_retries: Option<u32>,
    ) -> EngineResult<ExecutionResult> {
        self.retry
            .retry_failed_execution(execution_id, ctx, max_retries)
            .await
    }

    /// Load the execution history for a target object, newest first.
    pub async fn execution_history(
        &self,
        object_id: &str,
        ctx: &ExecutionContext,
    ) -> EngineResult<Vec<ExecutionRecord>> {
        self.orchestrator.execution_history(object_id, ctx).await
    }

    /// Simulate a playbook against synthetic test data.
    pub async fn test_playbook(
        &self,
        request: &TestPlaybookRequest,
        ctx: &ExecutionContext,
    ) -> EngineResult<SimulationReport> {
        self.simulator.test_playbook(request, ctx).await
    }
}
