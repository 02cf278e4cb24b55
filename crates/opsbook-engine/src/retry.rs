//! Bounded retry of failed executions.

use std::sync::Arc;

use opsbook_core::{
    EngineError, EngineResult, ExecutionContext, ExecutionResult, ExecutionStatus, ExecutionStore,
};

use crate::orchestrator::PlaybookOrchestrator;

/// Re-runs failed executions against their original playbook and
/// target, cycling the same record so the attempt count survives.
pub struct RetryManager {
    executions: Arc<dyn ExecutionStore>,
    orchestrator: Arc<PlaybookOrchestrator>,
    default_max_retries: u32,
}

impl RetryManager {
    pub fn new(
        executions: Arc<dyn ExecutionStore>,
        orchestrator: Arc<PlaybookOrchestrator>,
        default_max_retries: u32,
    ) -> Self {
        Self {
            executions,
            orchestrator,
            default_max_retries,
        }
    }

    /// Retry a failed execution.
    ///
    /// The retry budget is checked before anything runs: an exhausted
    /// record is never re-executed. Each attempt derives a correlation
    /// identifier of the form `retry-{execution_id}-{attempt}` so
    /// downstream telemetry can tie attempts together.
    pub async fn retry_failed_execution(
        &self,
        execution_id: &str,
        ctx: &ExecutionContext,
        max_retries: Option<u32>,
    ) -> EngineResult<ExecutionResult> {
        let mut record = self
            .executions
            .find_by_id(execution_id)
            .await?
            .ok_or_else(|| EngineError::ExecutionNotFound(execution_id.to_string()))?;

        let max = max_retries.unwrap_or(self.default_max_retries);
        if record.retry_count >= max {
            return Err(EngineError::RetryExhausted {
                execution_id: execution_id.to_string(),
                attempts: record.retry_count,
            });
        }

        record.retry_count += 1;
        record.status = ExecutionStatus::Pending;
        self.executions.update(&record).await?;

        let attempt = record.retry_count;
        tracing::info!(
            execution_id,
            playbook_id = %record.playbook_id,
            attempt,
            "retrying failed execution"
        );

        let retry_ctx = ctx
            .clone()
            .with_correlation_id(format!("retry-{execution_id}-{attempt}"));
        self.orchestrator.execute_with_record(record, &retry_ctx).await
    }
}
