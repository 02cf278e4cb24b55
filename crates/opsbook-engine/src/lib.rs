//! Opsbook Engine
//!
//! Playbook automation for hospitality operations: given a domain
//! trigger, evaluates a boolean condition tree against a snapshot of a
//! business object and, if satisfied, executes an ordered list of
//! side-effecting actions, enforces service-level timers, and supports
//! retried and dry-run execution.
//!
//! This crate provides:
//! - Condition evaluator with AND/OR short-circuit semantics
//! - Action executor with per-action failure isolation
//! - Idempotent SLA enforcer
//! - Execution orchestrator and bounded retry manager
//! - Dry-run simulator for playbook authoring
//! - In-memory collaborator implementations for tests and tooling
//!
//! Persistence and outbound delivery are external collaborators,
//! consumed through the traits in `opsbook-core`.

pub mod actions;
pub mod config;
pub mod engine;
pub mod evaluator;
pub mod orchestrator;
pub mod retry;
pub mod simulator;
pub mod sla;
pub mod testing;

pub use actions::ActionExecutor;
pub use config::EngineConfig;
pub use engine::PlaybookEngine;
pub use evaluator::ConditionEvaluator;
pub use orchestrator::PlaybookOrchestrator;
pub use retry::RetryManager;
pub use simulator::{ActionCheck, DryRunSimulator, RuleCheck, SimulationReport, TestPlaybookRequest};
pub use sla::SlaEnforcer;
