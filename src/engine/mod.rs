// ABOUTME: Execution engine for diagnostic workflows
// ABOUTME: Dependency planning, per-task execution, and phase-parallel orchestration

pub mod error;
pub mod executor;
pub mod plan;
pub mod result;
pub mod task;

pub use error::ExecutionError;
pub use executor::WorkflowExecutor;
pub use plan::{DependencyGraph, ExecutionPlan};
pub use result::{
    DiagnosticResult, Finding, HealthStatus, PhaseTiming, RunStatus, WorkflowExecutionResult,
};
pub use task::TaskRunner;
