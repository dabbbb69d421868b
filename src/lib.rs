// ABOUTME: Main library module for the triage diagnostic workflow engine
// ABOUTME: Exports all core modules and provides the public API

pub mod capability;
pub mod context;
pub mod engine;
pub mod reasoning;
pub mod retry;
pub mod template;
pub mod workflow;

// Re-export commonly used types
pub use capability::{Capability, CapabilityError, CapabilityRegistry};
pub use context::{ComplexityLevel, DiagnosticContext};
pub use engine::{
    DiagnosticResult, ExecutionError, ExecutionPlan, HealthStatus, RunStatus, WorkflowExecutionResult,
    WorkflowExecutor,
};
pub use reasoning::{Assessment, Reasoner, ReasonerRegistry};
pub use retry::{with_retry, RetryError, RetryPolicy, Retryable};
pub use workflow::{DefinitionError, TaskDefinition, WorkflowDefinition, WorkflowRegistry};

// Error handling
pub type Result<T> = anyhow::Result<T>;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
