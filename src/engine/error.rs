// ABOUTME: Error types for plan construction and workflow execution
// ABOUTME: Plan errors are pre-execution and fatal; task failures never surface here

use thiserror::Error;

use crate::workflow::DefinitionError;

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Task '{task_id}' depends on unknown task '{dependency}'")]
    UnknownDependency { task_id: String, dependency: String },

    #[error("Circular dependency detected among tasks: {tasks:?}")]
    CircularDependency { tasks: Vec<String> },

    #[error("Definition error: {0}")]
    Definition(#[from] DefinitionError),
}

pub type Result<T> = std::result::Result<T, ExecutionError>;
