// ABOUTME: Error types for workflow definition loading and resolution
// ABOUTME: Covers structural validation failures and registry lookup misses

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DefinitionError {
    #[error("Workflow not found: {query}")]
    WorkflowNotFound { query: String },

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Workflow {workflow_id} has no tasks")]
    EmptyWorkflow { workflow_id: String },

    #[error("Duplicate task id in workflow {workflow_id}: {task_id}")]
    DuplicateTask {
        workflow_id: String,
        task_id: String,
    },

    #[error("Task {task_id} depends on itself")]
    SelfDependency { task_id: String },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, DefinitionError>;
