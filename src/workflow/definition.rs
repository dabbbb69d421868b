// ABOUTME: Declarative workflow and task definition data model
// ABOUTME: Immutable once loaded; structural validation plus YAML round-trip

use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::error::{DefinitionError, Result};
use crate::retry::RetryPolicy;

fn default_version() -> String {
    "1.0".to_string()
}

fn default_reasoner() -> String {
    "rule_based".to_string()
}

/// One small unit of diagnostic work. Fully data-driven: the generic task
/// runner interprets this record, there are no per-type task structs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub task_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub instruction_template: String,
    #[serde(default)]
    pub required_capabilities: BTreeSet<String>,
    #[serde(default)]
    pub dependencies: BTreeSet<String>,
    #[serde(default)]
    pub context_keys: BTreeSet<String>,
    /// Arguments per declared capability. String leaves are rendered against
    /// the same data as the instruction template.
    #[serde(default)]
    pub capability_args: HashMap<String, JsonValue>,
    #[serde(with = "humantime_serde", default)]
    pub timeout: Option<Duration>,
    /// Per-task override; falls back to the workflow-level default.
    #[serde(default)]
    pub retry: Option<RetryPolicy>,
    /// Reasoning strategy applied to raw capability outputs.
    #[serde(default = "default_reasoner")]
    pub reasoner: String,
}

/// A resolved workflow: ordered task list plus provenance metadata. The task
/// order is the declaration order used for tie-breaking within a phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub workflow_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub source: Option<String>,
    pub tasks: Vec<TaskDefinition>,
    /// Workflow-level retry default for tasks without their own override.
    #[serde(default)]
    pub default_retry: Option<RetryPolicy>,
}

impl WorkflowDefinition {
    /// Parse a definition from YAML and validate its structure.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let definition: WorkflowDefinition = serde_yaml::from_str(content)?;
        definition.validate_structure()?;
        Ok(definition)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Structural checks that do not require graph analysis. Dependency
    /// existence and acyclicity are the scheduler's job and are re-checked
    /// there regardless of what the definition source promised.
    pub fn validate_structure(&self) -> Result<()> {
        if self.workflow_id.trim().is_empty() {
            return Err(DefinitionError::MissingField("workflow_id".to_string()));
        }
        if self.name.trim().is_empty() {
            return Err(DefinitionError::MissingField("name".to_string()));
        }
        if self.tasks.is_empty() {
            return Err(DefinitionError::EmptyWorkflow {
                workflow_id: self.workflow_id.clone(),
            });
        }

        let mut seen = HashSet::new();
        for task in &self.tasks {
            if task.task_id.trim().is_empty() {
                return Err(DefinitionError::MissingField("task_id".to_string()));
            }
            if !seen.insert(task.task_id.as_str()) {
                return Err(DefinitionError::DuplicateTask {
                    workflow_id: self.workflow_id.clone(),
                    task_id: task.task_id.clone(),
                });
            }
            if task.dependencies.contains(&task.task_id) {
                return Err(DefinitionError::SelfDependency {
                    task_id: task.task_id.clone(),
                });
            }
        }

        Ok(())
    }

    pub fn get_task(&self, task_id: &str) -> Option<&TaskDefinition> {
        self.tasks.iter().find(|t| t.task_id == task_id)
    }

    pub fn has_task(&self, task_id: &str) -> bool {
        self.get_task(task_id).is_some()
    }

    pub fn task_ids(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.task_id.as_str()).collect()
    }

    /// Effective retry policy for a task: task override, then workflow
    /// default, then the built-in default.
    pub fn retry_policy_for(&self, task: &TaskDefinition) -> RetryPolicy {
        task.retry
            .clone()
            .or_else(|| self.default_retry.clone())
            .unwrap_or_default()
    }
}
