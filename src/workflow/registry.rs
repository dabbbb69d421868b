// ABOUTME: Registry resolving workflow definitions by id or category
// ABOUTME: Explicit object constructed per process; no ambient singleton state

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, warn};

use super::definition::WorkflowDefinition;
use super::error::{DefinitionError, Result};

/// Thin resolution boundary over however definitions were loaded upstream.
/// The scheduler re-validates the DAG regardless of what this hands out.
pub struct WorkflowRegistry {
    definitions: IndexMap<String, Arc<WorkflowDefinition>>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self {
            definitions: IndexMap::new(),
        }
    }

    /// Validate and register a definition. A later registration with the same
    /// workflow_id replaces the earlier one.
    pub fn register(&mut self, definition: WorkflowDefinition) -> Result<()> {
        definition.validate_structure()?;
        let id = definition.workflow_id.clone();
        if self
            .definitions
            .insert(id.clone(), Arc::new(definition))
            .is_some()
        {
            warn!("Replaced workflow definition: {}", id);
        } else {
            debug!("Registered workflow definition: {}", id);
        }
        Ok(())
    }

    /// Resolve by workflow id first, then by category (first registered
    /// match wins, in registration order).
    pub fn resolve(&self, query: &str) -> Result<Arc<WorkflowDefinition>> {
        if let Some(definition) = self.definitions.get(query) {
            return Ok(Arc::clone(definition));
        }

        self.definitions
            .values()
            .find(|d| d.category.as_deref() == Some(query))
            .cloned()
            .ok_or_else(|| DefinitionError::WorkflowNotFound {
                query: query.to_string(),
            })
    }

    pub fn contains(&self, workflow_id: &str) -> bool {
        self.definitions.contains_key(workflow_id)
    }

    pub fn workflow_ids(&self) -> Vec<&str> {
        self.definitions.keys().map(|k| k.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl Default for WorkflowRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::definition::TaskDefinition;
    use std::collections::{BTreeSet, HashMap};

    fn definition(id: &str, category: &str) -> WorkflowDefinition {
        WorkflowDefinition {
            workflow_id: id.to_string(),
            name: id.to_string(),
            description: None,
            category: Some(category.to_string()),
            version: "1.0".to_string(),
            source: None,
            tasks: vec![TaskDefinition {
                task_id: "t1".to_string(),
                name: "t1".to_string(),
                description: None,
                instruction_template: "noop".to_string(),
                required_capabilities: BTreeSet::new(),
                dependencies: BTreeSet::new(),
                context_keys: BTreeSet::new(),
                capability_args: HashMap::new(),
                timeout: None,
                retry: None,
                reasoner: "rule_based".to_string(),
            }],
            default_retry: None,
        }
    }

    #[test]
    fn test_resolve_by_id() {
        let mut registry = WorkflowRegistry::new();
        registry.register(definition("wf_a", "performance")).unwrap();

        let resolved = registry.resolve("wf_a").unwrap();
        assert_eq!(resolved.workflow_id, "wf_a");
    }

    #[test]
    fn test_resolve_by_category_in_registration_order() {
        let mut registry = WorkflowRegistry::new();
        registry.register(definition("wf_a", "performance")).unwrap();
        registry.register(definition("wf_b", "performance")).unwrap();

        let resolved = registry.resolve("performance").unwrap();
        assert_eq!(resolved.workflow_id, "wf_a");
    }

    #[test]
    fn test_resolve_miss() {
        let registry = WorkflowRegistry::new();
        let result = registry.resolve("wf_missing");
        assert!(matches!(
            result,
            Err(DefinitionError::WorkflowNotFound { .. })
        ));
    }

    #[test]
    fn test_register_replaces_same_id() {
        let mut registry = WorkflowRegistry::new();
        registry.register(definition("wf_a", "performance")).unwrap();
        registry.register(definition("wf_a", "indexing")).unwrap();

        assert_eq!(registry.len(), 1);
        let resolved = registry.resolve("wf_a").unwrap();
        assert_eq!(resolved.category.as_deref(), Some("indexing"));
    }

    #[test]
    fn test_register_validates_structure() {
        let mut registry = WorkflowRegistry::new();
        let mut invalid = definition("wf_a", "performance");
        invalid.tasks.clear();
        assert!(registry.register(invalid).is_err());
        assert!(registry.is_empty());
    }
}
