// ABOUTME: Common utilities and helpers for integration tests
// ABOUTME: Provides builders for workflows and programmable mock capabilities

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};

use triage::capability::{Capability, CapabilityError, CapabilityRegistry};
use triage::workflow::{TaskDefinition, WorkflowDefinition};

pub struct TestWorkflowBuilder {
    workflow_id: String,
    name: String,
    category: Option<String>,
    tasks: Vec<TaskDefinition>,
}

impl TestWorkflowBuilder {
    pub fn new(workflow_id: &str) -> Self {
        Self {
            workflow_id: workflow_id.to_string(),
            name: format!("Test workflow: {}", workflow_id),
            category: None,
            tasks: Vec::new(),
        }
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    pub fn add_task(mut self, task_id: &str, capability: &str, deps: &[&str]) -> Self {
        self.tasks.push(TaskDefinition {
            task_id: task_id.to_string(),
            name: task_id.to_string(),
            description: None,
            instruction_template: format!("Run {} for {{{{problem_statement}}}}", task_id),
            required_capabilities: [capability.to_string()].into_iter().collect(),
            dependencies: deps.iter().map(|d| d.to_string()).collect(),
            context_keys: ["earliest_time".to_string(), "latest_time".to_string()]
                .into_iter()
                .collect(),
            capability_args: HashMap::from([(
                capability.to_string(),
                json!({ "task": task_id }),
            )]),
            timeout: None,
            retry: None,
            reasoner: "rule_based".to_string(),
        });
        self
    }

    pub fn with_task_timeout(mut self, task_id: &str, timeout: Duration) -> Self {
        if let Some(task) = self.tasks.iter_mut().find(|t| t.task_id == task_id) {
            task.timeout = Some(timeout);
        }
        self
    }

    pub fn build(self) -> WorkflowDefinition {
        WorkflowDefinition {
            workflow_id: self.workflow_id,
            name: self.name,
            description: None,
            category: self.category,
            version: "1.0".to_string(),
            source: None,
            tasks: self.tasks,
            default_retry: None,
        }
    }
}

/// What a mock capability does when invoked.
#[derive(Clone)]
pub enum MockBehavior {
    /// Return this value.
    Succeed(JsonValue),
    /// Fail with a terminal error on every call.
    FailTerminal,
    /// Fail with a retryable error the first `n` calls, then succeed.
    FailTransientTimes(u32),
    /// Sleep before returning.
    Sleep(Duration),
}

pub struct MockCapability {
    name: String,
    behavior: MockBehavior,
    schema: JsonValue,
    pub calls: Arc<AtomicU32>,
    pub invocations: Arc<Mutex<Vec<JsonValue>>>,
}

impl MockCapability {
    pub fn new(name: &str, behavior: MockBehavior) -> Self {
        Self {
            name: name.to_string(),
            behavior,
            schema: json!({ "type": "object" }),
            calls: Arc::new(AtomicU32::new(0)),
            invocations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_schema(mut self, schema: JsonValue) -> Self {
        self.schema = schema;
        self
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Capability for MockCapability {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_schema(&self) -> JsonValue {
        self.schema.clone()
    }

    async fn invoke(&self, args: JsonValue) -> Result<JsonValue, CapabilityError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.invocations.lock().unwrap().push(args);
        match &self.behavior {
            MockBehavior::Succeed(value) => Ok(value.clone()),
            MockBehavior::FailTerminal => Err(CapabilityError::InvalidArgument {
                name: self.name.clone(),
                reason: "rejected by mock".to_string(),
            }),
            MockBehavior::FailTransientTimes(n) => {
                if call <= *n {
                    Err(CapabilityError::Unavailable {
                        name: self.name.clone(),
                        reason: format!("transient failure {}", call),
                    })
                } else {
                    Ok(json!({ "status": "recovered" }))
                }
            }
            MockBehavior::Sleep(duration) => {
                tokio::time::sleep(*duration).await;
                Ok(json!({ "status": "slow" }))
            }
        }
    }
}

/// Opt-in log output for debugging test failures, driven by RUST_LOG.
pub fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn registry_with(capabilities: Vec<MockCapability>) -> Arc<CapabilityRegistry> {
    let mut registry = CapabilityRegistry::new();
    for capability in capabilities {
        registry.register(Arc::new(capability)).unwrap();
    }
    Arc::new(registry)
}
