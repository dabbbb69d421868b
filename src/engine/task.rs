// ABOUTME: Generic data-driven executor for a single task definition
// ABOUTME: Renders instructions, invokes declared capabilities under retry, applies reasoning

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use indexmap::IndexMap;
use serde_json::{json, Value as JsonValue};
use tokio::time::{timeout, Instant};
use tracing::{debug, warn};

use super::result::DiagnosticResult;
use crate::capability::{CapabilityError, CapabilityRegistry, CapabilityScope};
use crate::context::DiagnosticContext;
use crate::reasoning::ReasonerRegistry;
use crate::retry::{with_retry, RetryError, RetryPolicy};
use crate::template::InstructionRenderer;
use crate::workflow::TaskDefinition;

const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(300);
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Executes exactly one task definition to completion. One runner instance
/// serves every task type; behavior is fully driven by the definition record.
/// Errors never escape `run`: every outcome is a `DiagnosticResult`.
pub struct TaskRunner {
    renderer: InstructionRenderer,
    reasoners: Arc<ReasonerRegistry>,
    default_timeout: Duration,
    call_timeout: Duration,
}

impl TaskRunner {
    pub fn new(reasoners: Arc<ReasonerRegistry>) -> Self {
        Self {
            renderer: InstructionRenderer::new(),
            reasoners,
            default_timeout: DEFAULT_TASK_TIMEOUT,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Default timeout for tasks whose definition carries none.
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Timeout for each individual capability call, applied inside the retry
    /// loop so a hung call surfaces as a retryable timeout.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub async fn run(
        &self,
        task: &TaskDefinition,
        context: &DiagnosticContext,
        dependency_results: &IndexMap<String, DiagnosticResult>,
        capabilities: &Arc<CapabilityRegistry>,
        retry_policy: &RetryPolicy,
    ) -> DiagnosticResult {
        let started_at = Utc::now();
        let timer = Instant::now();
        let task_timeout = task.timeout.unwrap_or(self.default_timeout);

        debug!(task_id = %task.task_id, "starting task");

        let outcome = timeout(
            task_timeout,
            self.run_inner(task, context, dependency_results, capabilities, retry_policy),
        )
        .await;

        let mut result = match outcome {
            Ok(result) => result,
            Err(_) => {
                warn!(task_id = %task.task_id, ?task_timeout, "task timed out");
                DiagnosticResult::error_result(&task.task_id, "timeout", started_at, Duration::ZERO)
            }
        };

        result.started_at = started_at;
        result.execution_time = timer.elapsed();
        result
    }

    async fn run_inner(
        &self,
        task: &TaskDefinition,
        context: &DiagnosticContext,
        dependency_results: &IndexMap<String, DiagnosticResult>,
        capabilities: &Arc<CapabilityRegistry>,
        retry_policy: &RetryPolicy,
    ) -> DiagnosticResult {
        let started_at = Utc::now();
        let data = Self::template_data(task, context, dependency_results);

        let instructions = match self.renderer.render(&task.instruction_template, &data) {
            Ok(instructions) => instructions,
            Err(e) => {
                return DiagnosticResult::error_result(
                    &task.task_id,
                    format!("instruction rendering failed: {}", e),
                    started_at,
                    Duration::ZERO,
                );
            }
        };

        let scope = capabilities.scoped(&task.required_capabilities);
        let mut outputs: IndexMap<String, JsonValue> = IndexMap::new();

        for name in &task.required_capabilities {
            let args = match self.capability_args(task, name, &data) {
                Ok(args) => args,
                Err(e) => {
                    return self.failed(
                        task,
                        outputs,
                        format!("argument rendering failed for {}: {}", name, e),
                        0,
                    );
                }
            };

            match self.invoke_with_retry(&scope, name, args, retry_policy).await {
                Ok(value) => {
                    outputs.insert(name.clone(), value);
                }
                Err(retry_error) => {
                    let retries = match &retry_error {
                        RetryError::Exhausted { attempts, .. } => attempts.saturating_sub(1),
                        RetryError::Terminal { .. } => 0,
                    };
                    warn!(task_id = %task.task_id, capability = %name, retries, "capability invocation failed");
                    return self.failed(task, outputs, retry_error.to_string(), retries);
                }
            }
        }

        let reasoner = match self.reasoners.get(&task.reasoner) {
            Some(reasoner) => reasoner,
            None => {
                return self.failed(
                    task,
                    outputs,
                    format!("unknown reasoning strategy: {}", task.reasoner),
                    0,
                );
            }
        };

        match reasoner.assess(task, &instructions, &outputs).await {
            Ok(assessment) => DiagnosticResult {
                task_id: task.task_id.clone(),
                status: assessment.status,
                findings: assessment.findings,
                outputs,
                started_at,
                execution_time: Duration::ZERO,
                error: None,
                retries: 0,
            },
            Err(e) => self.failed(task, outputs, format!("reasoning failed: {}", e), 0),
        }
    }

    async fn invoke_with_retry(
        &self,
        scope: &CapabilityScope,
        name: &str,
        args: JsonValue,
        policy: &RetryPolicy,
    ) -> Result<JsonValue, RetryError<CapabilityError>> {
        with_retry(
            || async {
                match timeout(self.call_timeout, scope.invoke(name, args.clone())).await {
                    Ok(result) => result,
                    Err(_) => Err(CapabilityError::Timeout {
                        name: name.to_string(),
                    }),
                }
            },
            policy,
        )
        .await
    }

    fn capability_args(
        &self,
        task: &TaskDefinition,
        name: &str,
        data: &JsonValue,
    ) -> crate::template::Result<JsonValue> {
        match task.capability_args.get(name) {
            Some(template) => self.renderer.render_value(template, data),
            None => Ok(json!({})),
        }
    }

    /// Capability or reasoning failure: contained here, converted into an
    /// error result that still carries whatever outputs were gathered.
    fn failed(
        &self,
        task: &TaskDefinition,
        outputs: IndexMap<String, JsonValue>,
        message: String,
        retries: u32,
    ) -> DiagnosticResult {
        let mut result =
            DiagnosticResult::error_result(&task.task_id, message, Utc::now(), Duration::ZERO);
        result.outputs = outputs;
        result.retries = retries;
        result
    }

    /// Data visible to the instruction template and capability args:
    /// the task's declared context keys, the problem statement, and each
    /// dependency's result (or a degraded placeholder).
    fn template_data(
        task: &TaskDefinition,
        context: &DiagnosticContext,
        dependency_results: &IndexMap<String, DiagnosticResult>,
    ) -> JsonValue {
        let mut deps = serde_json::Map::new();
        for dep_id in &task.dependencies {
            let entry = match dependency_results.get(dep_id) {
                Some(result) if !result.is_degraded_input() => json!({
                    "status": result.status.to_string(),
                    "findings": result
                        .findings
                        .iter()
                        .map(|f| f.message.clone())
                        .collect::<Vec<_>>(),
                    "outputs": result.outputs,
                }),
                other => Self::degraded_placeholder(dep_id, other),
            };
            deps.insert(dep_id.clone(), entry);
        }

        json!({
            "task": { "task_id": task.task_id, "name": task.name },
            "problem_statement": context.problem_statement,
            "context": context.select(&task.context_keys),
            "deps": deps,
        })
    }

    /// Stand-in for a dependency that errored, timed out, was cancelled, or
    /// never produced a result. The terminal status and error message are
    /// preserved so a reasoner can distinguish the kinds if it cares.
    fn degraded_placeholder(dep_id: &str, result: Option<&DiagnosticResult>) -> JsonValue {
        json!({
            "degraded": true,
            "status": result.map(|r| r.status.to_string()).unwrap_or_else(|| "missing".to_string()),
            "error": result.and_then(|r| r.error.clone()),
            "summary": format!("dependency '{}' did not complete successfully", dep_id),
        })
    }
}
