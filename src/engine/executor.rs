// ABOUTME: Workflow executor with phase-barrier parallelism
// ABOUTME: Runs each dependency level concurrently, with cancellation and a run deadline

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use indexmap::IndexMap;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::error::ExecutionError;
use super::plan::DependencyGraph;
use super::result::{
    DiagnosticResult, HealthStatus, PhaseTiming, RunStatus, WorkflowExecutionResult,
};
use super::task::TaskRunner;
use crate::capability::CapabilityRegistry;
use crate::context::DiagnosticContext;
use crate::reasoning::ReasonerRegistry;
use crate::workflow::{WorkflowDefinition, WorkflowRegistry};

const DEFAULT_MAX_PARALLEL: usize = 8;

/// Orchestrates a full workflow run. Tasks are grouped into dependency
/// phases; everything within a phase runs concurrently and the next phase
/// only starts once the whole phase has settled (the phase barrier).
pub struct WorkflowExecutor {
    capabilities: Arc<CapabilityRegistry>,
    runner: Arc<TaskRunner>,
    max_parallel: usize,
    run_timeout: Option<Duration>,
}

impl WorkflowExecutor {
    pub fn new(capabilities: Arc<CapabilityRegistry>) -> Self {
        Self {
            capabilities,
            runner: Arc::new(TaskRunner::new(Arc::new(ReasonerRegistry::with_defaults()))),
            max_parallel: DEFAULT_MAX_PARALLEL,
            run_timeout: None,
        }
    }

    pub fn with_runner(mut self, runner: TaskRunner) -> Self {
        self.runner = Arc::new(runner);
        self
    }

    /// Upper bound on tasks executing at once, across a phase.
    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }

    /// Wall-clock deadline for the whole run. On expiry, in-flight tasks
    /// are cancelled and the run is reported as timed out.
    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = Some(timeout);
        self
    }

    /// Resolve a workflow by id or category and execute it.
    pub async fn execute_by_id(
        &self,
        registry: &WorkflowRegistry,
        query: &str,
        context: Arc<DiagnosticContext>,
    ) -> Result<WorkflowExecutionResult, ExecutionError> {
        let definition = registry.resolve(query)?;
        self.execute(definition, context).await
    }

    pub async fn execute(
        &self,
        definition: Arc<WorkflowDefinition>,
        context: Arc<DiagnosticContext>,
    ) -> Result<WorkflowExecutionResult, ExecutionError> {
        self.execute_with_cancellation(definition, context, CancellationToken::new())
            .await
    }

    /// Execute with an externally controlled cancellation token. Cancelling
    /// the token stops in-flight tasks at the next await point and prevents
    /// later phases from starting; results gathered so far are kept.
    #[instrument(skip_all, fields(workflow_id = %definition.workflow_id, run_id))]
    pub async fn execute_with_cancellation(
        &self,
        definition: Arc<WorkflowDefinition>,
        context: Arc<DiagnosticContext>,
        cancel: CancellationToken,
    ) -> Result<WorkflowExecutionResult, ExecutionError> {
        definition.validate_structure()?;
        let graph = DependencyGraph::from_definition(&definition)?;
        let plan = graph.execution_plan()?;

        let run_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("run_id", run_id.as_str());
        info!(
            tasks = plan.total_tasks,
            phases = plan.phase_count(),
            "starting workflow run"
        );

        let started_at = Utc::now();
        let timer = Instant::now();
        let deadline = self.run_timeout.map(|t| Instant::now() + t);
        let semaphore = Arc::new(Semaphore::new(self.max_parallel));

        let mut results: IndexMap<String, DiagnosticResult> = IndexMap::new();
        let mut phase_timings = Vec::with_capacity(plan.phase_count());
        let mut timed_out = false;

        for (phase, task_ids) in plan.phases.iter().enumerate() {
            if cancel.is_cancelled() {
                break;
            }

            debug!(phase, tasks = ?task_ids, "starting phase");
            let phase_timer = Instant::now();
            let prior = Arc::new(results.clone());

            let mut handles = Vec::with_capacity(task_ids.len());
            for task_id in task_ids {
                let task = definition
                    .get_task(task_id)
                    .cloned()
                    .ok_or_else(|| ExecutionError::UnknownDependency {
                        task_id: task_id.clone(),
                        dependency: task_id.clone(),
                    })?;
                let retry_policy = definition.retry_policy_for(&task);
                let runner = Arc::clone(&self.runner);
                let capabilities = Arc::clone(&self.capabilities);
                let context = Arc::clone(&context);
                let prior = Arc::clone(&prior);
                let semaphore = Arc::clone(&semaphore);
                let cancel = cancel.clone();

                handles.push(tokio::spawn(async move {
                    let _permit = match semaphore.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => return DiagnosticResult::cancelled(&task.task_id, Utc::now()),
                    };
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            DiagnosticResult::cancelled(&task.task_id, Utc::now())
                        }
                        result = runner.run(&task, &context, &prior, &capabilities, &retry_policy) => {
                            result
                        }
                    }
                }));
            }

            let mut join = Box::pin(join_all(handles));
            let joined = match deadline {
                Some(deadline) if !timed_out => {
                    tokio::select! {
                        joined = &mut join => joined,
                        _ = tokio::time::sleep_until(deadline) => {
                            warn!(phase, "run deadline reached, cancelling remaining tasks");
                            timed_out = true;
                            cancel.cancel();
                            // In-flight tasks settle as cancelled results
                            join.await
                        }
                    }
                }
                _ => join.await,
            };

            for (task_id, joined) in task_ids.iter().zip(joined) {
                let result = match joined {
                    Ok(result) => result,
                    Err(e) => {
                        warn!(task_id = %task_id, error = %e, "task panicked");
                        DiagnosticResult::error_result(
                            task_id,
                            format!("task panicked: {}", e),
                            Utc::now(),
                            Duration::ZERO,
                        )
                    }
                };
                results.insert(task_id.clone(), result);
            }

            phase_timings.push(PhaseTiming {
                phase,
                task_ids: task_ids.clone(),
                duration: phase_timer.elapsed(),
            });
        }

        let run_status = if timed_out {
            RunStatus::TimedOut
        } else if cancel.is_cancelled() {
            RunStatus::Cancelled
        } else {
            RunStatus::Completed
        };

        let overall_status = results
            .values()
            .fold(HealthStatus::Healthy, |acc, r| acc.worst(r.status));

        let mut run = WorkflowExecutionResult {
            workflow_id: definition.workflow_id.clone(),
            run_id,
            run_status,
            overall_status,
            results,
            phase_timings,
            parallel_efficiency: plan.parallel_efficiency(),
            summary: String::new(),
            started_at,
            duration: timer.elapsed(),
        };
        run.summary = run.build_summary();

        info!(
            run_status = %run.run_status,
            overall_status = %run.overall_status,
            duration = ?run.duration,
            "workflow run finished"
        );
        Ok(run)
    }
}
