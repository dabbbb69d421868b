// ABOUTME: Result types for individual diagnostic tasks and whole workflow runs
// ABOUTME: Defines the worst-of status ordering and run-level aggregation

use std::time::Duration;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Per-task health classification. Aggregation uses the worst-of rule:
/// critical > error > warning > healthy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
    Error,
}

impl HealthStatus {
    pub fn severity(&self) -> u8 {
        match self {
            HealthStatus::Healthy => 0,
            HealthStatus::Warning => 1,
            HealthStatus::Error => 2,
            HealthStatus::Critical => 3,
        }
    }

    pub fn worst(self, other: HealthStatus) -> HealthStatus {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Warning => write!(f, "warning"),
            HealthStatus::Critical => write!(f, "critical"),
            HealthStatus::Error => write!(f, "error"),
        }
    }
}

/// One short structured statement produced by the reasoning step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub severity: HealthStatus,
    pub message: String,
}

impl Finding {
    pub fn new(severity: HealthStatus, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }
}

/// Produced exactly once per task by the task runner; immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticResult {
    pub task_id: String,
    pub status: HealthStatus,
    pub findings: Vec<Finding>,
    /// Raw capability outputs, keyed by capability name in invocation order.
    pub outputs: IndexMap<String, JsonValue>,
    pub started_at: DateTime<Utc>,
    pub execution_time: Duration,
    pub error: Option<String>,
    /// Retries recorded when a capability exhausted its policy; 0 for
    /// terminal failures and successes.
    pub retries: u32,
}

impl DiagnosticResult {
    pub fn error_result(
        task_id: impl Into<String>,
        message: impl Into<String>,
        started_at: DateTime<Utc>,
        execution_time: Duration,
    ) -> Self {
        let message = message.into();
        Self {
            task_id: task_id.into(),
            status: HealthStatus::Error,
            findings: vec![Finding::new(HealthStatus::Error, message.clone())],
            outputs: IndexMap::new(),
            started_at,
            execution_time,
            error: Some(message),
            retries: 0,
        }
    }

    pub fn cancelled(task_id: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        let execution_time = (Utc::now() - started_at).to_std().unwrap_or(Duration::ZERO);
        Self::error_result(task_id, "cancelled", started_at, execution_time)
    }

    pub fn is_error(&self) -> bool {
        self.status == HealthStatus::Error
    }

    /// True when downstream tasks should receive a degraded placeholder
    /// instead of this result's content.
    pub fn is_degraded_input(&self) -> bool {
        self.is_error()
    }
}

/// Terminal state of a whole run. Cancellation and timeout are conditions,
/// not errors: the partial result set is still returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Cancelled,
    TimedOut,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Cancelled => write!(f, "cancelled"),
            RunStatus::TimedOut => write!(f, "timed_out"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseTiming {
    pub phase: usize,
    pub task_ids: Vec<String>,
    pub duration: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowExecutionResult {
    pub workflow_id: String,
    pub run_id: String,
    pub run_status: RunStatus,
    pub overall_status: HealthStatus,
    /// One entry per task that was started, in phase completion order.
    pub results: IndexMap<String, DiagnosticResult>,
    pub phase_timings: Vec<PhaseTiming>,
    /// 1 - phases/tasks: how much concurrency the dependency graph allowed.
    pub parallel_efficiency: f64,
    pub summary: String,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
}

impl WorkflowExecutionResult {
    pub fn get_result(&self, task_id: &str) -> Option<&DiagnosticResult> {
        self.results.get(task_id)
    }

    pub fn worst_status(&self) -> HealthStatus {
        self.results
            .values()
            .map(|r| r.status)
            .fold(HealthStatus::Healthy, HealthStatus::worst)
    }

    pub fn count_with_status(&self, status: HealthStatus) -> usize {
        self.results.values().filter(|r| r.status == status).count()
    }

    /// Basic aggregation only; richer report formatting lives outside this
    /// engine.
    pub fn build_summary(&self) -> String {
        let healthy = self.count_with_status(HealthStatus::Healthy);
        let warning = self.count_with_status(HealthStatus::Warning);
        let critical = self.count_with_status(HealthStatus::Critical);
        let errored = self.count_with_status(HealthStatus::Error);

        format!(
            "{}: {} of {} tasks healthy ({} warning, {} critical, {} error) across {} phases; parallel efficiency {:.2}",
            self.run_status,
            healthy,
            self.results.len(),
            warning,
            critical,
            errored,
            self.phase_timings.len(),
            self.parallel_efficiency,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worst_of_ordering() {
        use HealthStatus::*;
        assert_eq!(Healthy.worst(Warning), Warning);
        assert_eq!(Warning.worst(Error), Error);
        assert_eq!(Error.worst(Critical), Critical);
        assert_eq!(Critical.worst(Healthy), Critical);
        assert_eq!(Critical.worst(Error), Critical);
        assert_eq!(Healthy.worst(Healthy), Healthy);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(HealthStatus::Healthy.to_string(), "healthy");
        assert_eq!(HealthStatus::Critical.to_string(), "critical");
        assert_eq!(RunStatus::TimedOut.to_string(), "timed_out");
        assert_eq!(RunStatus::Cancelled.to_string(), "cancelled");
    }

    #[test]
    fn test_error_result_records_message_and_time() {
        let result = DiagnosticResult::error_result(
            "check_load",
            "timeout",
            Utc::now(),
            Duration::from_millis(250),
        );

        assert_eq!(result.status, HealthStatus::Error);
        assert_eq!(result.error.as_deref(), Some("timeout"));
        assert_eq!(result.execution_time, Duration::from_millis(250));
        assert!(result.is_degraded_input());
        assert_eq!(result.retries, 0);
    }

    #[test]
    fn test_run_summary_counts() {
        let mut results = IndexMap::new();
        results.insert(
            "a".to_string(),
            DiagnosticResult {
                task_id: "a".to_string(),
                status: HealthStatus::Healthy,
                findings: vec![],
                outputs: IndexMap::new(),
                started_at: Utc::now(),
                execution_time: Duration::ZERO,
                error: None,
                retries: 0,
            },
        );
        results.insert(
            "b".to_string(),
            DiagnosticResult::error_result("b", "boom", Utc::now(), Duration::ZERO),
        );

        let run = WorkflowExecutionResult {
            workflow_id: "wf".to_string(),
            run_id: "run".to_string(),
            run_status: RunStatus::Completed,
            overall_status: HealthStatus::Error,
            results,
            phase_timings: vec![PhaseTiming {
                phase: 0,
                task_ids: vec!["a".to_string(), "b".to_string()],
                duration: Duration::ZERO,
            }],
            parallel_efficiency: 0.5,
            summary: String::new(),
            started_at: Utc::now(),
            duration: Duration::ZERO,
        };

        assert_eq!(run.worst_status(), HealthStatus::Error);
        let summary = run.build_summary();
        assert!(summary.contains("1 of 2 tasks healthy"));
        assert!(summary.contains("1 error"));
    }
}
