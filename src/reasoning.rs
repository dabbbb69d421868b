// ABOUTME: Pluggable reasoning strategies turning raw capability outputs into findings
// ABOUTME: Strategy objects selected by name from the task definition, not subclassing

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value as JsonValue;

use crate::engine::result::{Finding, HealthStatus};
use crate::workflow::TaskDefinition;

/// Outcome of the reasoning step: a status classification plus the ordered
/// findings that justify it.
#[derive(Debug, Clone)]
pub struct Assessment {
    pub status: HealthStatus,
    pub findings: Vec<Finding>,
}

impl Assessment {
    pub fn healthy(message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Healthy,
            findings: vec![Finding::new(HealthStatus::Healthy, message)],
        }
    }
}

/// A reasoning strategy. The task runner feeds it the rendered instructions
/// and every raw capability output; it decides what the task found.
#[async_trait]
pub trait Reasoner: Send + Sync {
    fn name(&self) -> &'static str;

    async fn assess(
        &self,
        task: &TaskDefinition,
        instructions: &str,
        outputs: &IndexMap<String, JsonValue>,
    ) -> anyhow::Result<Assessment>;
}

pub struct ReasonerRegistry {
    reasoners: HashMap<String, Arc<dyn Reasoner>>,
}

impl ReasonerRegistry {
    pub fn new() -> Self {
        Self {
            reasoners: HashMap::new(),
        }
    }

    /// Registry pre-loaded with the built-in rule-based strategy.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(RuleBasedReasoner));
        registry
    }

    pub fn register(&mut self, reasoner: Arc<dyn Reasoner>) {
        self.reasoners
            .insert(reasoner.name().to_string(), reasoner);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Reasoner>> {
        self.reasoners.get(name).cloned()
    }
}

impl Default for ReasonerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Default strategy: inspect each capability output for conventional health
/// markers. Capabilities that want richer interpretation should ship their
/// own reasoner.
pub struct RuleBasedReasoner;

impl RuleBasedReasoner {
    fn assess_output(capability: &str, output: &JsonValue) -> Finding {
        if let Some(object) = output.as_object() {
            if let Some(status) = object.get("status").and_then(|v| v.as_str()) {
                let severity = match status.to_lowercase().as_str() {
                    "critical" | "down" | "failed" => HealthStatus::Critical,
                    "error" => HealthStatus::Error,
                    "warning" | "degraded" => HealthStatus::Warning,
                    _ => HealthStatus::Healthy,
                };
                return Finding::new(
                    severity,
                    format!("{} reported status '{}'", capability, status),
                );
            }

            if let Some(error) = object.get("error").filter(|v| !v.is_null()) {
                return Finding::new(
                    HealthStatus::Error,
                    format!("{} reported an error: {}", capability, error),
                );
            }

            if let Some(results) = object.get("results").and_then(|v| v.as_array()) {
                if results.is_empty() {
                    return Finding::new(
                        HealthStatus::Warning,
                        format!("{} returned no results for the window", capability),
                    );
                }
                return Finding::new(
                    HealthStatus::Healthy,
                    format!("{} returned {} results", capability, results.len()),
                );
            }
        }

        Finding::new(
            HealthStatus::Healthy,
            format!("{} completed normally", capability),
        )
    }
}

#[async_trait]
impl Reasoner for RuleBasedReasoner {
    fn name(&self) -> &'static str {
        "rule_based"
    }

    async fn assess(
        &self,
        _task: &TaskDefinition,
        _instructions: &str,
        outputs: &IndexMap<String, JsonValue>,
    ) -> anyhow::Result<Assessment> {
        if outputs.is_empty() {
            return Ok(Assessment::healthy("no capability output to assess"));
        }

        let findings: Vec<Finding> = outputs
            .iter()
            .map(|(capability, output)| Self::assess_output(capability, output))
            .collect();

        let status = findings
            .iter()
            .map(|f| f.severity)
            .fold(HealthStatus::Healthy, HealthStatus::worst);

        Ok(Assessment { status, findings })
    }
}
