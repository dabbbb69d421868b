// ABOUTME: Shared diagnostic context passed read-only to every task in a run
// ABOUTME: Holds the time window, optional focus filters, and an extension bag

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::{Map as JsonMap, Value as JsonValue};

/// How deep a run is expected to dig. Tasks may use this to scale the
/// specificity of their instructions; the engine itself only carries it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityLevel {
    Basic,
    #[default]
    Moderate,
    Advanced,
}

/// Read-mostly state shared by every task in a workflow run.
///
/// Constructed once per request and never mutated afterwards. Tasks publish
/// auxiliary data through their own result objects, not through this context.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticContext {
    pub problem_statement: String,
    pub earliest_time: String,
    pub latest_time: String,
    pub focus_index: Option<String>,
    pub focus_host: Option<String>,
    pub sourcetypes: Vec<String>,
    pub complexity_level: ComplexityLevel,
    extensions: JsonMap<String, JsonValue>,
}

impl DiagnosticContext {
    pub fn new(problem_statement: impl Into<String>) -> Self {
        Self {
            problem_statement: problem_statement.into(),
            earliest_time: "-24h".to_string(),
            latest_time: "now".to_string(),
            focus_index: None,
            focus_host: None,
            sourcetypes: Vec::new(),
            complexity_level: ComplexityLevel::default(),
            extensions: JsonMap::new(),
        }
    }

    pub fn with_time_window(
        mut self,
        earliest_time: impl Into<String>,
        latest_time: impl Into<String>,
    ) -> Self {
        self.earliest_time = earliest_time.into();
        self.latest_time = latest_time.into();
        self
    }

    pub fn with_focus_index(mut self, index: impl Into<String>) -> Self {
        self.focus_index = Some(index.into());
        self
    }

    pub fn with_focus_host(mut self, host: impl Into<String>) -> Self {
        self.focus_host = Some(host.into());
        self
    }

    pub fn with_sourcetypes(mut self, sourcetypes: Vec<String>) -> Self {
        self.sourcetypes = sourcetypes;
        self
    }

    pub fn with_complexity(mut self, level: ComplexityLevel) -> Self {
        self.complexity_level = level;
        self
    }

    pub fn with_extension(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.extensions.insert(key.into(), value);
        self
    }

    pub fn extension(&self, key: &str) -> Option<&JsonValue> {
        self.extensions.get(key)
    }

    /// Flatten the context to a JSON object. Extension entries sit alongside
    /// the named fields; named fields win on key collision.
    pub fn to_json(&self) -> JsonMap<String, JsonValue> {
        let mut map = self.extensions.clone();
        map.insert(
            "problem_statement".to_string(),
            JsonValue::String(self.problem_statement.clone()),
        );
        map.insert(
            "earliest_time".to_string(),
            JsonValue::String(self.earliest_time.clone()),
        );
        map.insert(
            "latest_time".to_string(),
            JsonValue::String(self.latest_time.clone()),
        );
        if let Some(ref index) = self.focus_index {
            map.insert("focus_index".to_string(), JsonValue::String(index.clone()));
        }
        if let Some(ref host) = self.focus_host {
            map.insert("focus_host".to_string(), JsonValue::String(host.clone()));
        }
        map.insert(
            "sourcetypes".to_string(),
            JsonValue::Array(
                self.sourcetypes
                    .iter()
                    .map(|s| JsonValue::String(s.clone()))
                    .collect(),
            ),
        );
        map.insert(
            "complexity_level".to_string(),
            serde_json::to_value(self.complexity_level).unwrap_or(JsonValue::Null),
        );
        map
    }

    /// Project only the fields a task declared in its `context_keys`.
    /// Undeclared keys are simply absent; absent optional fields reduce how
    /// specific the rendered instructions become, they are never an error.
    pub fn select(&self, keys: &BTreeSet<String>) -> JsonMap<String, JsonValue> {
        let full = self.to_json();
        keys.iter()
            .filter_map(|key| full.get(key).map(|value| (key.clone(), value.clone())))
            .collect()
    }
}
