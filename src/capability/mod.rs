// ABOUTME: Capability registry mapping names to async operations with fixed contracts
// ABOUTME: Provides least-privilege scoped views so each task sees only declared capabilities

pub mod error;

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use jsonschema::Validator;
use serde_json::Value as JsonValue;
use tracing::debug;

pub use error::{CapabilityError, Result};

/// A named, externally-supplied operation with a fixed argument and output
/// contract. Capabilities are the sole channel through which the engine
/// touches any outside system.
#[async_trait]
pub trait Capability: Send + Sync {
    fn name(&self) -> &str;

    /// JSON Schema the invocation arguments must satisfy.
    fn input_schema(&self) -> JsonValue;

    /// Shape of a successful result, for documentation and downstream
    /// consumers. Not enforced on the hot path.
    fn output_schema(&self) -> JsonValue {
        serde_json::json!({})
    }

    async fn invoke(&self, args: JsonValue) -> Result<JsonValue>;
}

struct RegisteredCapability {
    capability: Arc<dyn Capability>,
    validator: Validator,
}

/// Registry of every capability the process exposes. Read-only after
/// registration, so many tasks may invoke through it concurrently.
pub struct CapabilityRegistry {
    capabilities: HashMap<String, RegisteredCapability>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self {
            capabilities: HashMap::new(),
        }
    }

    /// Bind a capability under its unique name, compiling its input schema.
    pub fn register(&mut self, capability: Arc<dyn Capability>) -> Result<()> {
        let name = capability.name().to_string();
        if self.capabilities.contains_key(&name) {
            return Err(CapabilityError::AlreadyRegistered { name });
        }

        let schema = capability.input_schema();
        let validator =
            jsonschema::validator_for(&schema).map_err(|e| CapabilityError::InvalidSchema {
                name: name.clone(),
                reason: e.to_string(),
            })?;

        debug!("Registered capability: {}", name);
        self.capabilities.insert(
            name,
            RegisteredCapability {
                capability,
                validator,
            },
        );
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.capabilities.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.capabilities.keys().map(|k| k.as_str()).collect()
    }

    /// Validate args against the capability's input schema and forward to the
    /// operation. The operation's own error comes back unchanged so the retry
    /// layer can classify it.
    pub async fn invoke(&self, name: &str, args: JsonValue) -> Result<JsonValue> {
        let registered =
            self.capabilities
                .get(name)
                .ok_or_else(|| CapabilityError::NotFound {
                    name: name.to_string(),
                })?;

        if let Err(validation_error) = registered.validator.validate(&args) {
            return Err(CapabilityError::InvalidArgument {
                name: name.to_string(),
                reason: validation_error.to_string(),
            });
        }

        registered.capability.invoke(args).await
    }

    /// Restrict to the names a task declared in `required_capabilities`.
    pub fn scoped(self: &Arc<Self>, allowed: &BTreeSet<String>) -> CapabilityScope {
        CapabilityScope {
            registry: Arc::clone(self),
            allowed: allowed.clone(),
        }
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Least-privilege view of the registry handed to a single task. Invoking any
/// name outside the declared set is rejected before the registry is consulted.
#[derive(Clone)]
pub struct CapabilityScope {
    registry: Arc<CapabilityRegistry>,
    allowed: BTreeSet<String>,
}

impl CapabilityScope {
    pub async fn invoke(&self, name: &str, args: JsonValue) -> Result<JsonValue> {
        if !self.allowed.contains(name) {
            return Err(CapabilityError::NotAuthorized {
                name: name.to_string(),
            });
        }
        self.registry.invoke(name, args).await
    }

    pub fn allowed_names(&self) -> impl Iterator<Item = &str> {
        self.allowed.iter().map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoCapability;

    #[async_trait]
    impl Capability for EchoCapability {
        fn name(&self) -> &str {
            "echo"
        }

        fn input_schema(&self) -> JsonValue {
            json!({
                "type": "object",
                "properties": { "message": { "type": "string" } },
                "required": ["message"]
            })
        }

        async fn invoke(&self, args: JsonValue) -> Result<JsonValue> {
            Ok(json!({ "echoed": args["message"] }))
        }
    }

    fn registry_with_echo() -> Arc<CapabilityRegistry> {
        let mut registry = CapabilityRegistry::new();
        registry.register(Arc::new(EchoCapability)).unwrap();
        Arc::new(registry)
    }

    #[tokio::test]
    async fn test_invoke_valid_args() {
        let registry = registry_with_echo();
        let result = registry
            .invoke("echo", json!({ "message": "hello" }))
            .await
            .unwrap();
        assert_eq!(result, json!({ "echoed": "hello" }));
    }

    #[tokio::test]
    async fn test_invoke_rejects_schema_violation() {
        let registry = registry_with_echo();
        let result = registry.invoke("echo", json!({ "message": 42 })).await;
        assert!(matches!(
            result,
            Err(CapabilityError::InvalidArgument { .. })
        ));

        let result = registry.invoke("echo", json!({})).await;
        assert!(matches!(
            result,
            Err(CapabilityError::InvalidArgument { .. })
        ));
    }

    #[tokio::test]
    async fn test_invoke_unknown_name() {
        let registry = registry_with_echo();
        let result = registry.invoke("missing", json!({})).await;
        assert!(matches!(result, Err(CapabilityError::NotFound { .. })));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = CapabilityRegistry::new();
        registry.register(Arc::new(EchoCapability)).unwrap();
        let result = registry.register(Arc::new(EchoCapability));
        assert!(matches!(
            result,
            Err(CapabilityError::AlreadyRegistered { .. })
        ));
    }

    #[tokio::test]
    async fn test_scope_enforces_declared_capabilities() {
        let registry = registry_with_echo();
        let scope = registry.scoped(&BTreeSet::new());

        let result = scope.invoke("echo", json!({ "message": "hi" })).await;
        assert!(matches!(result, Err(CapabilityError::NotAuthorized { .. })));

        let allowed: BTreeSet<String> = ["echo".to_string()].into_iter().collect();
        let scope = registry.scoped(&allowed);
        let result = scope.invoke("echo", json!({ "message": "hi" })).await;
        assert!(result.is_ok());
    }
}
