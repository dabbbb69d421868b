// ABOUTME: Error types for capability registration and invocation
// ABOUTME: Classifies failures as retryable (transient) or terminal for the retry layer

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CapabilityError {
    #[error("Capability not found: {name}")]
    NotFound { name: String },

    #[error("Capability already registered: {name}")]
    AlreadyRegistered { name: String },

    #[error("Capability not authorized for this task: {name}")]
    NotAuthorized { name: String },

    #[error("Invalid argument for capability {name}: {reason}")]
    InvalidArgument { name: String, reason: String },

    #[error("Invalid input schema for capability {name}: {reason}")]
    InvalidSchema { name: String, reason: String },

    #[error("Capability call timed out: {name}")]
    Timeout { name: String },

    #[error("Capability temporarily unavailable: {name} - {reason}")]
    Unavailable { name: String, reason: String },

    #[error("Capability rate limited: {name}")]
    RateLimited { name: String },

    #[error("Capability failed: {name} - {reason}")]
    Failed { name: String, reason: String },
}

impl CapabilityError {
    /// Transient failures are worth another attempt; everything else
    /// (validation, authorization, outright failure) propagates immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CapabilityError::Timeout { .. }
                | CapabilityError::Unavailable { .. }
                | CapabilityError::RateLimited { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, CapabilityError>;
