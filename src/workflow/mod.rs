// ABOUTME: Workflow definition model and resolution registry
// ABOUTME: The only external data format this engine consumes

pub mod definition;
pub mod error;
pub mod registry;

pub use definition::{TaskDefinition, WorkflowDefinition};
pub use error::{DefinitionError, Result};
pub use registry::WorkflowRegistry;
