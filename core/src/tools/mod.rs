pub mod types;
pub mod executor;
pub mod registry;
pub mod executors;

#[cfg(test)]
pub mod tests;

use crate::agent::AgentError;
use crate::events::{RequestEvent, ResponseEvent};
use crate::execution::Emitter;
use async_trait::async_trait;

pub use types::*;
pub use executor::{Dispatch, DynTool, ToolDefinition, ToolParamParseError};
pub use registry::{RegistryError, ToolRegistry};

/// A named, schema-typed unit of work the model can invoke.
///
/// `run` consumes one request, may yield any number of events through the
/// emitter, and finishes with exactly one response. Instances can be invoked
/// repeatedly, one invocation at a time.
#[async_trait]
pub trait Tool: Send + Sync + 'static {
    type Request: RequestEvent;
    type Response: ResponseEvent;

    /// Dispatch name, unique within the owning agent.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    async fn run(&self, request: Self::Request, emitter: &Emitter) -> Result<Self::Response, AgentError>;
}
