//! Chat-completion backends the agent loop talks to.

use crate::agent::AgentError;
use crate::tools::executor::ToolDefinition;
use crate::transcript::ChatMessage;
use async_trait::async_trait;

pub mod mock;
pub mod openai;

pub use mock::{RecordedRequest, ScriptedModel};
pub use openai::{OpenAiClient, SamplingParams};

/// One round-trip: the full transcript and the tools the model may call
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub tools: &'a [ToolDefinition],
}

/// A chat-completion endpoint with function calling
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send the conversation and return the assistant's reply.
    async fn complete(&self, request: ChatRequest<'_>) -> Result<ChatMessage, AgentError>;
}
