pub mod loop_tests;

// Test utilities
use crate::agent::{Agent, AgentError};
use crate::events::{Event, Message, RequestEvent, ResponseEvent};
use crate::execution::Emitter;
use crate::model::ScriptedModel;
use crate::tools::tests::EchoTool;
use crate::tools::types::{AskRequest, AskResponse};
use crate::tools::Tool;
use crate::transcript::{ChatMessage, ToolCall};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Goal {
    pub goal: String,
}

impl Event for Goal {}
impl RequestEvent for Goal {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Verdict {
    pub answer: String,
}

impl Event for Verdict {}
impl ResponseEvent for Verdict {
    fn validate(&self) -> Result<(), String> {
        if self.answer.trim().is_empty() {
            return Err("answer must not be empty".to_string());
        }
        Ok(())
    }
}

/// Test helper to build an assistant reply carrying the given calls
pub fn calls(calls: &[(&str, &str, Value)]) -> ChatMessage {
    ChatMessage::assistant_calls(
        calls
            .iter()
            .map(|(id, name, args)| ToolCall::new(*id, *name, args.to_string()))
            .collect(),
    )
}

/// Test helper for a reply with a single call
pub fn call(id: &str, name: &str, args: Value) -> ChatMessage {
    calls(&[(id, name, args)])
}

/// Test helper for a reply with raw, possibly malformed, arguments
pub fn raw_call(id: &str, name: &str, arguments: &str) -> ChatMessage {
    ChatMessage::assistant_calls(vec![ToolCall::new(id, name, arguments)])
}

pub fn scripted(replies: Vec<ChatMessage>) -> Arc<ScriptedModel> {
    Arc::new(ScriptedModel::new(replies))
}

/// Test helper to build an agent that owns an `Echo` tool
pub fn echo_agent(model: &Arc<ScriptedModel>) -> Agent<Goal, Verdict> {
    Agent::builder("Solver")
        .description("Solves goals.")
        .directive("Answer the goal.")
        .tool(EchoTool { name: "Echo" })
        .build(model.clone(), "test-model")
        .expect("valid agent")
}

/// Tool that always fails
pub struct Failing;

#[async_trait]
impl Tool for Failing {
    type Request = AskRequest;
    type Response = AskResponse;

    fn name(&self) -> &str {
        "Failing"
    }

    fn description(&self) -> &str {
        "Fails."
    }

    async fn run(&self, _request: AskRequest, _emitter: &Emitter) -> Result<AskResponse, AgentError> {
        Err(AgentError::tool("Failing", "disk full"))
    }
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Tool that yields one message and records when its run is torn down
pub struct Lingering {
    pub dropped: Arc<AtomicBool>,
}

#[async_trait]
impl Tool for Lingering {
    type Request = AskRequest;
    type Response = AskResponse;

    fn name(&self) -> &str {
        "Lingering"
    }

    fn description(&self) -> &str {
        "Takes a while."
    }

    async fn run(&self, request: AskRequest, emitter: &Emitter) -> Result<AskResponse, AgentError> {
        let _guard = DropFlag(self.dropped.clone());
        emitter.emit(Message::info("working")).await?;
        Ok(AskResponse {
            response: request.question,
        })
    }
}
