use crate::agent::AgentError;
use crate::model::{ChatModel, ChatRequest};
use crate::transcript::{ChatMessage, ToolCall};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// What one model call was shown
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<String>,
}

/// Model that plays back canned replies in order, for tests and dry runs
#[derive(Debug, Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<ChatMessage>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedModel {
    pub fn new(replies: impl IntoIterator<Item = ChatMessage>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Append a reply to the script.
    pub fn push(&self, reply: ChatMessage) {
        self.replies.lock().unwrap_or_else(|e| e.into_inner()).push_back(reply);
    }

    /// Append a reply carrying a single tool call.
    pub fn push_call(&self, name: &str, arguments: serde_json::Value) {
        self.push(ChatMessage::assistant_calls(vec![ToolCall::generated(name, arguments.to_string())]));
    }

    /// Requests seen so far, oldest first.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, request: ChatRequest<'_>) -> Result<ChatMessage, AgentError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedRequest {
                model: request.model.to_string(),
                messages: request.messages.to_vec(),
                tools: request.tools.iter().map(|tool| tool.name().to_string()).collect(),
            });

        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .ok_or_else(|| AgentError::Model("script exhausted".to_string()))
    }
}
