use crate::agent::AgentError;
use crate::events::{Event, Host, HostError, Tone};
use crate::execution::Emitter;
use crate::tools::types::{AskRequest, AskResponse};
use crate::tools::Tool;
use async_trait::async_trait;
use serde_json::Value;

/// Question put to the user; renders by reading their answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AskQuestion {
    pub question: String,
}

impl Event for AskQuestion {
    fn render(&self, host: &mut dyn Host) -> Result<Option<Value>, HostError> {
        host.say(&self.question, Tone::Agent);
        let answer = host.input("You: ")?;
        Ok(Some(Value::String(answer)))
    }
}

/// Ask the user a question and return the answer.
pub struct Ask;

#[async_trait]
impl Tool for Ask {
    type Request = AskRequest;
    type Response = AskResponse;

    fn name(&self) -> &str {
        "Ask"
    }

    fn description(&self) -> &str {
        "Ask a question to the user."
    }

    async fn run(&self, request: AskRequest, emitter: &Emitter) -> Result<AskResponse, AgentError> {
        let reply = emitter
            .emit(AskQuestion {
                question: request.question,
            })
            .await?;
        let response = match reply {
            Some(Value::String(answer)) => answer,
            Some(other) => other.to_string(),
            None => String::new(),
        };
        Ok(AskResponse { response })
    }
}
