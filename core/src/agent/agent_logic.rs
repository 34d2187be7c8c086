//! The tool-calling loop every [`Agent`] runs.
//!
//! One invocation seeds a transcript with the directive and the request, then
//! alternates model calls and tool dispatch until the model answers through
//! the `Response` pseudo-tool or the iteration bound is hit.

use crate::agent::{Agent, AgentError};
use crate::events::{RequestEvent, ResponseEvent};
use crate::execution::Emitter;
use crate::model::ChatRequest;
use crate::tools::executor::{parse_response, Dispatch};
use crate::tools::registry::RESPONSE_TOOL;
use crate::tools::Tool;
use crate::transcript::{ChatMessage, ToolCall, Transcript};
use tracing::{debug, error, warn};

/// Reminder appended when the model answers without calling a tool.
pub const TOOL_CALL_REQUIRED: &str = "You must respond with a tool call. Use the Ask tool to ask user.";

/// Messages logged alongside a fatal error.
const FATAL_TAIL: usize = 4;

/// Seed message: the directive followed by the serialized request.
pub fn system_prompt<Req: RequestEvent>(directive: &str, request: &Req) -> Result<String, AgentError> {
    let request = serde_json::to_string(request).map_err(|e| AgentError::Serialization(e.to_string()))?;
    Ok(format!("{}\nrequest:\n{}", directive, request))
}

pub(crate) async fn run_loop<Req, Resp>(
    agent: &Agent<Req, Resp>,
    request: Req,
    emitter: &Emitter,
) -> Result<Resp, AgentError>
where
    Req: RequestEvent,
    Resp: ResponseEvent,
{
    let mut transcript = Transcript::new(system_prompt(agent.directive(), &request)?);
    match drive(agent, &mut transcript, emitter).await {
        Ok(response) => Ok(response),
        Err(e) => {
            error!(
                agent = Tool::name(agent),
                error = %e,
                tail = ?transcript.tail(FATAL_TAIL),
                "invocation aborted"
            );
            Err(e)
        }
    }
}

async fn drive<Req, Resp>(
    agent: &Agent<Req, Resp>,
    transcript: &mut Transcript,
    emitter: &Emitter,
) -> Result<Resp, AgentError>
where
    Req: RequestEvent,
    Resp: ResponseEvent,
{
    let name = Tool::name(agent);
    let tools = agent.exposed_tools();

    for iteration in 1..=agent.max_iter() {
        let reply = agent
            .model
            .complete(ChatRequest {
                model: agent.model_name(),
                messages: transcript.messages(),
                tools: &tools,
            })
            .await?;
        transcript.push(reply.clone());

        if let Some(content) = reply.content.as_deref().filter(|c| !c.trim().is_empty()) {
            debug!(agent = name, iteration, content, "model said");
        }
        if reply.tool_calls.is_empty() {
            debug!(agent = name, iteration, "reply without tool calls");
            transcript.push(ChatMessage::user(TOOL_CALL_REQUIRED));
            continue;
        }

        for call in &reply.tool_calls {
            if call.function.name == RESPONSE_TOOL {
                match parse_response::<Resp>(&call.function.arguments) {
                    Ok(response) => {
                        debug!(agent = name, iteration, ?response, "responding");
                        emitter.emit(response.clone()).await?;
                        return Ok(response);
                    }
                    Err(rejection) => {
                        warn!(agent = name, error = %rejection.error, "rejected Response arguments");
                        transcript.push(ChatMessage::tool_result(&call.id, rejection.to_json()));
                        continue;
                    }
                }
            }
            let outcome = dispatch(agent, call, emitter).await?;
            transcript.push(outcome);
        }
    }

    Err(AgentError::IterationsExhausted {
        agent: name.to_string(),
        max_iter: agent.max_iter(),
    })
}

/// Run one non-terminal tool call and build its tool-result message.
async fn dispatch<Req, Resp>(
    agent: &Agent<Req, Resp>,
    call: &ToolCall,
    emitter: &Emitter,
) -> Result<ChatMessage, AgentError>
where
    Req: RequestEvent,
    Resp: ResponseEvent,
{
    let tool = agent
        .tools()
        .get(&call.function.name)
        .ok_or_else(|| AgentError::UnknownTool {
            agent: Tool::name(agent).to_string(),
            name: call.function.name.clone(),
        })?;

    debug!(agent = Tool::name(agent), tool = %call.function.name, id = %call.id, "tool call");
    let content = match tool.dispatch(&call.function.arguments, emitter).await? {
        Dispatch::Completed(response) => response,
        Dispatch::Rejected(rejection) => {
            warn!(tool = %call.function.name, error = %rejection.error, "rejected tool arguments");
            rejection.to_json()
        }
    };
    Ok(ChatMessage::tool_result(&call.id, content))
}
