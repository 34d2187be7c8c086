use crate::agent::AgentError;
use crate::events::{RequestEvent, ResponseEvent};
use crate::execution::Emitter;
use crate::tools::Tool;
use async_trait::async_trait;
use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Tool description in chat-completion `tools` wire shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema of the arguments.
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn function(name: impl Into<String>, description: Option<String>, parameters: Value) -> Self {
        Self {
            kind: "function".to_string(),
            function: FunctionDefinition {
                name: name.into(),
                description,
                parameters,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }
}

/// Structured error recorded when model-produced arguments do not fit a schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolParamParseError {
    pub error: String,
}

impl ToolParamParseError {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"error":"unprintable"}"#.to_string())
    }
}

/// Outcome of dispatching one tool call
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// The tool ran; JSON-encoded response.
    Completed(String),
    /// Arguments were rejected before the tool ran.
    Rejected(ToolParamParseError),
}

/// JSON Schema for `T` with subschemas inlined, ready for a function definition.
pub fn schema_for<T: JsonSchema>() -> Value {
    let generator = SchemaSettings::draft07()
        .with(|settings| {
            settings.inline_subschemas = true;
            settings.meta_schema = None;
        })
        .into_generator();
    let schema = generator.into_root_schema_for::<T>();
    let mut value = serde_json::to_value(schema).unwrap_or_else(|_| serde_json::json!({"type": "object"}));
    if let Some(object) = value.as_object_mut() {
        object.remove("title");
        object.remove("definitions");
    }
    value
}

fn decode<T: DeserializeOwned>(arguments: &str) -> Result<T, ToolParamParseError> {
    // Some models send an empty string for argument-less calls.
    let arguments = if arguments.trim().is_empty() { "{}" } else { arguments };
    serde_json::from_str(arguments).map_err(|e| ToolParamParseError { error: e.to_string() })
}

/// Parse model-produced arguments into a tool request.
pub fn parse_request<R: RequestEvent>(arguments: &str) -> Result<R, ToolParamParseError> {
    let request: R = decode(arguments)?;
    request.validate().map_err(|error| ToolParamParseError { error })?;
    Ok(request)
}

/// Parse model-produced arguments into an agent's terminal response.
pub fn parse_response<R: ResponseEvent>(arguments: &str) -> Result<R, ToolParamParseError> {
    let response: R = decode(arguments)?;
    response.validate().map_err(|error| ToolParamParseError { error })?;
    Ok(response)
}

/// Object-safe view of a [`Tool`], used for name-based dispatch.
#[async_trait]
pub trait DynTool: Send + Sync {
    fn name(&self) -> &str;

    fn definition(&self) -> ToolDefinition;

    /// Parse `arguments`, yield the request, run the tool and encode its
    /// response. Malformed arguments are reported, not raised.
    async fn dispatch(&self, arguments: &str, emitter: &Emitter) -> Result<Dispatch, AgentError>;
}

#[async_trait]
impl<T: Tool> DynTool for T {
    fn name(&self) -> &str {
        Tool::name(self)
    }

    fn definition(&self) -> ToolDefinition {
        let description = self.description().trim();
        ToolDefinition::function(
            Tool::name(self),
            (!description.is_empty()).then(|| description.to_string()),
            schema_for::<T::Request>(),
        )
    }

    async fn dispatch(&self, arguments: &str, emitter: &Emitter) -> Result<Dispatch, AgentError> {
        let request = match parse_request::<T::Request>(arguments) {
            Ok(request) => request,
            Err(rejection) => {
                debug!(tool = Tool::name(self), arguments, error = %rejection.error, "rejected tool arguments");
                return Ok(Dispatch::Rejected(rejection));
            }
        };
        debug!(tool = Tool::name(self), ?request, "dispatching");

        emitter.emit(request.clone()).await?;
        let response = self.run(request, emitter).await?;
        debug!(tool = Tool::name(self), ?response, "tool finished");

        let encoded = serde_json::to_string(&response).map_err(|e| AgentError::Serialization(e.to_string()))?;
        Ok(Dispatch::Completed(encoded))
    }
}
