use crate::config::Config;
use crate::events::{RequestEvent, ResponseEvent};
use crate::execution::Emitter;
use crate::model::ChatModel;
use crate::tools::executor::{schema_for, DynTool, ToolDefinition};
use crate::tools::executors::{
    Ask, Commit, DockerBuild, DockerRun, FileTypeCounts, ListFiles, ReadFile, SendRequest,
};
use crate::tools::registry::{ToolRegistry, RESPONSE_TOOL};
use crate::tools::Tool;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub mod agent_logic;
pub mod developer;
pub mod project_identifier;
pub mod tester;

#[cfg(test)]
mod tests;

pub use developer::{DeveloperRequest, DeveloperResponse};
pub use project_identifier::{ComponentType, IdentifyRequest, ProjectIdentity};
pub use tester::{TesterRequest, TesterResponse};

/// Default bound on model round-trips per invocation.
pub const DEFAULT_MAX_ITER: usize = 30;

/// Errors that abort an invocation
#[derive(Error, Debug, Clone)]
pub enum AgentError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Agent configuration error: {0}")]
    Configuration(String),

    #[error("{agent} was asked to call unknown tool `{name}`")]
    UnknownTool { agent: String, name: String },

    #[error("{agent} gave no response within {max_iter} iterations")]
    IterationsExhausted { agent: String, max_iter: usize },

    #[error("Tool {tool} failed: {message}")]
    Tool { tool: String, message: String },

    #[error("Host interaction failed: {0}")]
    Host(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Execution was detached from its driver")]
    Detached,

    #[error("Execution already finished")]
    Finished,
}

impl AgentError {
    pub fn tool(tool: impl Into<String>, message: impl std::fmt::Display) -> Self {
        AgentError::Tool {
            tool: tool.into(),
            message: message.to_string(),
        }
    }
}

/// A tool that answers by running its own tool-calling conversation.
///
/// The agent owns a set of sub-tools and finishes when the model calls the
/// implicit `Response` tool with arguments that parse into `Resp`.
pub struct Agent<Req, Resp> {
    name: String,
    description: String,
    directive: String,
    tools: ToolRegistry,
    model: Arc<dyn ChatModel>,
    model_name: String,
    max_iter: usize,
    _types: PhantomData<fn(Req) -> Resp>,
}

impl<Req: RequestEvent, Resp: ResponseEvent> Agent<Req, Resp> {
    pub fn builder(name: impl Into<String>) -> AgentBuilder<Req, Resp> {
        AgentBuilder {
            name: name.into(),
            description: String::new(),
            directive: String::new(),
            tools: Vec::new(),
            max_iter: DEFAULT_MAX_ITER,
            _types: PhantomData,
        }
    }

    pub fn directive(&self) -> &str {
        &self.directive
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn max_iter(&self) -> usize {
        self.max_iter
    }

    /// Owned tools plus the `Response` pseudo-tool, as sent to the model.
    pub fn exposed_tools(&self) -> Vec<ToolDefinition> {
        let mut definitions = self.tools.definitions();
        definitions.push(ToolDefinition::function(RESPONSE_TOOL, None, schema_for::<Resp>()));
        definitions
    }
}

#[async_trait]
impl<Req: RequestEvent, Resp: ResponseEvent> Tool for Agent<Req, Resp> {
    type Request = Req;
    type Response = Resp;

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn run(&self, request: Req, emitter: &Emitter) -> Result<Resp, AgentError> {
        agent_logic::run_loop(self, request, emitter).await
    }
}

/// Builder for [`Agent`]
pub struct AgentBuilder<Req, Resp> {
    name: String,
    description: String,
    directive: String,
    tools: Vec<Arc<dyn DynTool>>,
    max_iter: usize,
    _types: PhantomData<fn(Req) -> Resp>,
}

impl<Req: RequestEvent, Resp: ResponseEvent> AgentBuilder<Req, Resp> {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// System directive the conversation is seeded with.
    pub fn directive(mut self, directive: impl Into<String>) -> Self {
        self.directive = directive.into();
        self
    }

    pub fn tool<T: Tool>(mut self, tool: T) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    pub fn shared_tool(mut self, tool: Arc<dyn DynTool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn build(
        self,
        model: Arc<dyn ChatModel>,
        model_name: impl Into<String>,
    ) -> Result<Agent<Req, Resp>, AgentError> {
        if self.max_iter == 0 {
            return Err(AgentError::Configuration(format!("{}: max_iter must be at least 1", self.name)));
        }
        let mut tools = ToolRegistry::new();
        for tool in self.tools {
            tools
                .register_shared(tool)
                .map_err(|e| AgentError::Configuration(format!("{}: {}", self.name, e)))?;
        }
        Ok(Agent {
            name: self.name,
            description: self.description,
            directive: self.directive,
            tools,
            model,
            model_name: model_name.into(),
            max_iter: self.max_iter,
            _types: PhantomData,
        })
    }
}

/// Wires the built-in agents for one project
#[derive(Clone)]
pub struct AgentFactory {
    project_root: PathBuf,
    environment: BTreeMap<String, String>,
    model: Arc<dyn ChatModel>,
    model_name: String,
    request_timeout: Duration,
    log_window: Duration,
}

impl AgentFactory {
    pub fn new(project_root: impl Into<PathBuf>, model: Arc<dyn ChatModel>, model_name: impl Into<String>) -> Self {
        Self {
            project_root: project_root.into(),
            environment: BTreeMap::new(),
            model,
            model_name: model_name.into(),
            request_timeout: Duration::from_secs(30),
            log_window: Duration::from_secs(30),
        }
    }

    /// Factory with model name and timeouts taken from `config`.
    pub fn from_config(config: &Config, project_root: impl Into<PathBuf>, model: Arc<dyn ChatModel>) -> Self {
        Self::new(project_root, model, config.model_name.clone())
            .with_request_timeout(config.request_timeout)
            .with_log_window(config.log_window)
    }

    /// Environment passed to containers started while testing.
    pub fn with_environment(mut self, environment: BTreeMap<String, String>) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_log_window(mut self, window: Duration) -> Self {
        self.log_window = window;
        self
    }

    pub fn project_identifier(&self) -> Result<Agent<IdentifyRequest, ProjectIdentity>, AgentError> {
        Agent::builder(project_identifier::NAME)
            .description(project_identifier::DESCRIPTION)
            .directive(project_identifier::DIRECTIVE)
            .max_iter(project_identifier::MAX_ITER)
            .tool(ReadFile::new(&self.project_root))
            .tool(ListFiles::new(&self.project_root))
            .tool(FileTypeCounts::new(&self.project_root))
            .tool(Ask)
            .build(self.model.clone(), self.model_name.clone())
    }

    pub fn tester(&self) -> Result<Agent<TesterRequest, TesterResponse>, AgentError> {
        Agent::builder(tester::NAME)
            .description(tester::DESCRIPTION)
            .directive(tester::DIRECTIVE)
            .max_iter(tester::MAX_ITER)
            .tool(SendRequest::new(self.request_timeout)?)
            .tool(Ask)
            .tool(DockerRun::new(self.environment.clone()).with_log_window(self.log_window))
            .build(self.model.clone(), self.model_name.clone())
    }

    pub fn developer(&self) -> Result<Agent<DeveloperRequest, DeveloperResponse>, AgentError> {
        Agent::builder(developer::NAME)
            .description(developer::DESCRIPTION)
            .directive(developer::DIRECTIVE)
            .max_iter(developer::MAX_ITER)
            .tool(DockerBuild::new(&self.project_root))
            .tool(ReadFile::new(&self.project_root))
            .tool(Commit::new(&self.project_root))
            .tool(ListFiles::new(&self.project_root))
            .tool(self.project_identifier()?)
            .tool(self.tester()?)
            .tool(Ask)
            .build(self.model.clone(), self.model_name.clone())
    }
}
