use crate::events::{Event, Host, HostError, RequestEvent, ResponseEvent, Tone};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const NAME: &str = "ProjectIdentifier";
pub const DESCRIPTION: &str = "Identify the type of project.";
pub const MAX_ITER: usize = 10;
pub const DIRECTIVE: &str = include_str!("../prompts/project_identifier.md");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum ComponentType {
    Service,
    Job,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IdentifyRequest {}

impl Event for IdentifyRequest {}
impl RequestEvent for IdentifyRequest {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProjectIdentity {
    /// A SERVICE is designed to run forever and should never terminate.
    /// A JOB is designed to finish after some time.
    #[serde(default)]
    pub component_type: Option<ComponentType>,
    /// Primary programming language used by the project. Ex: Go, Python,
    /// Rust, Typescript.
    pub primary_programming_language: String,
    /// Framework the project is built on, if any. Ex: FastAPI, Gin, Flask,
    /// NestJS, React.
    #[serde(default)]
    pub framework: Option<String>,
    /// Exact version of the programming language, needed to pick the right
    /// base image.
    #[serde(default)]
    pub version: Option<String>,
    /// requirements.txt, poetry.lock, yarn.lock, Cargo.lock, go.mod, go.sum,
    /// pyproject.toml, etc. There can be several, like
    /// ["pyproject.toml", "poetry.lock"] or ["yarn.lock", "package.json"].
    #[serde(default)]
    pub dependency_files: Option<Vec<String>>,
    /// pip, poetry, yarn, go.mod, cargo, npm, setup.py.
    #[serde(default)]
    pub dependency_manager: Option<String>,
    /// Justification behind each response field.
    pub justification: String,
}

impl Event for ProjectIdentity {
    fn render(&self, host: &mut dyn Host) -> Result<Option<Value>, HostError> {
        let language = self.primary_programming_language.trim();
        if language.is_empty() {
            host.say("Unable to identify any programming language in the project.", Tone::Agent);
        } else {
            host.say(&format!("Identified a project using {}.", language), Tone::Agent);
            host.say(
                &format!(
                    "Framework identified: {}",
                    self.framework.as_deref().unwrap_or("Not applicable")
                ),
                Tone::Agent,
            );
            host.say(
                &format!(
                    "Dependency manager identified: {}",
                    self.dependency_manager.as_deref().unwrap_or("Not applicable")
                ),
                Tone::Agent,
            );
        }
        host.say(&self.justification, Tone::Plain);
        Ok(None)
    }
}

impl ResponseEvent for ProjectIdentity {}
