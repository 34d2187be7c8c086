use crate::events::{Event, RequestEvent, ResponseEvent};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const NAME: &str = "Developer";
pub const DESCRIPTION: &str = "Make the project build and run in a container.";
pub const MAX_ITER: usize = 50;
pub const DIRECTIVE: &str = include_str!("../prompts/developer.md");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DeveloperRequest {
    /// Name of the project.
    pub name: String,
    /// Preferred command to run the project. This can be corrected later.
    #[serde(default)]
    pub command: Option<String>,
}

impl Event for DeveloperRequest {}
impl RequestEvent for DeveloperRequest {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DeveloperResponse {
    /// Final command that runs the project inside the container. Must match
    /// the Dockerfile's ENTRYPOINT and CMD.
    pub command: String,
    /// Path of the Dockerfile.
    pub dockerfile_path: String,
    /// Port the container listens on.
    #[serde(default)]
    pub port: Option<u16>,
    /// Why the response was sent back.
    pub justification: String,
}

impl Event for DeveloperResponse {}
impl ResponseEvent for DeveloperResponse {}
