use crate::agent::project_identifier::ProjectIdentity;
use crate::events::{Event, Host, HostError, RequestEvent, ResponseEvent, Tone};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const NAME: &str = "Tester";
pub const DESCRIPTION: &str = "Run a built image and report whether it works.";
pub const MAX_ITER: usize = 30;
pub const DIRECTIVE: &str = include_str!("../prompts/tester.md");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TesterRequest {
    pub project_identity: ProjectIdentity,
    pub image_tag: String,
    pub command: String,
    #[serde(default)]
    pub port_to_be_exposed: Option<u16>,
}

impl Event for TesterRequest {}
impl RequestEvent for TesterRequest {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TesterResponse {
    /// Is everything fine?
    pub successful: bool,
    /// Why the testing failed or succeeded.
    pub justification: String,
    pub logs: String,
}

impl Event for TesterResponse {
    fn render(&self, host: &mut dyn Host) -> Result<Option<Value>, HostError> {
        if self.successful {
            host.say("The given project has been successfully built", Tone::Success);
        } else {
            host.say("The given project has failed to build", Tone::Alert);
        }
        host.say(&self.justification, Tone::Plain);
        if !self.successful {
            host.say(&format!("logs: {}", self.logs), Tone::Log);
        }
        Ok(None)
    }
}

impl ResponseEvent for TesterResponse {}
