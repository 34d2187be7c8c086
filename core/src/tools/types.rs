use crate::events::{Event, Host, HostError, RequestEvent, ResponseEvent, Tone};
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Relative paths inside the project: must start with a letter, digit or dot.
fn check_project_path(field: &str, path: &str) -> Result<(), String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| Regex::new(r"^[a-zA-Z0-9.].*$").expect("static pattern"));
    if pattern.is_match(path) {
        Ok(())
    } else {
        Err(format!("{} `{}` must be relative to the project root and start with a letter, digit or `.`", field, path))
    }
}

// Ask

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AskRequest {
    pub question: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AskResponse {
    pub response: String,
}

// Commit

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CommitRequest {
    /// Unified diff to commit. Start with the `--- a/path` and `+++ b/path`
    /// header, then one hunk per file without context lines: `@@ -l,s +l,s @@`
    /// followed by `-` deletions and `+` additions. A modified line is a
    /// deletion plus an addition. Every hunk must change something, and the
    /// patch must end with a newline. It is applied with
    /// `git apply --recount --unidiff-zero`.
    pub patch: String,
    /// Describes the patch and the reason behind it. The patch must not contain
    /// changes the message does not describe.
    pub commit_message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CommitResponse {
    /// Why the user declined the commit.
    #[serde(default)]
    pub cancellation_reason: Option<String>,
    /// Error while applying the patch.
    #[serde(default)]
    pub error: Option<String>,
}

impl CommitRequest {
    pub fn validate_patch(&self) -> Result<(), String> {
        if self.patch.trim().is_empty() {
            return Err("patch must not be empty".to_string());
        }
        if self.commit_message.trim().is_empty() {
            return Err("commit_message must not be empty".to_string());
        }
        let has_old = self.patch.lines().any(|line| line.starts_with("--- "));
        let has_new = self.patch.lines().any(|line| line.starts_with("+++ "));
        if !(has_old && has_new) {
            return Err("patch must be a unified diff with '--- ' and '+++ ' file headers".to_string());
        }
        Ok(())
    }
}

// DockerBuild

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DockerBuildRequest {
    /// Dockerfile path relative to the project root.
    pub dockerfile_path: String,
    /// Tag for the built image.
    pub image_tag: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DockerBuildResponse {
    /// Error raised while building.
    #[serde(default)]
    pub error: Option<String>,
    /// Tail of the build logs.
    #[serde(default)]
    pub build_logs: Option<String>,
}

// DockerRun

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DockerRunRequest {
    pub image_tag: String,
    /// Ports to expose. Keys are container ports (`"8000"` or `"8000/tcp"`),
    /// values are the host ports to bind them to.
    #[serde(default)]
    pub ports: Option<BTreeMap<String, u16>>,
    pub command: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DockerRunResponse {
    /// Log lines of the container.
    #[serde(default)]
    pub logs: Option<Vec<String>>,
    /// Exit code if the container stopped. Absent while it is still running.
    #[serde(default)]
    pub exit_code: Option<i64>,
    /// Docker client error.
    #[serde(default)]
    pub client_error: Option<String>,
}

// FileTypeCounts

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FileTypeCountsRequest {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FileTypeCountsResponse {
    /// Counts of different types of files. Ex: {"py": 1} or {"c": 1}
    pub file_types: BTreeMap<String, usize>,
}

// ListFiles

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ListFilesRequest {
    /// Directory to search, relative to the project root. Use `.` for the root.
    pub sub_dir: String,
    /// Glob pattern matched against file names. Avoid passing `*`.
    pub pattern: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ListFilesResponse {
    /// File paths under the given directory.
    #[serde(default)]
    pub paths: Option<Vec<String>>,
    #[serde(default)]
    pub error: Option<String>,
}

// ReadFile

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReadFileRequest {
    /// File path to open, relative to the project root.
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Line {
    pub line_number: usize,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReadFileResponse {
    /// Content of the file.
    #[serde(default)]
    pub data: Option<Vec<Line>>,
    /// Error while opening the file.
    #[serde(default)]
    pub error: Option<String>,
}

// SendRequest

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SendRequestRequest {
    pub method: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SendRequestResponse {
    /// Response code.
    #[serde(default)]
    pub response_code: Option<u16>,
    /// Last characters of the response body.
    #[serde(default)]
    pub response_body: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl Event for AskRequest {}
impl RequestEvent for AskRequest {}
impl Event for AskResponse {}
impl ResponseEvent for AskResponse {}

impl Event for CommitRequest {}
impl RequestEvent for CommitRequest {
    fn validate(&self) -> Result<(), String> {
        self.validate_patch()
    }
}
impl Event for CommitResponse {}
impl ResponseEvent for CommitResponse {}

impl Event for DockerBuildRequest {}
impl RequestEvent for DockerBuildRequest {
    fn validate(&self) -> Result<(), String> {
        check_project_path("dockerfile_path", &self.dockerfile_path)
    }
}
impl Event for DockerBuildResponse {}
impl ResponseEvent for DockerBuildResponse {}

impl Event for DockerRunRequest {
    fn render(&self, host: &mut dyn Host) -> Result<Option<Value>, HostError> {
        let ports = match &self.ports {
            Some(ports) if !ports.is_empty() => ports
                .iter()
                .map(|(container, host_port)| format!("{}->{}", host_port, container))
                .collect::<Vec<_>>()
                .join(", "),
            _ => "not exposed".to_string(),
        };
        host.say(
            &format!(
                "Running the container. Image tag: {}, exposed ports: {}, command: {}",
                self.image_tag, ports, self.command
            ),
            Tone::Agent,
        );
        Ok(None)
    }
}
impl RequestEvent for DockerRunRequest {}
impl Event for DockerRunResponse {}
impl ResponseEvent for DockerRunResponse {}

impl Event for FileTypeCountsRequest {}
impl RequestEvent for FileTypeCountsRequest {}
impl Event for FileTypeCountsResponse {}
impl ResponseEvent for FileTypeCountsResponse {}

impl Event for ListFilesRequest {}
impl RequestEvent for ListFilesRequest {}
impl Event for ListFilesResponse {}
impl ResponseEvent for ListFilesResponse {}

impl Event for ReadFileRequest {}
impl RequestEvent for ReadFileRequest {
    fn validate(&self) -> Result<(), String> {
        check_project_path("path", &self.path)
    }
}
impl Event for ReadFileResponse {}
impl ResponseEvent for ReadFileResponse {}

impl Event for SendRequestRequest {}
impl RequestEvent for SendRequestRequest {}
impl Event for SendRequestResponse {}
impl ResponseEvent for SendRequestResponse {}
