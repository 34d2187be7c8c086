use crate::agent::AgentError;
use crate::events::{Event, Host, HostError, Message, Tone};
use crate::execution::Emitter;
use crate::tools::executors::shell::run_command;
use crate::tools::types::{CommitRequest, CommitResponse};
use crate::tools::Tool;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::ffi::OsStr;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const CANCELLED_BY_USER: &str = "Operation cancelled by user.";

/// Asks the user to approve a patch before it is committed.
///
/// Renders to `None` on approval. On refusal it renders to a
/// [`CommitResponse`] carrying the user's reason, which the tool returns as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitConfirmation {
    pub patch: String,
    pub commit_message: String,
}

impl Event for CommitConfirmation {
    fn render(&self, host: &mut dyn Host) -> Result<Option<Value>, HostError> {
        host.say(
            &format!("Wants to make a commit, with commit message: {}", self.commit_message),
            Tone::Agent,
        );
        host.say("Displaying changes to be made by the patch", Tone::Info);
        for line in self.patch.lines() {
            host.say(&format!("  {}", line), Tone::Log);
        }

        if host.confirm("Apply patch?")? {
            return Ok(None);
        }
        let reason = host.input("You chose to cancel. Can you provide a reason why? >> ")?;
        Ok(Some(json!({
            "cancellation_reason": reason,
            "error": CANCELLED_BY_USER,
        })))
    }
}

/// Apply a zero-context patch to the index and commit it.
pub struct Commit {
    project_root: PathBuf,
}

impl Commit {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            project_root: project_root.as_ref().to_path_buf(),
        }
    }

    async fn apply(&self, request: &CommitRequest) -> Result<(), String> {
        // Removed when dropped, whichever way this returns.
        let mut patch_file = tempfile::NamedTempFile::new().map_err(|e| e.to_string())?;
        patch_file
            .write_all(request.patch.as_bytes())
            .and_then(|_| patch_file.flush())
            .map_err(|e| e.to_string())?;

        let apply = run_command(
            "git",
            [
                OsStr::new("apply"),
                OsStr::new("--recount"),
                OsStr::new("--unidiff-zero"),
                OsStr::new("--index"),
                patch_file.path().as_os_str(),
            ],
            Some(&self.project_root),
        )
        .await
        .map_err(|e| format!("failed to run git apply: {}", e))?;
        if !apply.success() {
            return Err(apply.failure_reason());
        }

        let commit = run_command(
            "git",
            ["commit", "--no-verify", "-m", request.commit_message.as_str()],
            Some(&self.project_root),
        )
        .await
        .map_err(|e| format!("failed to run git commit: {}", e))?;
        if !commit.success() {
            return Err(commit.failure_reason());
        }
        debug!(message = %request.commit_message, "committed patch");
        Ok(())
    }
}

#[async_trait]
impl Tool for Commit {
    type Request = CommitRequest;
    type Response = CommitResponse;

    fn name(&self) -> &str {
        "Commit"
    }

    fn description(&self) -> &str {
        "Git commit."
    }

    async fn run(&self, request: CommitRequest, emitter: &Emitter) -> Result<CommitResponse, AgentError> {
        let reply = emitter
            .emit(CommitConfirmation {
                patch: request.patch.clone(),
                commit_message: request.commit_message.clone(),
            })
            .await?;
        if let Some(refusal) = reply {
            let response: CommitResponse =
                serde_json::from_value(refusal).map_err(|e| AgentError::Serialization(e.to_string()))?;
            return Ok(response);
        }

        match self.apply(&request).await {
            Ok(()) => {
                emitter
                    .emit(Message::success(format!(
                        "Changes committed with the message: '{}'",
                        request.commit_message
                    )))
                    .await?;
                Ok(CommitResponse::default())
            }
            Err(error) => {
                warn!(error = %error, "commit failed");
                emitter
                    .emit(Message::alert("Commit failed. Attempting to retry..."))
                    .await?;
                Ok(CommitResponse {
                    cancellation_reason: None,
                    error: Some(error),
                })
            }
        }
    }
}
