pub mod http_executor_tests;
pub mod registry_tests;

// Test utilities
use crate::agent::AgentError;
use crate::events::tests::RecordingHost;
use crate::events::{Event, Message};
use crate::execution::{Execution, Step};
use crate::tools::Tool;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;

/// Test helper to create a temporary directory
pub async fn create_temp_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

/// Test helper to create a file (and its parent directories) with content
pub async fn create_temp_file(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.expect("Failed to create parent directory");
    }
    fs::write(&path, content).await.expect("Failed to write temp file");
    path
}

/// Test helper to run a tool to completion, rendering every event on `host`
pub async fn drive<T: Tool>(
    tool: T,
    request: T::Request,
    host: &mut RecordingHost,
) -> (Result<T::Response, AgentError>, Vec<Box<dyn Event>>) {
    let mut execution = Execution::start(Arc::new(tool), request);
    let mut events = Vec::new();
    let mut reply = None;
    loop {
        match execution.resume(reply.take()).await {
            Ok(Step::Yielded(event)) => {
                reply = event.render(host).expect("render failed");
                events.push(event);
            }
            Ok(Step::Complete(response)) => return (Ok(response), events),
            Err(e) => return (Err(e), events),
        }
    }
}

/// Test helper to collect the text of every yielded `Message`
pub fn message_texts(events: &[Box<dyn Event>]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| event.downcast_ref::<Message>())
        .map(|message| message.text.clone())
        .collect()
}

/// Test helper to count events of a specific type
pub fn count_events<E: Event>(events: &[Box<dyn Event>]) -> usize {
    events.iter().filter(|event| event.is::<E>()).count()
}

/// Test tool that answers an `AskRequest` with the question itself
pub struct EchoTool {
    pub name: &'static str,
}

#[async_trait::async_trait]
impl Tool for EchoTool {
    type Request = crate::tools::types::AskRequest;
    type Response = crate::tools::types::AskResponse;

    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "Echo the question back."
    }

    async fn run(
        &self,
        request: Self::Request,
        _emitter: &crate::execution::Emitter,
    ) -> Result<Self::Response, AgentError> {
        Ok(crate::tools::types::AskResponse {
            response: request.question,
        })
    }
}
