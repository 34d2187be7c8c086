//! Pumps a top-level execution and renders what it yields.

use autodeploy_core::agent::{DeveloperRequest, IdentifyRequest, ProjectIdentity, TesterRequest, TesterResponse};
use autodeploy_core::tools::executors::{AskQuestion, CommitConfirmation, DockerRunLog};
use autodeploy_core::tools::DockerRunResponse;
use autodeploy_core::{AgentError, Event, Execution, Host, Reply, Step, Tone, Tool};
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// Events kept for the report printed when a run fails.
const RECENT_EVENTS: usize = 5;
const RECENT_EVENT_CHARS: usize = 300;

/// What the agents are busy with, as shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Waiting on the user.
    Idle,
    Identifying,
    Building,
    Testing,
    Running,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Status::Idle => "Waiting for your input...",
            Status::Identifying => "Identifying the project...",
            Status::Building => "Building the project. Please wait...",
            Status::Testing => "Running tests on the project...",
            Status::Running => "Executing the Docker container. Press control-c to abort the run...",
        };
        write!(f, "{}", text)
    }
}

/// Status implied by an event, if it changes anything.
pub fn status_for(event: &dyn Event) -> Option<Status> {
    if event.is::<AskQuestion>() || event.is::<CommitConfirmation>() {
        Some(Status::Idle)
    } else if event.is::<IdentifyRequest>() {
        Some(Status::Identifying)
    } else if event.is::<DeveloperRequest>() || event.is::<ProjectIdentity>() || event.is::<TesterResponse>() {
        Some(Status::Building)
    } else if event.is::<TesterRequest>() || event.is::<DockerRunResponse>() {
        Some(Status::Testing)
    } else if event.is::<DockerRunLog>() {
        Some(Status::Running)
    } else {
        None
    }
}

/// How a driven execution ended
#[derive(Debug)]
pub enum Outcome<R> {
    Complete(R),
    Interrupted,
}

/// The only party that resumes executions.
///
/// Every yielded event is rendered on the host and the render result is fed
/// back as the reply.
pub struct Driver<H> {
    /// Lent to a blocking thread while an event renders.
    host: Option<H>,
    status: Option<Status>,
    recent: VecDeque<String>,
}

impl<H: Host + Send + 'static> Driver<H> {
    pub fn new(host: H) -> Self {
        Self {
            host: Some(host),
            status: None,
            recent: VecDeque::with_capacity(RECENT_EVENTS),
        }
    }

    /// The host, unless an interrupt abandoned it inside a pending prompt.
    pub fn host_mut(&mut self) -> Option<&mut H> {
        self.host.as_mut()
    }

    /// Most recent events, oldest first.
    pub fn recent_events(&self) -> impl Iterator<Item = &str> {
        self.recent.iter().map(String::as_str)
    }

    /// Run `tool` on `request` until it completes, fails, or `interrupt`
    /// resolves. An interrupt drops the execution and everything nested in it,
    /// even while a prompt is waiting for input.
    pub async fn run<T, F>(
        &mut self,
        tool: Arc<T>,
        request: T::Request,
        interrupt: F,
    ) -> Result<Outcome<T::Response>, AgentError>
    where
        T: Tool,
        F: Future<Output = ()>,
    {
        let mut execution = Execution::start(tool, request);
        tokio::pin!(interrupt);
        let mut reply = None;

        loop {
            let step = tokio::select! {
                biased;
                _ = &mut interrupt => {
                    warn!("Interrupted, cancelling the running execution");
                    return Ok(Outcome::Interrupted);
                }
                step = execution.resume(reply.take()) => step?,
            };

            match step {
                Step::Yielded(event) => {
                    self.update_status(event.as_ref());
                    self.remember(event.as_ref());
                    reply = tokio::select! {
                        biased;
                        _ = &mut interrupt => {
                            warn!("Interrupted while rendering, cancelling the running execution");
                            return Ok(Outcome::Interrupted);
                        }
                        rendered = self.render(event) => rendered?,
                    };
                }
                Step::Complete(response) => return Ok(Outcome::Complete(response)),
            }
        }
    }

    /// Render on a blocking thread so reading stdin never stalls the runtime.
    async fn render(&mut self, event: Box<dyn Event>) -> Result<Reply, AgentError> {
        let mut host = self
            .host
            .take()
            .ok_or_else(|| AgentError::Host("host was abandoned by an interrupted prompt".to_string()))?;
        let (host, rendered) = tokio::task::spawn_blocking(move || {
            let rendered = event.render(&mut host);
            (host, rendered)
        })
        .await
        .map_err(|e| AgentError::Host(format!("render task failed: {}", e)))?;
        self.host = Some(host);
        rendered.map_err(|e| AgentError::Host(e.to_string()))
    }

    fn update_status(&mut self, event: &dyn Event) {
        let Some(status) = status_for(event) else {
            return;
        };
        if self.status == Some(status) {
            return;
        }
        self.status = Some(status);
        if status != Status::Idle {
            if let Some(host) = self.host.as_mut() {
                host.say(&status.to_string(), Tone::Info);
            }
        }
    }

    fn remember(&mut self, event: &dyn Event) {
        let mut text = format!("{:?}", event);
        if let Some((cut, _)) = text.char_indices().nth(RECENT_EVENT_CHARS) {
            text.truncate(cut);
            text.push_str("...");
        }
        debug!(event = %text, "Rendering event");
        if self.recent.len() == RECENT_EVENTS {
            self.recent.pop_front();
        }
        self.recent.push_back(text);
    }
}
