use crate::agent::AgentError;
use crate::events::{Event, Host, HostError, Message, Tone};
use crate::execution::Emitter;
use crate::tools::executors::shell::{run_command, spawn_piped, split_command, tail_chars};
use crate::tools::types::{DockerBuildRequest, DockerBuildResponse, DockerRunRequest, DockerRunResponse};
use crate::tools::Tool;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, warn};

/// Characters of build output kept when a build fails.
const BUILD_LOG_TAIL: usize = 800;

/// Client binary used unless a tool is pointed elsewhere.
const DOCKER: &str = "docker";

/// How long to wait for a container's exit code after the logs are read.
const WAIT_TIMEOUT: Duration = Duration::from_secs(1);

/// One line of `docker build` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerBuildLog {
    pub log: String,
}

impl Event for DockerBuildLog {
    fn render(&self, host: &mut dyn Host) -> Result<Option<Value>, HostError> {
        host.say(&format!("  {}", self.log), Tone::Log);
        Ok(None)
    }
}

/// One line of container output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerRunLog {
    pub index: usize,
    pub log: String,
}

impl Event for DockerRunLog {
    fn render(&self, host: &mut dyn Host) -> Result<Option<Value>, HostError> {
        host.say(&format!("  {}", self.log), Tone::Log);
        Ok(None)
    }
}

/// Build an image from the project root.
pub struct DockerBuild {
    project_root: PathBuf,
    program: PathBuf,
}

impl DockerBuild {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            project_root: project_root.as_ref().to_path_buf(),
            program: PathBuf::from(DOCKER),
        }
    }

    /// Use another docker client binary.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }
}

#[async_trait]
impl Tool for DockerBuild {
    type Request = DockerBuildRequest;
    type Response = DockerBuildResponse;

    fn name(&self) -> &str {
        "DockerBuild"
    }

    fn description(&self) -> &str {
        "Build a docker image."
    }

    async fn run(&self, request: DockerBuildRequest, emitter: &Emitter) -> Result<DockerBuildResponse, AgentError> {
        emitter.emit(Message::info("Building Docker image...")).await?;
        emitter.emit(Message::note("Docker build logs:")).await?;

        let mut command = Command::new(&self.program);
        command
            .arg("build")
            .arg("--file")
            .arg(self.project_root.join(&request.dockerfile_path))
            .arg("--tag")
            .arg(&request.image_tag)
            .arg(&self.project_root)
            .current_dir(&self.project_root);

        let (mut child, mut lines) = match spawn_piped(&mut command) {
            Ok(spawned) => spawned,
            Err(e) => {
                return Ok(DockerBuildResponse {
                    error: Some(format!("failed to start docker build: {}", e)),
                    build_logs: Some(String::new()),
                })
            }
        };

        let mut logs = String::new();
        let mut last_line = String::new();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "docker build output unreadable");
                    break;
                }
            };
            logs.push_str(&line);
            logs.push('\n');
            if !line.trim().is_empty() {
                last_line = line.trim().to_string();
            }
            emitter.emit(DockerBuildLog { log: line }).await?;
        }

        let status = child
            .wait()
            .await
            .map_err(|e| AgentError::tool("DockerBuild", format!("waiting for docker build: {}", e)))?;
        if status.success() {
            debug!(image = %request.image_tag, "image built");
            return Ok(DockerBuildResponse::default());
        }

        let error = if last_line.is_empty() {
            format!("docker build exited with {}", status)
        } else {
            last_line
        };
        Ok(DockerBuildResponse {
            error: Some(error),
            build_logs: Some(tail_chars(&logs, BUILD_LOG_TAIL).to_string()),
        })
    }
}

/// Run an image in a detached container and follow its logs for a while.
///
/// Only the most recent container is kept alive; it is removed on the next
/// run and when the tool is dropped.
pub struct DockerRun {
    environment: BTreeMap<String, String>,
    log_window: Duration,
    program: PathBuf,
    containers: Mutex<Vec<String>>,
}

impl DockerRun {
    pub fn new(environment: BTreeMap<String, String>) -> Self {
        Self {
            environment,
            log_window: Duration::from_secs(30),
            program: PathBuf::from(DOCKER),
            containers: Mutex::new(Vec::new()),
        }
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_log_window(mut self, log_window: Duration) -> Self {
        self.log_window = log_window;
        self
    }

    fn take_containers(&self) -> Vec<String> {
        std::mem::take(&mut *self.containers.lock().unwrap_or_else(|e| e.into_inner()))
    }

    async fn remove_previous(&self) {
        for id in self.take_containers() {
            match run_command(&self.program, ["rm", "--force", id.as_str()], None).await {
                Ok(output) if output.success() => debug!(container = %id, "removed container"),
                Ok(output) => debug!(container = %id, reason = %output.failure_reason(), "container not removed"),
                Err(e) => debug!(container = %id, error = %e, "container not removed"),
            }
        }
    }

    /// Arguments of the `docker run` invocation for `request`.
    pub fn run_args(&self, request: &DockerRunRequest) -> Result<Vec<String>, String> {
        let mut args = vec!["run".to_string(), "--detach".to_string()];
        for (key, value) in &self.environment {
            args.push("--env".to_string());
            args.push(format!("{}={}", key, value));
        }
        if let Some(ports) = &request.ports {
            for (container_port, host_port) in ports {
                args.push("--publish".to_string());
                args.push(format!("{}:{}", host_port, container_port));
            }
        }
        args.push(request.image_tag.clone());
        args.extend(split_command(&request.command)?);
        Ok(args)
    }

    async fn exit_code(&self, id: &str) -> Option<i64> {
        match timeout(WAIT_TIMEOUT, run_command(&self.program, ["wait", id], None)).await {
            Ok(Ok(output)) if output.success() => output.stdout.trim().parse().ok(),
            _ => None,
        }
    }
}

impl Drop for DockerRun {
    fn drop(&mut self) {
        let ids = self.take_containers();
        if ids.is_empty() {
            return;
        }
        let _ = std::process::Command::new(&self.program)
            .args(["rm", "--force"])
            .args(&ids)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status();
    }
}

#[async_trait]
impl Tool for DockerRun {
    type Request = DockerRunRequest;
    type Response = DockerRunResponse;

    fn name(&self) -> &str {
        "DockerRun"
    }

    fn description(&self) -> &str {
        "Run a docker image"
    }

    async fn run(&self, request: DockerRunRequest, emitter: &Emitter) -> Result<DockerRunResponse, AgentError> {
        self.remove_previous().await;
        emitter.emit(Message::info("Running Docker container...")).await?;

        let args = match self.run_args(&request) {
            Ok(args) => args,
            Err(e) => {
                return Ok(DockerRunResponse {
                    client_error: Some(format!("invalid command: {}", e)),
                    ..Default::default()
                })
            }
        };
        let started = run_command(&self.program, &args, None)
            .await
            .map_err(|e| AgentError::tool("DockerRun", format!("failed to start docker: {}", e)))?;
        if !started.success() {
            debug!(status = started.exit_code, "docker run rejected");
            return Ok(DockerRunResponse {
                client_error: Some(started.failure_reason()),
                ..Default::default()
            });
        }

        let id = started.stdout.trim().to_string();
        self.containers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(id.clone());
        emitter.emit(Message::note("Docker logs:")).await?;

        let mut follow = Command::new(&self.program);
        follow.args(["logs", "--follow", id.as_str()]);
        let (mut child, mut lines) = spawn_piped(&mut follow)
            .map_err(|e| AgentError::tool("DockerRun", format!("failed to follow logs: {}", e)))?;

        let deadline = Instant::now() + self.log_window;
        let mut logs = Vec::new();
        let mut drained = false;
        loop {
            let line = match timeout_at(deadline, lines.next_line()).await {
                Ok(Ok(Some(line))) => line,
                Ok(Ok(None)) => {
                    drained = true;
                    break;
                }
                Ok(Err(e)) => {
                    warn!(container = %id, error = %e, "container logs unreadable");
                    break;
                }
                Err(_) => {
                    debug!(container = %id, window = ?self.log_window, "stopped following logs");
                    break;
                }
            };
            logs.push(line.clone());
            emitter
                .emit(DockerRunLog {
                    index: logs.len() - 1,
                    log: line,
                })
                .await?;
        }
        let _ = child.kill().await;

        if drained {
            emitter.emit(Message::note("There are no more logs.")).await?;
        }

        Ok(DockerRunResponse {
            logs: Some(logs),
            exit_code: self.exit_code(&id).await,
            client_error: None,
        })
    }
}
