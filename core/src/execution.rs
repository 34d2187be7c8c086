//! Suspendable tool execution.
//!
//! A running tool reports progress by awaiting [`Emitter::emit`]. The call
//! parks the whole dispatch chain until the driver renders the event and
//! calls [`Execution::resume`] with the render result. Only one event is ever
//! in flight, and the task is polled only from inside `resume`.

use crate::agent::AgentError;
use crate::events::Event;
use crate::tools::Tool;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Value a driver hands back after rendering an event.
pub type Reply = Option<Value>;

type Task<R> = Pin<Box<dyn Future<Output = Result<R, AgentError>> + Send>>;

struct Suspension {
    event: Box<dyn Event>,
    resume: oneshot::Sender<Reply>,
}

/// Yield handle passed to every tool run.
///
/// Nested dispatch hands the same emitter down, so events from any depth
/// reach the driver directly and replies come straight back.
#[derive(Clone)]
pub struct Emitter {
    sender: mpsc::UnboundedSender<Suspension>,
}

impl Emitter {
    /// Yield an event and wait for the driver's reply.
    pub async fn emit<E: Event>(&self, event: E) -> Result<Reply, AgentError> {
        self.emit_boxed(Box::new(event)).await
    }

    pub async fn emit_boxed(&self, event: Box<dyn Event>) -> Result<Reply, AgentError> {
        let (resume, reply) = oneshot::channel();
        self.sender
            .send(Suspension { event, resume })
            .map_err(|_| AgentError::Detached)?;
        reply.await.map_err(|_| AgentError::Detached)
    }
}

impl std::fmt::Debug for Emitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter").finish_non_exhaustive()
    }
}

/// One step of an execution as seen by the driver
#[derive(Debug)]
pub enum Step<R> {
    /// The execution is suspended on this event.
    Yielded(Box<dyn Event>),
    /// The execution finished with its terminal response.
    Complete(R),
}

enum Polled<R> {
    Done(Result<R, AgentError>),
    Suspended(Suspension),
}

/// Driver-side handle of a top-level invocation.
///
/// Dropping it cancels the invocation: the whole nested future tree is
/// dropped at its current suspension point.
pub struct Execution<R> {
    task: Option<Task<R>>,
    suspensions: mpsc::UnboundedReceiver<Suspension>,
    pending: Option<oneshot::Sender<Reply>>,
}

impl<R: Send + 'static> Execution<R> {
    /// Start running `tool` on `request`. Nothing executes until the first
    /// [`resume`](Self::resume).
    pub fn start<T>(tool: Arc<T>, request: T::Request) -> Self
    where
        T: Tool<Response = R>,
    {
        let (sender, suspensions) = mpsc::unbounded_channel();
        let emitter = Emitter { sender };
        let task: Task<R> = Box::pin(async move { tool.run(request, &emitter).await });
        Self {
            task: Some(task),
            suspensions,
            pending: None,
        }
    }

    /// Deliver `reply` to the suspended event (ignored on the first call) and
    /// run until the next event or completion.
    pub async fn resume(&mut self, reply: Reply) -> Result<Step<R>, AgentError> {
        let Some(task) = self.task.as_mut() else {
            return Err(AgentError::Finished);
        };
        if let Some(pending) = self.pending.take() {
            // The receiver only disappears if the task is already unwinding.
            let _ = pending.send(reply);
        }

        let polled = tokio::select! {
            biased;
            outcome = task => Polled::Done(outcome),
            Some(suspension) = self.suspensions.recv() => Polled::Suspended(suspension),
        };

        match polled {
            Polled::Done(outcome) => {
                self.task = None;
                outcome.map(Step::Complete)
            }
            Polled::Suspended(suspension) => {
                self.pending = Some(suspension.resume);
                Ok(Step::Yielded(suspension.event))
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_none()
    }
}
