//! Events exchanged between running tools and whoever drives them.
//!
//! Every value a tool yields is an [`Event`]. The driver renders it on a
//! [`Host`] and feeds the render result back in as the resumption value.

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::fmt;

/// Visual weight of a line written to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Plain,
    /// Spoken by the agent itself.
    Agent,
    Info,
    Success,
    Alert,
    /// Raw process output (build logs, container logs).
    Log,
}

/// Errors raised by a host while rendering an event
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Input stream closed")]
    Closed,
}

/// The surface events are rendered on, usually a terminal.
pub trait Host {
    fn say(&mut self, text: &str, tone: Tone);

    /// Ask for a line of free text.
    fn input(&mut self, prompt: &str) -> Result<String, HostError>;

    /// Ask a yes/no question.
    fn confirm(&mut self, prompt: &str) -> Result<bool, HostError>;
}

/// Upcast helper so `dyn Event` can be inspected for its concrete type.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Something that happened while a tool was running.
///
/// `render` shows the event and may return a value; whatever it returns is
/// handed back to the execution that yielded the event.
pub trait Event: AsAny + fmt::Debug + Send + Sync + 'static {
    fn render(&self, host: &mut dyn Host) -> Result<Option<Value>, HostError> {
        let _ = host;
        Ok(None)
    }
}

impl dyn Event {
    pub fn downcast_ref<T: Event>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn is<T: Event>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

/// Typed input of a tool invocation.
pub trait RequestEvent: Event + Clone + Serialize + DeserializeOwned + JsonSchema {
    /// Constraints the type system cannot express.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Typed output of a completed tool invocation.
pub trait ResponseEvent: Event + Clone + Serialize + DeserializeOwned + JsonSchema {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Plain informational line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub text: String,
    pub tone: Tone,
}

impl Message {
    pub fn new(text: impl Into<String>, tone: Tone) -> Self {
        Self {
            text: text.into(),
            tone,
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(text, Tone::Info)
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(text, Tone::Success)
    }

    pub fn alert(text: impl Into<String>) -> Self {
        Self::new(text, Tone::Alert)
    }

    pub fn note(text: impl Into<String>) -> Self {
        Self::new(text, Tone::Plain)
    }
}

impl Event for Message {
    fn render(&self, host: &mut dyn Host) -> Result<Option<Value>, HostError> {
        host.say(&self.text, self.tone);
        Ok(None)
    }
}
