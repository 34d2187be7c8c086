pub mod agent;
pub mod config;
pub mod events;
pub mod execution;
pub mod model;
pub mod tools;
pub mod transcript;

// Re-export main types for convenience
pub use agent::{Agent, AgentBuilder, AgentError, AgentFactory};
pub use config::{Config, ConfigError};
pub use events::{Event, Host, HostError, Message, RequestEvent, ResponseEvent, Tone};
pub use execution::{Emitter, Execution, Reply, Step};
pub use model::{ChatModel, ChatRequest, OpenAiClient, ScriptedModel};
pub use tools::{Tool, ToolRegistry};
pub use transcript::{ChatMessage, Role, ToolCall, Transcript};
