use crate::tools::executor::{DynTool, ToolDefinition};
use crate::tools::Tool;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Name of the implicit pseudo-tool an agent answers through.
pub const RESPONSE_TOOL: &str = "Response";

/// Errors raised while building a registry
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Tool `{0}` is registered twice")]
    Duplicate(String),

    #[error("Tool name `{0}` is reserved")]
    Reserved(String),

    #[error("Tool name `{0}` must be 1-64 characters of letters, digits, `_` or `-`")]
    InvalidName(String),
}

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("static pattern"))
}

/// Ordered name → tool map, fixed once an agent is built
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn DynTool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its own name.
    pub fn register<T: Tool>(&mut self, tool: T) -> Result<&mut Self, RegistryError> {
        self.register_shared(Arc::new(tool))
    }

    /// Register an already shared tool.
    pub fn register_shared(&mut self, tool: Arc<dyn DynTool>) -> Result<&mut Self, RegistryError> {
        let name = tool.name().to_string();
        if name == RESPONSE_TOOL {
            return Err(RegistryError::Reserved(name));
        }
        if !name_pattern().is_match(&name) {
            return Err(RegistryError::InvalidName(name));
        }
        if self.index.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn DynTool>> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Tool names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|tool| tool.name()).collect()
    }

    /// Function definitions in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|tool| tool.definition()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry").field("tools", &self.names()).finish()
    }
}
