use super::*;
use crate::tools::executors::{Ask, ReadFile};
use crate::tools::registry::{RegistryError, ToolRegistry, RESPONSE_TOOL};

#[test]
fn test_tool_registry_creation() {
    let registry = ToolRegistry::new();

    assert!(registry.is_empty());
    assert!(registry.definitions().is_empty());
}

#[test]
fn test_tool_registry_keeps_registration_order() {
    let mut registry = ToolRegistry::new();
    registry
        .register(ReadFile::new("."))
        .unwrap()
        .register(Ask)
        .unwrap()
        .register(EchoTool { name: "Echo" })
        .unwrap();

    assert_eq!(registry.len(), 3);
    assert_eq!(registry.names(), vec!["ReadFile", "Ask", "Echo"]);
    let names: Vec<String> = registry
        .definitions()
        .iter()
        .map(|definition| definition.name().to_string())
        .collect();
    assert_eq!(names, vec!["ReadFile", "Ask", "Echo"]);
}

#[test]
fn test_tool_registry_lookup() {
    let mut registry = ToolRegistry::new();
    registry.register(Ask).unwrap();

    assert!(registry.contains("Ask"));
    assert_eq!(registry.get("Ask").unwrap().name(), "Ask");
    assert!(registry.get("ask").is_none());
}

#[test]
fn test_tool_registry_rejects_duplicates() {
    let mut registry = ToolRegistry::new();
    registry.register(EchoTool { name: "Echo" }).unwrap();

    let err = registry.register(EchoTool { name: "Echo" }).unwrap_err();
    assert_eq!(err, RegistryError::Duplicate("Echo".to_string()));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_tool_registry_rejects_reserved_name() {
    let mut registry = ToolRegistry::new();

    let err = registry.register(EchoTool { name: RESPONSE_TOOL }).unwrap_err();
    assert_eq!(err, RegistryError::Reserved("Response".to_string()));
}

#[test]
fn test_tool_registry_rejects_invalid_names() {
    let mut registry = ToolRegistry::new();

    for name in ["", "has space", "dots.not.allowed"] {
        let err = registry.register(EchoTool { name }).unwrap_err();
        assert_eq!(err, RegistryError::InvalidName(name.to_string()));
    }
    assert!(registry.register(EchoTool { name: "snake_case-and-dash" }).is_ok());
}

#[test]
fn test_tool_registry_debug_lists_names() {
    let mut registry = ToolRegistry::new();
    registry.register(Ask).unwrap();

    assert_eq!(format!("{:?}", registry), r#"ToolRegistry { tools: ["Ask"] }"#);
}
