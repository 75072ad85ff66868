//! Name-keyed tool table, built once at startup.
//!
//! Built-in and remote-discovered tools populate the same table through the
//! [`Tool`] trait. Resolution of an unknown name is not an error here — the
//! turn engine turns it into a synthetic error result so the conversation can
//! continue.

use std::collections::HashMap;
use std::sync::Arc;

use super::{Tool, ToolSpec};

/// Registry of callable capabilities, keyed by tool name.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    /// Registration order, so specs are presented to the model deterministically.
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool under its own name. Re-registering a name replaces
    /// the previous entry (last one wins).
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_none() {
            self.order.push(name);
        }
    }

    /// Resolves a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Specs of all registered tools, in registration order. This is what the
    /// model is told it can call.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.spec())
            .collect()
    }

    /// Registered tool names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{CalculatorTool, ToolError};
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn spec(&self) -> ToolSpec {
            ToolSpec {
                name: "echo".into(),
                description: None,
                input_schema: json!({"type": "object"}),
            }
        }
        async fn call(&self, args: Value) -> Result<String, ToolError> {
            Ok(args.to_string())
        }
    }

    /// **Scenario**: Registered tools resolve by name; unknown names return None.
    #[test]
    fn register_and_resolve() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(CalculatorTool));
        registry.register(Arc::new(EchoTool));
        assert_eq!(registry.len(), 2);
        assert!(registry.get("calculator").is_some());
        assert!(registry.get("no_such_tool").is_none());
    }

    /// **Scenario**: specs() preserves registration order and carries schemas.
    #[test]
    fn specs_follow_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        registry.register(Arc::new(CalculatorTool));
        let specs = registry.specs();
        assert_eq!(specs[0].name, "echo");
        assert_eq!(specs[1].name, "calculator");
        assert!(specs[1].input_schema.is_object());
    }

    /// **Scenario**: Re-registering a name replaces the entry without duplicating it.
    #[test]
    fn reregistration_replaces_entry() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        registry.register(Arc::new(EchoTool));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.names(), vec!["echo"]);
    }
}
