//! Tool Registry
//!
//! Static mapping from tool name to tool. Built once at startup through
//! [`ToolRegistryBuilder`]; lookups are read-only afterwards, so a registry
//! behind an `Arc` is safe to share across tasks without synchronization.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::RegistryError;
use crate::tool::DiagTool;

/// Immutable, name-indexed set of tools in registration order
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn DiagTool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn builder() -> ToolRegistryBuilder {
        ToolRegistryBuilder::new()
    }

    /// Look up a tool by name
    pub fn get(&self, name: &str) -> Option<&Arc<dyn DiagTool>> {
        self.index.get(name).map(|&position| &self.tools[position])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Registered tool names in registration order
    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|tool| tool.name().to_string()).collect()
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
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

/// Collects tools before the registry is frozen
#[derive(Default)]
pub struct ToolRegistryBuilder {
    tools: Vec<Arc<dyn DiagTool>>,
}

impl ToolRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool
    pub fn tool<T>(self, tool: T) -> Self
    where
        T: DiagTool + 'static,
    {
        self.shared_tool(Arc::new(tool))
    }

    /// Register an already shared tool
    pub fn shared_tool(mut self, tool: Arc<dyn DiagTool>) -> Self {
        self.tools.push(tool);
        self
    }

    /// Freeze the registry, rejecting empty and duplicate names
    pub fn build(self) -> Result<ToolRegistry, RegistryError> {
        let mut index = HashMap::with_capacity(self.tools.len());
        for (position, tool) in self.tools.iter().enumerate() {
            let name = tool.name();
            if name.is_empty() {
                return Err(RegistryError::EmptyName);
            }
            if index.insert(name.to_string(), position).is_some() {
                return Err(RegistryError::DuplicateTool(name.to_string()));
            }
        }

        Ok(ToolRegistry {
            tools: self.tools,
            index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{FnTool, ToolArgs};
    use serde_json::json;

    fn constant(name: &str) -> FnTool {
        let tag = name.to_string();
        FnTool::new(name, move |_| Ok(json!(tag)))
    }

    #[test]
    fn test_registration_order_is_kept() {
        let registry = ToolRegistry::builder()
            .tool(constant("fs.du"))
            .tool(constant("proc.top"))
            .tool(constant("docker.df"))
            .build()
            .unwrap();

        assert_eq!(registry.names(), vec!["fs.du", "proc.top", "docker.df"]);
        assert_eq!(registry.len(), 3);
        assert!(registry.contains("proc.top"));
        assert!(!registry.contains("bogus.tool"));
    }

    #[test]
    fn test_lookup() {
        let registry = ToolRegistry::builder()
            .tool(constant("a.one"))
            .tool(constant("b.two"))
            .build()
            .unwrap();

        let tool = registry.get("b.two").unwrap();
        assert_eq!(tool.call(&ToolArgs::empty()).unwrap(), json!("b.two"));
        assert!(registry.get("c.three").is_none());
    }

    #[test]
    fn test_duplicate_rejected() {
        let result = ToolRegistry::builder()
            .tool(constant("fs.du"))
            .tool(constant("fs.du"))
            .build();
        assert!(matches!(result, Err(RegistryError::DuplicateTool(name)) if name == "fs.du"));
    }

    #[test]
    fn test_empty_name_rejected() {
        let result = ToolRegistry::builder().tool(constant("")).build();
        assert!(matches!(result, Err(RegistryError::EmptyName)));
    }

    #[test]
    fn test_empty_registry() {
        let registry = ToolRegistry::builder().build().unwrap();
        assert!(registry.is_empty());
        assert!(registry.names().is_empty());
    }
}
