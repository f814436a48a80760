use std::collections::HashMap;
use std::sync::Arc;
use letex_core::{Error, Result};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::{Tool, ToolContext};
use crate::compare::SearchAndCompareTool;
use crate::email::DraftEmailTool;
use crate::notes::AddToNotesTool;

#[derive(Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(AddToNotesTool));
        registry.register(Arc::new(DraftEmailTool));
        registry.register(Arc::new(SearchAndCompareTool));
        registry
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let schema = tool.schema();
        debug!(name = schema.name, "Registering tool");
        self.tools.insert(schema.name.to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Function schemas in OpenAI style, ordered by name.
    pub fn get_tool_schemas(&self) -> Vec<Value> {
        let mut names: Vec<&String> = self.tools.keys().collect();
        names.sort();
        names
            .into_iter()
            .map(|name| {
                let schema = self.tools[name].schema();
                json!({
                    "type": "function",
                    "function": {
                        "name": schema.name,
                        "description": schema.description,
                        "parameters": schema.parameters
                    }
                })
            })
            .collect()
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub async fn execute(&self, name: &str, ctx: ToolContext, params: Value) -> Result<Value> {
        let tool = self
            .get(name)
            .ok_or_else(|| Error::NotFound(format!("Unknown tool: {}", name)))?;

        if let Err(e) = tool.validate(&params) {
            warn!(tool = name, error = %e, "Tool validation failed");
            return Err(e);
        }

        debug!(tool = name, "Executing tool");
        tool.execute(ctx, params).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_new_empty() {
        let reg = ToolRegistry::new();
        assert!(reg.tool_names().is_empty());
        assert!(reg.get("add_to_notes").is_none());
    }

    #[test]
    fn test_registry_with_defaults() {
        let reg = ToolRegistry::with_defaults();
        let mut names = reg.tool_names();
        names.sort();
        assert_eq!(names, vec!["add_to_notes", "draft_email", "search_and_compare"]);
    }

    #[test]
    fn test_tool_schemas_shape() {
        let schemas = ToolRegistry::with_defaults().get_tool_schemas();
        assert_eq!(schemas.len(), 3);
        assert_eq!(schemas[0]["type"], "function");
        assert_eq!(schemas[0]["function"]["name"], "add_to_notes");
        assert!(schemas[1]["function"]["parameters"]["properties"]["recipient"].is_object());
    }

    #[tokio::test]
    async fn test_execute_unknown_tool() {
        let reg = ToolRegistry::with_defaults();
        let err = reg
            .execute("book_flight", ToolContext::default(), json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_execute_validates_first() {
        let reg = ToolRegistry::with_defaults();
        let err = reg
            .execute("draft_email", ToolContext::default(), json!({"recipient": "x"}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
