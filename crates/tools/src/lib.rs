pub mod compare;
pub mod email;
pub mod notes;
pub mod registry;

use async_trait::async_trait;
use letex_core::{Error, Result};
use letex_storage::DocumentStoreHandle;
use serde_json::Value;

pub use registry::ToolRegistry;

/// Fetch a required, non-empty string argument.
pub(crate) fn required_str<'a>(params: &'a Value, key: &str) -> Result<&'a str> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| Error::Validation(format!("Missing required parameter: {}", key)))
}

/// What a tool may touch while it runs on behalf of one chat turn.
#[derive(Clone, Default)]
pub struct ToolContext {
    /// Signed-in user, if any.
    pub user_id: Option<String>,
    pub documents: Option<DocumentStoreHandle>,
}

pub struct ToolSchema {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn schema(&self) -> ToolSchema;
    fn validate(&self, params: &Value) -> Result<()>;
    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_required_str() {
        let params = json!({"a": "x", "b": "  ", "c": 3});
        assert_eq!(required_str(&params, "a").unwrap(), "x");
        assert!(required_str(&params, "b").is_err());
        assert!(required_str(&params, "c").is_err());
        assert!(required_str(&params, "d").is_err());
    }
}
