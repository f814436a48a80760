use async_trait::async_trait;
use letex_core::Result;
use serde_json::{json, Value};
use tracing::info;

use crate::{required_str, Tool, ToolContext, ToolSchema};

pub struct SearchAndCompareTool;

#[async_trait]
impl Tool for SearchAndCompareTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "search_and_compare",
            description: "Performs a follow-up web search and compares results on two topics.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "topic_a": {
                        "type": "string",
                        "description": "The first topic to compare."
                    },
                    "topic_b": {
                        "type": "string",
                        "description": "The second topic to compare."
                    }
                },
                "required": ["topic_a", "topic_b"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        required_str(params, "topic_a")?;
        required_str(params, "topic_b")?;
        Ok(())
    }

    async fn execute(&self, _ctx: ToolContext, params: Value) -> Result<Value> {
        let topic_a = required_str(&params, "topic_a")?;
        let topic_b = required_str(&params, "topic_b")?;

        info!(topic_a = %topic_a, topic_b = %topic_b, "Comparison search");
        Ok(json!({
            "result": format!(
                "Success: Performed comparison search. {} vs {}. Found 5 key differences regarding pricing and features.",
                topic_a, topic_b
            )
        }))
    }
}
