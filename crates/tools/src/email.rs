use async_trait::async_trait;
use letex_core::Result;
use serde_json::{json, Value};
use tracing::info;

use crate::{required_str, Tool, ToolContext, ToolSchema};

/// Drafts an email for the user to review. Nothing is sent.
pub struct DraftEmailTool;

#[async_trait]
impl Tool for DraftEmailTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "draft_email",
            description: "Drafts an email based on the current page content or a user's request.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "recipient": {
                        "type": "string",
                        "description": "The email recipient."
                    },
                    "subject": {
                        "type": "string",
                        "description": "The email subject line."
                    },
                    "body_content": {
                        "type": "string",
                        "description": "The main content/body of the email."
                    }
                },
                "required": ["recipient", "subject", "body_content"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        for key in ["recipient", "subject", "body_content"] {
            required_str(params, key)?;
        }
        Ok(())
    }

    async fn execute(&self, _ctx: ToolContext, params: Value) -> Result<Value> {
        let recipient = required_str(&params, "recipient")?;
        let subject = required_str(&params, "subject")?;
        let body_len = params["body_content"].as_str().map(str::len).unwrap_or(0);

        info!(recipient = %recipient, body_len, "Email drafted");
        Ok(json!({
            "result": format!(
                "Success: Drafted a new email to {} with the subject: \"{}\". Ready to review.",
                recipient, subject
            )
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_email_schema() {
        let schema = DraftEmailTool.schema();
        assert_eq!(schema.name, "draft_email");
        assert_eq!(schema.parameters["required"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_draft_email_validate() {
        let ok = json!({"recipient": "a@b.c", "subject": "Hi", "body_content": "Body"});
        assert!(DraftEmailTool.validate(&ok).is_ok());
        let missing = json!({"recipient": "a@b.c", "subject": "Hi"});
        assert!(DraftEmailTool.validate(&missing).is_err());
    }

    #[tokio::test]
    async fn test_draft_email_result() {
        let result = DraftEmailTool
            .execute(
                ToolContext::default(),
                json!({"recipient": "team@acme.io", "subject": "Pricing", "body_content": "See page"}),
            )
            .await
            .unwrap();
        assert_eq!(
            result["result"],
            "Success: Drafted a new email to team@acme.io with the subject: \"Pricing\". Ready to review."
        );
    }
}
