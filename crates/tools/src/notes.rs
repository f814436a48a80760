use async_trait::async_trait;
use letex_core::{safe_truncate, Result};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::{required_str, Tool, ToolContext, ToolSchema};

/// Saves text from the current page into the signed-in user's notes.
pub struct AddToNotesTool;

#[async_trait]
impl Tool for AddToNotesTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "add_to_notes",
            description: "Saves a block of text, a URL, or a summary from the current page to the user's notes.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "content_to_save": {
                        "type": "string",
                        "description": "The text content or URL to save."
                    }
                },
                "required": ["content_to_save"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        required_str(params, "content_to_save").map(|_| ())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let content = required_str(&params, "content_to_save")?;

        let (user_id, documents) = match (&ctx.user_id, &ctx.documents) {
            (Some(user_id), Some(documents)) => (user_id, documents),
            _ => {
                return Ok(json!({"error": "User not authenticated. Cannot save note."}));
            }
        };

        let created_at = chrono::Utc::now().timestamp_millis();
        match documents.save_note(user_id, content, created_at) {
            Ok(note) => {
                info!(note_id = %note.id, "Note saved from chat");
                Ok(json!({
                    "result": format!(
                        "Success: Saved to your Notes database: \"{}...\"",
                        safe_truncate(content, 30)
                    )
                }))
            }
            Err(e) => {
                warn!(error = %e, "Failed to save note");
                Ok(json!({"error": "Failed to save note to database."}))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use letex_core::{Error, Message, Note, Thread};
    use letex_storage::{DocumentStore, SqliteDocumentStore};
    use std::sync::Arc;

    struct FailingStore;

    impl DocumentStore for FailingStore {
        fn save_thread(&self, _: &str, _: &str, _: &str, _: &[Message], _: i64) -> Result<()> {
            Err(Error::Storage("down".to_string()))
        }
        fn get_user_threads(&self, _: &str) -> Result<Vec<Thread>> {
            Err(Error::Storage("down".to_string()))
        }
        fn save_note(&self, _: &str, _: &str, _: i64) -> Result<Note> {
            Err(Error::Storage("down".to_string()))
        }
        fn get_user_notes(&self, _: &str) -> Result<Vec<Note>> {
            Err(Error::Storage("down".to_string()))
        }
    }

    #[test]
    fn test_add_to_notes_schema() {
        let schema = AddToNotesTool.schema();
        assert_eq!(schema.name, "add_to_notes");
        assert_eq!(schema.parameters["required"][0], "content_to_save");
    }

    #[test]
    fn test_add_to_notes_validate() {
        assert!(AddToNotesTool.validate(&json!({"content_to_save": "x"})).is_ok());
        assert!(AddToNotesTool.validate(&json!({})).is_err());
    }

    #[tokio::test]
    async fn test_saves_for_signed_in_user() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = Arc::new(SqliteDocumentStore::open(&dir.path().join("db")).unwrap());
        let ctx = ToolContext {
            user_id: Some("u1".to_string()),
            documents: Some(store.clone()),
        };
        let content = "The quick brown fox jumps over the lazy dog";
        let result = AddToNotesTool
            .execute(ctx, json!({"content_to_save": content}))
            .await
            .unwrap();
        assert_eq!(
            result["result"],
            "Success: Saved to your Notes database: \"The quick brown fox jumps over...\""
        );
        let notes = store.get_user_notes("u1").unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].content, content);
    }

    #[tokio::test]
    async fn test_requires_user() {
        let result = AddToNotesTool
            .execute(ToolContext::default(), json!({"content_to_save": "x"}))
            .await
            .unwrap();
        assert_eq!(result["error"], "User not authenticated. Cannot save note.");
    }

    #[tokio::test]
    async fn test_store_failure_is_payload() {
        let ctx = ToolContext {
            user_id: Some("u1".to_string()),
            documents: Some(Arc::new(FailingStore)),
        };
        let result = AddToNotesTool
            .execute(ctx, json!({"content_to_save": "x"}))
            .await
            .unwrap();
        assert_eq!(result["error"], "Failed to save note to database.");
    }
}
