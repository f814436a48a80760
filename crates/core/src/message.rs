use serde::{Deserialize, Serialize};

/// Id of the greeting message every fresh conversation starts with.
pub const GREETING_ID: &str = "init";

pub const GREETING_TEXT: &str = "Hello! I am LetEX, your context-aware AI Agent. Ask me anything, or ask me about the page you are viewing.";

const TITLE_PREFIX_CHARS: usize = 40;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Agent,
}

/// A tool invocation shown in the sidebar while the agent works on it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub name: String,
    pub args: serde_json::Map<String, serde_json::Value>,
}

impl ToolCall {
    pub fn new(name: &str, args: &serde_json::Value) -> Self {
        Self {
            name: name.to_string(),
            args: args.as_object().cloned().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub sender: Sender,
    pub text: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_loading: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCall>,
}

fn clock() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

impl Message {
    pub fn user(text: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender: Sender::User,
            text: text.to_string(),
            timestamp: clock(),
            is_loading: false,
            tool_call: None,
        }
    }

    pub fn agent(text: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender: Sender::Agent,
            text: text.to_string(),
            timestamp: clock(),
            is_loading: false,
            tool_call: None,
        }
    }

    pub fn greeting() -> Self {
        Self {
            id: GREETING_ID.to_string(),
            ..Self::agent(GREETING_TEXT)
        }
    }

    /// Placeholder shown while a model round-trip is in flight.
    pub fn loading() -> Self {
        Self {
            id: format!("loading-{}", uuid::Uuid::new_v4()),
            is_loading: true,
            ..Self::agent("")
        }
    }

    /// Synthetic agent message announcing the tool the model asked for.
    pub fn planning(call: ToolCall) -> Self {
        Self {
            id: format!("tool-{}", uuid::Uuid::new_v4()),
            tool_call: Some(call),
            ..Self::agent("")
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub messages: Vec<Message>,
    /// Milliseconds since the Unix epoch.
    pub updated_at: i64,
}

impl Thread {
    pub fn new_id() -> String {
        format!("thread-{}", chrono::Utc::now().timestamp_millis())
    }

    /// Title is the first user message cut to 40 characters, followed by an ellipsis.
    pub fn derive_title(messages: &[Message]) -> String {
        match messages.iter().find(|m| m.sender == Sender::User) {
            Some(first) => {
                let prefix: String = first.text.chars().take(TITLE_PREFIX_CHARS).collect();
                format!("{}...", prefix)
            }
            None => "New Conversation".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub user_id: String,
    pub content: String,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
}

/// The signed-in user as reported by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub uid: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
}

impl Identity {
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.uid)
    }
}

/// Navigation state that survives a restart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BrowserState {
    pub current_url: String,
    pub history_stack: Vec<String>,
    pub history_index: usize,
    pub is_sidebar_open: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_uses_first_user_message() {
        let long = "a".repeat(60);
        let messages = vec![Message::greeting(), Message::user(&long), Message::user("second")];
        let title = Thread::derive_title(&messages);
        assert_eq!(title, format!("{}...", "a".repeat(40)));
    }

    #[test]
    fn test_title_short_message_still_gets_ellipsis() {
        let messages = vec![Message::user("hi")];
        assert_eq!(Thread::derive_title(&messages), "hi...");
    }

    #[test]
    fn test_title_without_user_message() {
        assert_eq!(Thread::derive_title(&[Message::greeting()]), "New Conversation");
    }

    #[test]
    fn test_message_serializes_camel_case() {
        let msg = Message::loading();
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["isLoading"], true);
        assert_eq!(value["sender"], "agent");
        assert!(value.get("toolCall").is_none());
        assert!(msg.id.starts_with("loading-"));
    }

    #[test]
    fn test_planning_message_carries_tool_call() {
        let call = ToolCall::new("draft_email", &serde_json::json!({"recipient": "x"}));
        let msg = Message::planning(call.clone());
        assert!(msg.id.starts_with("tool-"));
        assert!(!msg.is_loading);
        assert_eq!(msg.tool_call, Some(call));
    }

    #[test]
    fn test_identity_json_shape() {
        let raw = r#"{"uid":"u1","displayName":null,"email":"e@x.io","photoURL":null}"#;
        let identity: Identity = serde_json::from_str(raw).unwrap();
        assert_eq!(identity.label(), "e@x.io");
    }
}
