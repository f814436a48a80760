use serde::{Deserialize, Serialize};
use tracing::warn;

/// A tool call request that serializes to the OpenAI-compatible format:
/// `{id, type: "function", function: {name, arguments}}`
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

impl Serialize for ToolCallRequest {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry("type", "function")?;
        map.serialize_entry("function", &serde_json::json!({
            "name": self.name,
            "arguments": self.arguments.to_string()
        }))?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for ToolCallRequest {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        let obj = value.as_object().ok_or_else(|| serde::de::Error::custom("expected object"))?;

        let id = obj.get("id")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        let func = obj.get("function").and_then(|v| v.as_object());
        let name = func
            .and_then(|f| f.get("name"))
            .or_else(|| obj.get("name"))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let arguments = match func.and_then(|f| f.get("arguments")).or_else(|| obj.get("arguments")) {
            Some(serde_json::Value::String(s)) => {
                serde_json::from_str(s).unwrap_or_else(|e| {
                    warn!(error = %e, raw = %s, "Failed to parse tool call arguments as JSON, using empty object");
                    serde_json::Value::Object(serde_json::Map::new())
                })
            }
            Some(v) => v.clone(),
            None => serde_json::Value::Object(serde_json::Map::new()),
        };

        Ok(ToolCallRequest { id, name, arguments })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMResponse {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCallRequest>,
    pub finish_reason: String,
    pub usage: serde_json::Value,
}

impl LLMResponse {
    /// A plain text answer with no tool calls.
    pub fn text(content: &str) -> Self {
        Self {
            content: Some(content.to_string()),
            finish_reason: "stop".to_string(),
            ..Self::default()
        }
    }

    /// A response that only requests a single tool invocation.
    pub fn tool_call(name: &str, arguments: serde_json::Value) -> Self {
        Self {
            tool_calls: vec![ToolCallRequest {
                id: format!("call_{}", name),
                name: name.to_string(),
                arguments,
            }],
            finish_reason: "tool_calls".to_string(),
            ..Self::default()
        }
    }
}

impl Default for LLMResponse {
    fn default() -> Self {
        Self {
            content: None,
            tool_calls: Vec::new(),
            finish_reason: String::new(),
            usage: serde_json::Value::Null,
        }
    }
}

/// One turn sent to a model provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallRequest>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChatMessage {
    fn with_role(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: serde_json::Value::String(content.to_string()),
            tool_calls: None,
            tool_call_id: None,
            name: None,
        }
    }

    pub fn system(content: &str) -> Self {
        Self::with_role("system", content)
    }

    pub fn user(content: &str) -> Self {
        Self::with_role("user", content)
    }

    pub fn assistant(content: &str) -> Self {
        Self::with_role("assistant", content)
    }

    /// The model turn that requested `calls`, replayed verbatim on the follow-up request.
    pub fn assistant_tool_calls(content: Option<&str>, calls: Vec<ToolCallRequest>) -> Self {
        let mut msg = Self::assistant(content.unwrap_or(""));
        msg.tool_calls = Some(calls);
        msg
    }

    pub fn tool_result(call: &ToolCallRequest, result: &serde_json::Value) -> Self {
        let mut msg = Self::with_role("tool", &result.to_string());
        msg.tool_call_id = Some(call.id.clone());
        msg.name = Some(call.name.clone());
        msg
    }

    pub fn text(&self) -> &str {
        self.content.as_str().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_call_roundtrip_keeps_arguments_object() {
        let call = ToolCallRequest {
            id: "c1".to_string(),
            name: "draft_email".to_string(),
            arguments: json!({"recipient": "a@b.c"}),
        };
        let encoded = serde_json::to_value(&call).unwrap();
        assert_eq!(encoded["type"], "function");
        assert!(encoded["function"]["arguments"].is_string());

        let decoded: ToolCallRequest = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, call);
    }

    #[test]
    fn test_tool_call_flat_format() {
        let decoded: ToolCallRequest = serde_json::from_value(json!({
            "id": "x",
            "name": "add_to_notes",
            "arguments": {"content_to_save": "hi"}
        }))
        .unwrap();
        assert_eq!(decoded.name, "add_to_notes");
        assert_eq!(decoded.arguments["content_to_save"], "hi");
    }

    #[test]
    fn test_tool_result_carries_name() {
        let call = ToolCallRequest {
            id: "gemini_call_0".to_string(),
            name: "add_to_notes".to_string(),
            arguments: json!({}),
        };
        let msg = ChatMessage::tool_result(&call, &json!({"result": "ok"}));
        assert_eq!(msg.role, "tool");
        assert_eq!(msg.name.as_deref(), Some("add_to_notes"));
        assert_eq!(msg.text(), r#"{"result":"ok"}"#);
    }
}
