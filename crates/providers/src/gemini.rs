use async_trait::async_trait;
use letex_core::types::{ChatMessage, LLMResponse, ToolCallRequest};
use letex_core::{Error, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::Provider;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiProvider {
    client: Client,
    api_key: String,
    api_base: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    web_search: bool,
}

impl GeminiProvider {
    pub fn new(
        api_key: &str,
        api_base: Option<&str>,
        model: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to build HTTP client, using default");
                Client::new()
            });

        Self {
            client,
            api_key: api_key.to_string(),
            api_base: api_base
                .unwrap_or(GEMINI_API_BASE)
                .trim_end_matches('/')
                .to_string(),
            model: model.to_string(),
            max_tokens,
            temperature,
            web_search: false,
        }
    }

    /// Also offer Gemini's built-in Google Search grounding.
    pub fn with_web_search(mut self, enabled: bool) -> Self {
        self.web_search = enabled;
        self
    }

    /// Config may store "gemini/gemini-2.5-flash" but the API expects "gemini-2.5-flash".
    fn normalize_model(model: &str) -> &str {
        model.strip_prefix("gemini/").unwrap_or(model)
    }

    /// Convert ChatMessage list to Gemini format.
    /// Gemini uses `role: "user"/"model"`, with system instruction as a separate field.
    fn convert_messages(messages: &[ChatMessage]) -> (Option<String>, Vec<Value>) {
        let mut system_text: Option<String> = None;
        let mut contents: Vec<Value> = Vec::new();

        for msg in messages {
            match msg.role.as_str() {
                "system" => {
                    let text = msg.text().to_string();
                    system_text = Some(match system_text {
                        Some(existing) => format!("{}\n\n{}", existing, text),
                        None => text,
                    });
                }
                "assistant" => {
                    let mut parts: Vec<Value> = Vec::new();
                    if !msg.text().is_empty() {
                        parts.push(json!({"text": msg.text()}));
                    }
                    for tc in msg.tool_calls.iter().flatten() {
                        parts.push(json!({
                            "functionCall": {
                                "name": tc.name,
                                "args": tc.arguments,
                            }
                        }));
                    }
                    if parts.is_empty() {
                        parts.push(json!({"text": ""}));
                    }
                    contents.push(json!({"role": "model", "parts": parts}));
                }
                "tool" => {
                    // Gemini matches responses to calls by function name, not by id.
                    let name = msg
                        .name
                        .as_deref()
                        .or(msg.tool_call_id.as_deref())
                        .unwrap_or("");
                    let response = match serde_json::from_str::<Value>(msg.text()) {
                        Ok(v) if v.is_object() => v,
                        Ok(v) => json!({"result": v}),
                        Err(_) => json!({"result": msg.text()}),
                    };
                    let part = json!({
                        "functionResponse": {
                            "name": name,
                            "response": response,
                        }
                    });

                    // Consecutive function responses share one user turn.
                    if let Some(parts) = contents
                        .last_mut()
                        .filter(|last| last["role"] == "user")
                        .and_then(|last| last.get_mut("parts"))
                        .and_then(|p| p.as_array_mut())
                        .filter(|p| p.first().map_or(false, |f| f.get("functionResponse").is_some()))
                    {
                        parts.push(part);
                        continue;
                    }
                    contents.push(json!({"role": "user", "parts": [part]}));
                }
                _ => {
                    contents.push(json!({
                        "role": "user",
                        "parts": [{"text": msg.text()}],
                    }));
                }
            }
        }

        (system_text, contents)
    }

    /// Convert OpenAI-style tool schemas to Gemini tool entries.
    fn convert_tools(tools: &[Value], web_search: bool) -> Vec<Value> {
        let declarations: Vec<Value> = tools
            .iter()
            .filter_map(|tool| {
                let func = tool.get("function")?;
                let name = func.get("name")?.as_str()?;
                let description = func
                    .get("description")
                    .and_then(|v| v.as_str())
                    .unwrap_or("");
                let parameters = func
                    .get("parameters")
                    .cloned()
                    .unwrap_or_else(|| json!({"type": "object", "properties": {}}));
                Some(json!({
                    "name": name,
                    "description": description,
                    "parameters": parameters,
                }))
            })
            .collect();

        let mut out = Vec::new();
        if !declarations.is_empty() {
            out.push(json!({"functionDeclarations": declarations}));
        }
        if web_search {
            out.push(json!({"googleSearch": {}}));
        }
        out
    }

    fn parse_response(raw_body: &str) -> Result<LLMResponse> {
        let resp: GeminiResponse = serde_json::from_str(raw_body).map_err(|e| {
            let end = raw_body
                .char_indices()
                .nth(500)
                .map(|(i, _)| i)
                .unwrap_or(raw_body.len());
            Error::Provider(format!(
                "Failed to parse Gemini response: {}. Body: {}",
                e,
                &raw_body[..end]
            ))
        })?;

        let candidate = resp
            .candidates
            .and_then(|c| c.into_iter().next())
            .ok_or_else(|| Error::Provider("No candidates in Gemini response".to_string()))?;

        let mut text_parts: Vec<String> = Vec::new();
        let mut tool_calls: Vec<ToolCallRequest> = Vec::new();

        for (i, part) in candidate.content.map(|c| c.parts).unwrap_or_default().into_iter().enumerate() {
            if let Some(text) = part.text.filter(|t| !t.is_empty()) {
                text_parts.push(text);
            }
            if let Some(fc) = part.function_call {
                tool_calls.push(ToolCallRequest {
                    id: format!("gemini_call_{}", i),
                    name: fc.name,
                    arguments: fc.args.unwrap_or_else(|| Value::Object(serde_json::Map::new())),
                });
            }
        }

        let finish_reason = match candidate.finish_reason.as_deref() {
            Some("STOP") if !tool_calls.is_empty() => "tool_calls".to_string(),
            Some("STOP") => "stop".to_string(),
            Some("MAX_TOKENS") => "length".to_string(),
            Some("SAFETY") => "content_filter".to_string(),
            Some(other) => other.to_lowercase(),
            None if !tool_calls.is_empty() => "tool_calls".to_string(),
            None => "stop".to_string(),
        };

        let usage = resp
            .usage_metadata
            .map(|meta| {
                json!({
                    "prompt_tokens": meta.prompt_token_count,
                    "completion_tokens": meta.candidates_token_count,
                })
            })
            .unwrap_or(Value::Null);

        Ok(LLMResponse {
            content: if text_parts.is_empty() {
                None
            } else {
                Some(text_parts.join("\n"))
            },
            tool_calls,
            finish_reason,
            usage,
        })
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    async fn chat(&self, messages: &[ChatMessage], tools: &[Value]) -> Result<LLMResponse> {
        let model = Self::normalize_model(&self.model);
        let url = format!("{}/models/{}:generateContent", self.api_base, model);

        let (system_instruction, contents) = Self::convert_messages(messages);
        let gemini_tools = Self::convert_tools(tools, self.web_search);

        let mut request = json!({
            "contents": contents,
            "generationConfig": {
                "temperature": self.temperature,
                "maxOutputTokens": self.max_tokens,
            }
        });
        if let Some(sys) = &system_instruction {
            request["systemInstruction"] = json!({"parts": [{"text": sys}]});
        }
        if !gemini_tools.is_empty() {
            request["tools"] = Value::Array(gemini_tools);
        }

        info!(
            model = %model,
            tools_count = tools.len(),
            messages_count = messages.len(),
            web_search = self.web_search,
            "Calling Gemini API"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("Gemini request failed: {}", e)))?;

        let status = response.status();
        let raw_body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            error!(status = %status, body = %raw_body, "Gemini API error");
            return Err(Error::Provider(format!("Gemini API error {}: {}", status, raw_body)));
        }
        debug!(body_len = raw_body.len(), "Gemini raw response");

        let parsed = Self::parse_response(&raw_body)?;
        info!(
            content_len = parsed.content.as_ref().map(|c| c.len()).unwrap_or(0),
            tool_calls_count = parsed.tool_calls.len(),
            finish_reason = %parsed.finish_reason,
            "Gemini response parsed"
        );
        Ok(parsed)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    function_call: Option<GeminiFunctionCall>,
}

#[derive(Debug, Deserialize)]
struct GeminiFunctionCall {
    name: String,
    args: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    prompt_token_count: Option<u64>,
    candidates_token_count: Option<u64>,
}
