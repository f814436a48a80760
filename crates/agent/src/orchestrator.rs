use std::sync::Arc;
use std::time::Duration;

use letex_core::config::AgentDefaults;
use letex_core::types::{ChatMessage, LLMResponse, ToolCallRequest};
use letex_core::{Error, Identity, Message, Result, ToolCall};
use letex_providers::Provider;
use letex_storage::DocumentStoreHandle;
use letex_tools::{ToolContext, ToolRegistry};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::conversation::SharedConversation;
use crate::prompt::{build_user_prompt, SYSTEM_INSTRUCTION};
use crate::session::SessionEvent;

pub const API_ERROR_REPLY: &str =
    "I encountered an error connecting to the AI service. Please check your connection or API key.";
pub const EMPTY_TOOL_REPLY: &str = "Task completed, but no final summary provided.";
pub const EMPTY_REPLY: &str = "I'm sorry, I couldn't generate a response.";

/// Tool whose side effect makes the notes list stale.
const NOTES_TOOL: &str = "add_to_notes";

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub llm_max_retries: u32,
    pub llm_retry_delay_ms: u64,
    pub tool_latency_ms: u64,
    pub notes_refresh_delay_ms: u64,
}

impl From<&AgentDefaults> for OrchestratorSettings {
    fn from(defaults: &AgentDefaults) -> Self {
        Self {
            llm_max_retries: defaults.llm_max_retries,
            llm_retry_delay_ms: defaults.llm_retry_delay_ms,
            tool_latency_ms: defaults.tool_latency_ms,
            notes_refresh_delay_ms: defaults.notes_refresh_delay_ms,
        }
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from(&AgentDefaults::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Nobody is signed in; the conversation was left untouched.
    SignInRequired,
    Answered {
        loading_id: String,
        text: String,
        /// Name of the tool run during this turn, if any.
        tool: Option<String>,
    },
}

/// Runs one chat turn: prompt the model, run the first requested tool, then
/// ask the model to turn the tool result into an answer.
pub struct AgentOrchestrator {
    provider: Arc<dyn Provider>,
    tools: ToolRegistry,
    documents: Option<DocumentStoreHandle>,
    settings: OrchestratorSettings,
    event_tx: Option<mpsc::UnboundedSender<SessionEvent>>,
}

impl AgentOrchestrator {
    pub fn new(provider: Arc<dyn Provider>, tools: ToolRegistry, settings: OrchestratorSettings) -> Self {
        Self {
            provider,
            tools,
            documents: None,
            settings,
            event_tx: None,
        }
    }

    pub fn with_documents(mut self, documents: DocumentStoreHandle) -> Self {
        self.documents = Some(documents);
        self
    }

    pub fn set_event_tx(&mut self, tx: mpsc::UnboundedSender<SessionEvent>) {
        self.event_tx = Some(tx);
    }

    /// Append `text` and a loading placeholder to `conversation`, then resolve
    /// the placeholder with the model's answer. Model failures resolve it with
    /// a fixed apology instead of returning an error.
    pub async fn send(
        &self,
        conversation: &SharedConversation,
        identity: Option<&Identity>,
        text: &str,
        page_context: &str,
    ) -> SendOutcome {
        let Some(identity) = identity else {
            info!("Chat requires sign-in");
            return SendOutcome::SignInRequired;
        };

        let loading = Message::loading();
        let loading_id = loading.id.clone();
        {
            let mut conv = conversation.lock().await;
            conv.push(Message::user(text));
            conv.push(loading);
        }
        self.save_progress(conversation, identity).await;

        let (answer, tool) = match self
            .run_turn(conversation, &loading_id, identity, text, page_context)
            .await
        {
            Ok(done) => done,
            Err(e) => {
                warn!(error = %e, loading_id = %loading_id, "Chat turn failed");
                (API_ERROR_REPLY.to_string(), None)
            }
        };

        conversation.lock().await.replace_loading(&loading_id, &answer);
        SendOutcome::Answered {
            loading_id,
            text: answer,
            tool,
        }
    }

    async fn run_turn(
        &self,
        conversation: &SharedConversation,
        loading_id: &str,
        identity: &Identity,
        text: &str,
        page_context: &str,
    ) -> Result<(String, Option<String>)> {
        let prompt = build_user_prompt(page_context, text);
        let mut messages = vec![ChatMessage::system(SYSTEM_INSTRUCTION), ChatMessage::user(&prompt)];
        let tools = self.tools.get_tool_schemas();

        let first = self.chat_with_retry(&messages, &tools).await?;
        let Some(call) = first.tool_calls.first().cloned() else {
            return Ok((non_empty_or(first.content, EMPTY_REPLY), None));
        };
        if first.tool_calls.len() > 1 {
            debug!(ignored = first.tool_calls.len() - 1, "Only the first tool call is honored");
        }

        info!(tool = %call.name, "Model requested tool");
        if call.name == NOTES_TOOL {
            self.schedule_notes_refresh();
        }
        let planned = conversation
            .lock()
            .await
            .insert_plan(loading_id, ToolCall::new(&call.name, &call.arguments));
        if planned {
            self.save_progress(conversation, identity).await;
        }

        let result = self.execute_tool(identity, &call).await;

        messages.push(ChatMessage::assistant_tool_calls(
            first.content.as_deref(),
            vec![call.clone()],
        ));
        messages.push(ChatMessage::tool_result(&call, &result));

        let second = self.chat_with_retry(&messages, &tools).await?;
        Ok((non_empty_or(second.content, EMPTY_TOOL_REPLY), Some(call.name)))
    }

    /// Upsert the thread mid-turn so an interrupted turn keeps the user's
    /// message. The session saves the resolved turn and updates its list.
    async fn save_progress(&self, conversation: &SharedConversation, identity: &Identity) {
        let Some(documents) = &self.documents else {
            return;
        };
        let (thread_id, title, messages) = {
            let conv = conversation.lock().await;
            (conv.thread_id().to_string(), conv.title(), conv.messages().to_vec())
        };
        let now = chrono::Utc::now().timestamp_millis();
        match documents.save_thread(&identity.uid, &thread_id, &title, &messages, now) {
            Ok(()) => debug!(thread_id = %thread_id, messages = messages.len(), "Thread progress saved"),
            Err(e) => warn!(error = %e, thread_id = %thread_id, "Failed to save thread progress"),
        }
    }

    /// Tool failures never abort the turn; they become `{"error": ...}` payloads
    /// the model can explain.
    async fn execute_tool(&self, identity: &Identity, call: &ToolCallRequest) -> Value {
        if self.settings.tool_latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.settings.tool_latency_ms)).await;
        }

        let ctx = ToolContext {
            user_id: Some(identity.uid.clone()),
            documents: self.documents.clone(),
        };
        match self.tools.execute(&call.name, ctx, call.arguments.clone()).await {
            Ok(result) => {
                debug!(tool = %call.name, "Tool finished");
                result
            }
            Err(Error::NotFound(_)) => {
                warn!(tool = %call.name, "Model requested unknown tool");
                json!({"error": "Unknown tool"})
            }
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool failed");
                json!({"error": e.to_string()})
            }
        }
    }

    async fn chat_with_retry(&self, messages: &[ChatMessage], tools: &[Value]) -> Result<LLMResponse> {
        let max_retries = self.settings.llm_max_retries;
        let base_delay_ms = self.settings.llm_retry_delay_ms;
        let mut last_error = None;

        for attempt in 0..=max_retries {
            if attempt > 0 {
                let delay_ms = base_delay_ms * (1u64 << (attempt - 1).min(4));
                warn!(attempt, max_retries, delay_ms, "Retrying LLM call after transient error");
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
            match self.provider.chat(messages, tools).await {
                Ok(response) => {
                    if attempt > 0 {
                        info!(attempt, "LLM call succeeded after retry");
                    }
                    return Ok(response);
                }
                Err(e) => {
                    warn!(error = %e, attempt, max_retries, "LLM call failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::Provider("LLM call was never attempted".to_string())))
    }

    fn schedule_notes_refresh(&self) {
        let Some(tx) = self.event_tx.clone() else {
            return;
        };
        let delay = Duration::from_millis(self.settings.notes_refresh_delay_ms);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if tx.send(SessionEvent::NotesRefreshDue).is_err() {
                debug!("Session gone before notes refresh");
            }
        });
    }
}

fn non_empty_or(content: Option<String>, fallback: &str) -> String {
    content
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string())
}
