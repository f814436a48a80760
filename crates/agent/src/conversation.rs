use std::sync::Arc;

use letex_core::{Message, Thread, ToolCall};
use tokio::sync::Mutex;
use tracing::debug;

/// The message list of the active thread.
///
/// In-flight sends address their placeholder by id, so a send that finishes
/// after the user switched threads finds nothing to update and is dropped.
#[derive(Debug, Clone)]
pub struct Conversation {
    thread_id: String,
    messages: Vec<Message>,
}

pub type SharedConversation = Arc<Mutex<Conversation>>;

impl Conversation {
    /// A fresh thread holding only the greeting.
    pub fn new() -> Self {
        Self {
            thread_id: Thread::new_id(),
            messages: vec![Message::greeting()],
        }
    }

    pub fn from_thread(thread: &Thread) -> Self {
        Self {
            thread_id: thread.id.clone(),
            messages: thread.messages.clone(),
        }
    }

    pub fn shared(self) -> SharedConversation {
        Arc::new(Mutex::new(self))
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn title(&self) -> String {
        Thread::derive_title(&self.messages)
    }

    /// Worth persisting once there is more than the greeting.
    pub fn has_exchange(&self) -> bool {
        self.messages.len() > 1
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Resolve the placeholder `loading_id` with the final answer.
    pub fn replace_loading(&mut self, loading_id: &str, text: &str) -> bool {
        match self.messages.iter_mut().find(|m| m.id == loading_id) {
            Some(msg) => {
                msg.text = text.to_string();
                msg.is_loading = false;
                true
            }
            None => {
                debug!(loading_id, "Placeholder no longer in conversation, dropping answer");
                false
            }
        }
    }

    /// Show the tool the model asked for, keeping the placeholder last.
    pub fn insert_plan(&mut self, loading_id: &str, call: ToolCall) -> bool {
        let Some(pos) = self.messages.iter().position(|m| m.id == loading_id) else {
            debug!(loading_id, "Placeholder no longer in conversation, skipping plan");
            return false;
        };
        let placeholder = self.messages.remove(pos);
        self.messages.push(Message::planning(call));
        self.messages.push(placeholder);
        true
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}
