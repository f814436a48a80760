pub mod factory;
pub mod gemini;

use async_trait::async_trait;
use letex_core::types::{ChatMessage, LLMResponse};
use letex_core::Result;
use serde_json::Value;

#[async_trait]
pub trait Provider: Send + Sync {
    async fn chat(&self, messages: &[ChatMessage], tools: &[Value]) -> Result<LLMResponse>;
}

pub use factory::{create_main_provider, create_provider, infer_provider_from_model};
pub use gemini::GeminiProvider;
