use letex_core::Config;

use crate::{GeminiProvider, Provider};

/// Provider name implied by a model string, if any.
pub fn infer_provider_from_model(model: &str) -> Option<&'static str> {
    if model.starts_with("gemini/") || model.starts_with("gemini-") {
        Some("gemini")
    } else {
        None
    }
}

/// Build the provider for `model`.
///
/// Resolution order:
/// 1. `explicit_provider`
/// 2. the model prefix
/// 3. the first configured provider that has a key
pub fn create_provider(
    config: &Config,
    model: &str,
    explicit_provider: Option<&str>,
) -> anyhow::Result<Box<dyn Provider>> {
    let effective_provider = explicit_provider
        .or_else(|| infer_provider_from_model(model))
        .or_else(|| {
            config
                .providers
                .keys()
                .find(|name| config.api_key_for(name).is_some())
                .map(String::as_str)
        })
        .ok_or_else(|| {
            anyhow::anyhow!(
                "No LLM provider configured. Use a 'gemini-' model, set 'provider' in config, \
                 or add an API key to the providers section."
            )
        })?;

    match effective_provider {
        "gemini" => {
            let api_key = config.api_key_for("gemini").ok_or_else(|| {
                anyhow::anyhow!(
                    "Gemini has no API key. Set {} or providers.gemini.apiKey in config",
                    letex_core::config::GEMINI_API_KEY_ENV
                )
            })?;
            let api_base = config
                .get_provider("gemini")
                .and_then(|p| p.api_base.as_deref());
            Ok(Box::new(
                GeminiProvider::new(
                    &api_key,
                    api_base,
                    model,
                    config.agent.max_tokens,
                    config.agent.temperature,
                )
                .with_web_search(config.agent.web_search),
            ))
        }
        other => Err(anyhow::anyhow!("Unsupported provider '{}'", other)),
    }
}

/// Provider for the configured chat model.
pub fn create_main_provider(config: &Config) -> anyhow::Result<Box<dyn Provider>> {
    create_provider(config, &config.agent.model, config.agent.provider.as_deref())
}
