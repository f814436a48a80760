use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;
use crate::paths::Paths;

/// Environment variable that overrides the stored Gemini key.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_base: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDefaults {
    #[serde(default = "default_model")]
    pub model: String,
    /// Explicit provider name; inferred from the model prefix when absent.
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub llm_max_retries: u32,
    #[serde(default = "default_llm_retry_delay_ms")]
    pub llm_retry_delay_ms: u64,
    /// Attach the provider's built-in web search next to the function tools.
    #[serde(default = "default_web_search")]
    pub web_search: bool,
    /// Simulated backend latency applied before every tool runs.
    #[serde(default = "default_tool_latency_ms")]
    pub tool_latency_ms: u64,
    /// Delay before re-reading notes after `add_to_notes`, to let the store replicate.
    #[serde(default = "default_notes_refresh_delay_ms")]
    pub notes_refresh_delay_ms: u64,
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_max_tokens() -> u32 {
    8192
}

fn default_temperature() -> f32 {
    0.7
}

fn default_llm_retry_delay_ms() -> u64 {
    2000
}

fn default_web_search() -> bool {
    true
}

fn default_tool_latency_ms() -> u64 {
    1000
}

fn default_notes_refresh_delay_ms() -> u64 {
    2000
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            model: default_model(),
            provider: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            llm_max_retries: 0,
            llm_retry_delay_ms: default_llm_retry_delay_ms(),
            web_search: default_web_search(),
            tool_latency_ms: default_tool_latency_ms(),
            notes_refresh_delay_ms: default_notes_refresh_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserConfig {
    #[serde(default = "default_welcome_url")]
    pub welcome_url: String,
    /// Search engine URL; `{query}` is replaced by the percent-encoded input.
    #[serde(default = "default_search_url")]
    pub search_url: String,
    /// Domains known to refuse being framed.
    #[serde(default = "default_blocked_domains")]
    pub blocked_domains: Vec<String>,
    #[serde(default = "default_context_max_chars")]
    pub context_max_chars: usize,
    /// Extracted text at or below this length counts as empty.
    #[serde(default = "default_context_min_chars")]
    pub context_min_chars: usize,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

fn default_welcome_url() -> String {
    "/welcome".to_string()
}

fn default_search_url() -> String {
    "https://duckduckgo.com/?q={query}".to_string()
}

pub fn default_blocked_domains() -> Vec<String> {
    [
        "google.com",
        "youtube.com",
        "facebook.com",
        "twitter.com",
        "x.com",
        "instagram.com",
        "amazon.com",
        "reddit.com",
        "wikipedia.org",
        "netflix.com",
        "whatsapp.com",
    ]
    .iter()
    .map(|d| d.to_string())
    .collect()
}

fn default_context_max_chars() -> usize {
    5000
}

fn default_context_min_chars() -> usize {
    50
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            welcome_url: default_welcome_url(),
            search_url: default_search_url(),
            blocked_domains: default_blocked_domains(),
            context_max_chars: default_context_max_chars(),
            context_min_chars: default_context_min_chars(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    #[serde(default)]
    pub agent: AgentDefaults,
    #[serde(default)]
    pub browser: BrowserConfig,
}

impl Default for Config {
    fn default() -> Self {
        let mut providers = HashMap::new();
        providers.insert("gemini".to_string(), ProviderConfig::default());

        Self {
            providers,
            agent: AgentDefaults::default(),
            browser: BrowserConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn load_or_default(paths: &Paths) -> Result<Self> {
        let config_path = paths.config_file();
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn get_provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.get(name)
    }

    /// Key for `name`, preferring the environment over the config file for Gemini.
    pub fn api_key_for(&self, name: &str) -> Option<String> {
        if name == "gemini" {
            if let Ok(key) = std::env::var(GEMINI_API_KEY_ENV) {
                if !key.trim().is_empty() {
                    return Some(key.trim().to_string());
                }
            }
        }
        self.providers
            .get(name)
            .map(|p| p.api_key.trim())
            .filter(|k| !k.is_empty())
            .map(|k| k.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_uses_defaults() {
        let cfg: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.agent.model, "gemini-2.5-flash");
        assert_eq!(cfg.agent.notes_refresh_delay_ms, 2000);
        assert_eq!(cfg.browser.welcome_url, "/welcome");
        assert_eq!(cfg.browser.context_max_chars, 5000);
        assert!(cfg.browser.blocked_domains.contains(&"wikipedia.org".to_string()));
    }

    #[test]
    fn test_partial_override() {
        let raw = r#"{
  "agent": { "model": "gemini-2.0-flash", "webSearch": false },
  "browser": { "blockedDomains": ["example.org"] },
  "providers": { "gemini": { "apiKey": " k " } }
}"#;
        let cfg: Config = serde_json::from_str(raw).unwrap();
        assert_eq!(cfg.agent.model, "gemini-2.0-flash");
        assert!(!cfg.agent.web_search);
        assert_eq!(cfg.agent.tool_latency_ms, 1000);
        assert_eq!(cfg.browser.blocked_domains, vec!["example.org".to_string()]);
        assert_eq!(cfg.get_provider("gemini").unwrap().api_key, " k ");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let mut cfg = Config::default();
        cfg.agent.temperature = 0.2;
        cfg.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert!((loaded.agent.temperature - 0.2).abs() < f32::EPSILON);
        assert!(loaded.providers.contains_key("gemini"));
    }
}
