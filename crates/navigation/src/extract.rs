//! Page context extraction.
//!
//! After a page finishes loading the session asks a [`PageReader`] for its
//! visible text. Pages that refuse to be read produce a synthetic context that
//! steers the agent toward web search instead.

use async_trait::async_trait;
use letex_core::config::BrowserConfig;
use letex_core::{safe_truncate, Error, Result};
use reqwest::Client;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::controller::WELCOME_CONTEXT;

pub fn extraction_fallback(url: &str) -> String {
    format!(
        "Context extraction failed due to browser security restrictions (CORS/X-Frame-Options) for {}. I will use Google Search instead.",
        url
    )
}

/// Source of the visible text of a loaded page.
#[async_trait]
pub trait PageReader: Send + Sync {
    async fn read_visible_text(&self, url: &str) -> Result<String>;
}

/// Reads pages over HTTP. A response that forbids framing is treated the same
/// as a cross-origin frame: its text is not available.
pub struct HttpPageReader {
    client: Client,
}

impl HttpPageReader {
    pub fn new(config: &BrowserConfig) -> Result<Self> {
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .timeout(std::time::Duration::from_secs(config.fetch_timeout_secs))
            .user_agent(format!("letex/{} (AI Browser)", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

fn refuses_framing(frame_options: Option<&str>) -> bool {
    frame_options
        .map(|v| {
            let v = v.trim().to_ascii_lowercase();
            v == "deny" || v == "sameorigin"
        })
        .unwrap_or(false)
}

#[async_trait]
impl PageReader for HttpPageReader {
    async fn read_visible_text(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Other(format!("Fetch failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Other(format!("Fetch returned {}", status)));
        }

        let headers = response.headers();
        let frame_options = headers
            .get("x-frame-options")
            .and_then(|v| v.to_str().ok());
        if refuses_framing(frame_options) {
            return Err(Error::Validation(format!("{} refuses to be framed", url)));
        }
        let content_type = headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let body = response
            .text()
            .await
            .map_err(|e| Error::Other(format!("Failed to read response body: {}", e)))?;

        if content_type.contains("text/html") {
            Ok(extract_text_from_html(&body))
        } else {
            Ok(body)
        }
    }
}

pub fn extract_text_from_html(html: &str) -> String {
    use scraper::{Html, Selector};

    let document = Html::parse_document(html);

    for sel in ["article", "main", "body"] {
        if let Ok(selector) = Selector::parse(sel) {
            if let Some(element) = document.select(&selector).next() {
                let text = collapse_whitespace(element.text());
                if !text.is_empty() {
                    return text;
                }
            }
        }
    }

    collapse_whitespace(document.root_element().text())
}

fn collapse_whitespace<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Turns a loaded URL into the page context handed to the agent.
#[derive(Clone)]
pub struct ContextExtractor {
    reader: Arc<dyn PageReader>,
    welcome_url: String,
    max_chars: usize,
    min_chars: usize,
}

impl ContextExtractor {
    pub fn new(reader: Arc<dyn PageReader>, config: &BrowserConfig) -> Self {
        Self {
            reader,
            welcome_url: config.welcome_url.clone(),
            max_chars: config.context_max_chars,
            min_chars: config.context_min_chars,
        }
    }

    pub async fn extract(&self, url: &str) -> String {
        if url == self.welcome_url {
            return WELCOME_CONTEXT.to_string();
        }

        match self.reader.read_visible_text(url).await {
            Ok(text) if text.chars().count() > self.min_chars => {
                let context = safe_truncate(&text, self.max_chars).to_string();
                debug!(url = %url, chars = context.chars().count(), "Extracted page context");
                context
            }
            Ok(_) => {
                debug!(url = %url, "Page text too short, using fallback context");
                extraction_fallback(url)
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Cannot read page content");
                extraction_fallback(url)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedReader(Result<String>);

    #[async_trait]
    impl PageReader for FixedReader {
        async fn read_visible_text(&self, _url: &str) -> Result<String> {
            match &self.0 {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(Error::Other(e.to_string())),
            }
        }
    }

    fn extractor(reader: FixedReader) -> ContextExtractor {
        ContextExtractor::new(Arc::new(reader), &BrowserConfig::default())
    }

    #[test]
    fn test_extract_text_prefers_article() {
        let html = "<html><body><nav>menu</nav><article><p>Hello   World</p></article></body></html>";
        assert_eq!(extract_text_from_html(html), "Hello World");
    }

    #[test]
    fn test_extract_text_falls_back_to_body() {
        let html = "<html><body><p>Only\n body</p></body></html>";
        assert_eq!(extract_text_from_html(html), "Only body");
    }

    #[test]
    fn test_refuses_framing() {
        assert!(refuses_framing(Some("DENY")));
        assert!(refuses_framing(Some(" sameorigin ")));
        assert!(!refuses_framing(Some("ALLOW-FROM https://x")));
        assert!(!refuses_framing(None));
    }

    #[tokio::test]
    async fn test_extract_truncates_long_text() {
        let ex = extractor(FixedReader(Ok("x".repeat(6000))));
        let ctx = ex.extract("https://docs.rs").await;
        assert_eq!(ctx.chars().count(), 5000);
    }

    #[tokio::test]
    async fn test_extract_short_text_falls_back() {
        let ex = extractor(FixedReader(Ok("tiny".to_string())));
        assert_eq!(ex.extract("https://docs.rs").await, extraction_fallback("https://docs.rs"));
    }

    #[tokio::test]
    async fn test_extract_error_falls_back() {
        let ex = extractor(FixedReader(Err(Error::Other("cors".to_string()))));
        assert_eq!(ex.extract("https://a.io").await, extraction_fallback("https://a.io"));
    }

    #[tokio::test]
    async fn test_extract_welcome() {
        let ex = extractor(FixedReader(Ok(String::new())));
        assert_eq!(ex.extract("/welcome").await, WELCOME_CONTEXT);
    }
}
