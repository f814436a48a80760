use letex_core::config::BrowserConfig;
use letex_core::BrowserState;
use tracing::{debug, info, warn};

use crate::url::{is_likely_blocked, normalize_input, rewrite_for_embed};

pub const WELCOME_CONTEXT: &str = "User is on the welcome screen.";

pub fn auto_blocked_context(url: &str) -> String {
    format!(
        "Context unavailable. The application automatically blocked {} to prevent display errors.",
        url
    )
}

pub fn reported_blocked_context(url: &str) -> String {
    format!(
        "Context unavailable. The user reported that {} could not be displayed.",
        url
    )
}

/// Result of a navigation that changed the current entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visit {
    pub url: String,
    pub blocked: bool,
}

/// Back/forward history plus the view flags derived from the current entry.
///
/// The stack is never empty and `index` always points into it; the current
/// URL is by definition `stack[index]`.
#[derive(Debug, Clone)]
pub struct NavigationController {
    stack: Vec<String>,
    index: usize,
    blocked: bool,
    loading: bool,
    reload_epoch: u64,
    page_context: String,
    welcome_url: String,
    search_url: String,
    blocked_domains: Vec<String>,
}

impl NavigationController {
    pub fn new(config: &BrowserConfig) -> Self {
        Self {
            stack: vec![config.welcome_url.clone()],
            index: 0,
            blocked: false,
            loading: false,
            reload_epoch: 0,
            page_context: String::new(),
            welcome_url: config.welcome_url.clone(),
            search_url: config.search_url.clone(),
            blocked_domains: config.blocked_domains.clone(),
        }
    }

    pub fn current_url(&self) -> &str {
        &self.stack[self.index]
    }

    pub fn history(&self) -> &[String] {
        &self.stack
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn welcome_url(&self) -> &str {
        &self.welcome_url
    }

    pub fn is_welcome(&self) -> bool {
        self.current_url() == self.welcome_url
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Bumped on every refresh so the view knows to tear down and reload.
    pub fn reload_epoch(&self) -> u64 {
        self.reload_epoch
    }

    pub fn page_context(&self) -> &str {
        &self.page_context
    }

    pub fn set_page_context(&mut self, context: String) {
        self.page_context = context;
    }

    pub fn can_go_back(&self) -> bool {
        self.index > 0
    }

    pub fn can_go_forward(&self) -> bool {
        self.index + 1 < self.stack.len()
    }

    /// Resolve `input` to a URL and push it, discarding forward history.
    /// Blank input is ignored.
    pub fn navigate(&mut self, input: &str) -> Option<Visit> {
        let normalized = normalize_input(input, &self.search_url)?;
        let url = rewrite_for_embed(&normalized);

        self.loading = true;
        self.blocked = false;
        self.page_context.clear();

        if is_likely_blocked(&url, &self.blocked_domains) {
            info!(url = %url, "Embedding blocked by domain policy");
            self.blocked = true;
            self.loading = false;
            self.page_context = auto_blocked_context(&url);
        }

        self.push(url.clone());
        info!(url = %url, index = self.index, depth = self.stack.len(), "Navigated");
        Some(Visit {
            url,
            blocked: self.blocked,
        })
    }

    /// Push the welcome page as a regular history entry.
    pub fn go_home(&mut self) {
        self.loading = false;
        self.blocked = false;
        self.page_context = WELCOME_CONTEXT.to_string();
        let url = self.welcome_url.clone();
        self.push(url);
        debug!(index = self.index, "Navigated home");
    }

    pub fn go_back(&mut self) -> bool {
        if !self.can_go_back() {
            return false;
        }
        self.index -= 1;
        self.enter_current();
        true
    }

    pub fn go_forward(&mut self) -> bool {
        if !self.can_go_forward() {
            return false;
        }
        self.index += 1;
        self.enter_current();
        true
    }

    /// Reload the current entry without touching history. No-op on the welcome page.
    pub fn refresh(&mut self) -> bool {
        if self.is_welcome() {
            return false;
        }
        self.loading = true;
        self.reload_epoch += 1;
        debug!(url = %self.current_url(), epoch = self.reload_epoch, "Refreshing");
        true
    }

    /// Manual override for pages that refuse framing but escaped the domain list.
    pub fn report_blocked(&mut self) {
        self.blocked = true;
        self.loading = false;
        self.page_context = reported_blocked_context(self.current_url());
        info!(url = %self.current_url(), "User reported page as blocked");
    }

    /// Called once the current page has finished loading.
    pub fn mark_loaded(&mut self) {
        self.loading = false;
    }

    pub fn snapshot(&self, is_sidebar_open: bool) -> BrowserState {
        BrowserState {
            current_url: self.current_url().to_string(),
            history_stack: self.stack.clone(),
            history_index: self.index,
            is_sidebar_open,
        }
    }

    /// Restore persisted history. A corrupt cursor is clamped into range and an
    /// empty stack leaves the controller at its initial state.
    pub fn restore(&mut self, state: &BrowserState) {
        if state.history_stack.is_empty() {
            warn!("Persisted history is empty, keeping initial state");
            return;
        }

        let last = state.history_stack.len() - 1;
        if state.history_index > last {
            warn!(index = state.history_index, len = state.history_stack.len(), "Clamping persisted history index");
        }
        self.stack = state.history_stack.clone();
        self.index = state.history_index.min(last);

        if self.current_url() != state.current_url {
            debug!(saved = %state.current_url, cursor = %self.current_url(), "Persisted URL disagrees with cursor, using cursor");
        }

        self.loading = false;
        self.page_context.clear();
        self.blocked = !self.is_welcome() && is_likely_blocked(self.current_url(), &self.blocked_domains);
        if self.blocked {
            self.page_context = auto_blocked_context(self.current_url());
        }
    }

    fn push(&mut self, url: String) {
        self.stack.truncate(self.index + 1);
        self.stack.push(url);
        self.index = self.stack.len() - 1;
    }

    fn enter_current(&mut self) {
        let url = self.current_url().to_string();
        self.page_context.clear();
        if url == self.welcome_url {
            self.blocked = false;
            self.loading = false;
            self.page_context = WELCOME_CONTEXT.to_string();
        } else {
            self.blocked = is_likely_blocked(&url, &self.blocked_domains);
            self.loading = !self.blocked;
            if self.blocked {
                self.page_context = auto_blocked_context(&url);
            }
        }
        debug!(url = %url, index = self.index, blocked = self.blocked, "Moved through history");
    }
}
