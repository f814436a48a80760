use std::sync::Arc;

use letex_core::{BrowserState, Config, Error, Identity, Message, Note, Result, Thread};
use letex_navigation::{classify, CommandKind, ContextExtractor, NavigationController, PageReader, Visit};
use letex_providers::Provider;
use letex_storage::{BrowserStateStore, DocumentStoreHandle, IdentityStore};
use letex_tools::ToolRegistry;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::conversation::{Conversation, SharedConversation};
use crate::orchestrator::{AgentOrchestrator, OrchestratorSettings, SendOutcome};
use crate::prompt::{reader_mode_prompt, SUMMARIZE_PROMPT};

/// Work that finishes after the operation that scheduled it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    NotesRefreshDue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Ignored,
    Navigated(Visit),
    Sent(SendOutcome),
}

pub struct SessionStores {
    pub documents: DocumentStoreHandle,
    pub identity: IdentityStore,
    pub browser_state: BrowserStateStore,
}

/// Everything the browser window shows: the page, its history, the chat
/// sidebar and the signed-in user's threads and notes.
pub struct BrowserSession {
    nav: NavigationController,
    extractor: ContextExtractor,
    orchestrator: AgentOrchestrator,
    conversation: SharedConversation,
    identity: Option<Identity>,
    threads: Vec<Thread>,
    notes: Vec<Note>,
    sidebar_open: bool,
    stores: SessionStores,
    event_rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl BrowserSession {
    pub fn new(
        config: &Config,
        provider: Arc<dyn Provider>,
        reader: Arc<dyn PageReader>,
        stores: SessionStores,
    ) -> Self {
        Self::with_settings(config, OrchestratorSettings::from(&config.agent), provider, reader, stores)
    }

    pub fn with_settings(
        config: &Config,
        settings: OrchestratorSettings,
        provider: Arc<dyn Provider>,
        reader: Arc<dyn PageReader>,
        stores: SessionStores,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let mut orchestrator = AgentOrchestrator::new(provider, ToolRegistry::with_defaults(), settings)
            .with_documents(stores.documents.clone());
        orchestrator.set_event_tx(event_tx);

        Self {
            nav: NavigationController::new(&config.browser),
            extractor: ContextExtractor::new(reader, &config.browser),
            orchestrator,
            conversation: Conversation::new().shared(),
            identity: None,
            threads: Vec::new(),
            notes: Vec::new(),
            sidebar_open: true,
            stores,
            event_rx,
        }
    }

    pub fn navigation(&self) -> &NavigationController {
        &self.nav
    }

    pub fn conversation(&self) -> SharedConversation {
        self.conversation.clone()
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.conversation.lock().await.messages().to_vec()
    }

    pub async fn thread_id(&self) -> String {
        self.conversation.lock().await.thread_id().to_string()
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn threads(&self) -> &[Thread] {
        &self.threads
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn is_sidebar_open(&self) -> bool {
        self.sidebar_open
    }

    pub fn page_context(&self) -> &str {
        self.nav.page_context()
    }

    // Command bar

    /// URLs and bare domains navigate; anything else goes to the agent.
    pub async fn handle_command(&mut self, input: &str) -> CommandOutcome {
        let input = input.trim();
        if input.is_empty() {
            return CommandOutcome::Ignored;
        }
        match classify(input) {
            CommandKind::Navigation => match self.navigate(input) {
                Some(visit) => CommandOutcome::Navigated(visit),
                None => CommandOutcome::Ignored,
            },
            CommandKind::Query => CommandOutcome::Sent(self.send_message(input).await),
        }
    }

    // Navigation

    pub fn navigate(&mut self, input: &str) -> Option<Visit> {
        let visit = self.nav.navigate(input)?;
        self.persist_state();
        Some(visit)
    }

    pub fn go_back(&mut self) -> bool {
        let moved = self.nav.go_back();
        if moved {
            self.persist_state();
        }
        moved
    }

    pub fn go_forward(&mut self) -> bool {
        let moved = self.nav.go_forward();
        if moved {
            self.persist_state();
        }
        moved
    }

    pub fn go_home(&mut self) {
        self.nav.go_home();
        self.persist_state();
    }

    pub fn refresh(&mut self) -> bool {
        self.nav.refresh()
    }

    pub fn report_blocked(&mut self) {
        self.nav.report_blocked();
    }

    /// The current page finished loading: read its text into the page context.
    /// Blocked pages never load and keep their explanatory context.
    pub async fn on_page_load(&mut self) {
        if self.nav.is_blocked() {
            debug!(url = %self.nav.current_url(), "Blocked page, skipping extraction");
            return;
        }
        self.nav.mark_loaded();
        let url = self.nav.current_url().to_string();
        let context = self.extractor.extract(&url).await;
        self.nav.set_page_context(context);
    }

    // Chat

    pub async fn send_message(&mut self, text: &str) -> SendOutcome {
        self.sidebar_open = true;
        let page_context = self.nav.page_context().to_string();
        let outcome = self
            .orchestrator
            .send(&self.conversation, self.identity.as_ref(), text, &page_context)
            .await;

        if matches!(outcome, SendOutcome::Answered { .. }) {
            if let Err(e) = self.autosave_thread().await {
                warn!(error = %e, "Failed to save thread");
            }
        }
        outcome
    }

    pub async fn summarize(&mut self) -> SendOutcome {
        self.send_message(SUMMARIZE_PROMPT).await
    }

    /// Ask the agent about a page that cannot be shown.
    pub async fn reader_mode(&mut self) -> SendOutcome {
        let prompt = reader_mode_prompt(self.nav.current_url());
        self.send_message(&prompt).await
    }

    pub fn new_chat(&mut self) {
        // Pending sends keep the old conversation and finish there unseen.
        self.conversation = Conversation::new().shared();
        debug!("Started new chat");
    }

    pub async fn select_thread(&mut self, thread_id: &str) -> Result<()> {
        let thread = self
            .threads
            .iter()
            .find(|t| t.id == thread_id)
            .ok_or_else(|| Error::NotFound(format!("Thread {}", thread_id)))?;
        self.conversation = Conversation::from_thread(thread).shared();
        info!(thread_id, "Thread selected");

        if let Err(e) = self.autosave_thread().await {
            warn!(error = %e, "Failed to save thread");
        }
        Ok(())
    }

    /// Upsert the active thread for the signed-in user and keep the thread list
    /// ordered by recency. Returns whether anything was saved.
    pub async fn autosave_thread(&mut self) -> Result<bool> {
        let Some(uid) = self.identity.as_ref().map(|i| i.uid.clone()) else {
            return Ok(false);
        };
        let (thread_id, title, messages) = {
            let conv = self.conversation.lock().await;
            if !conv.has_exchange() {
                return Ok(false);
            }
            (conv.thread_id().to_string(), conv.title(), conv.messages().to_vec())
        };

        let now = chrono::Utc::now().timestamp_millis();
        self.stores
            .documents
            .save_thread(&uid, &thread_id, &title, &messages, now)?;

        match self.threads.iter_mut().find(|t| t.id == thread_id) {
            Some(existing) => {
                existing.messages = messages;
                existing.updated_at = now;
            }
            None => self.threads.insert(
                0,
                Thread {
                    id: thread_id,
                    user_id: uid,
                    title,
                    messages,
                    updated_at: now,
                },
            ),
        }
        self.threads.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(true)
    }

    // Identity

    pub fn sign_in(&mut self, display_name: Option<&str>, email: Option<&str>) -> Result<Identity> {
        let identity = self.stores.identity.sign_in(display_name, email)?;
        self.identity = Some(identity.clone());
        self.load_user_data();
        Ok(identity)
    }

    pub fn sign_out(&mut self) -> Result<()> {
        self.stores.identity.sign_out()?;
        self.identity = None;
        self.threads.clear();
        self.notes.clear();
        self.new_chat();
        Ok(())
    }

    pub fn refresh_notes(&mut self) {
        let Some(uid) = self.identity.as_ref().map(|i| i.uid.clone()) else {
            return;
        };
        self.notes = self.stores.documents.get_user_notes(&uid).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load notes");
            Vec::new()
        });
        debug!(count = self.notes.len(), "Notes refreshed");
    }

    /// Apply events that became due since the last call. Returns how many were applied.
    pub fn drain_events(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.event_rx.try_recv() {
            match event {
                SessionEvent::NotesRefreshDue => self.refresh_notes(),
            }
            applied += 1;
        }
        applied
    }

    fn load_user_data(&mut self) {
        let Some(uid) = self.identity.as_ref().map(|i| i.uid.clone()) else {
            return;
        };
        self.threads = self.stores.documents.get_user_threads(&uid).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load threads");
            Vec::new()
        });
        self.refresh_notes();
        info!(uid = %uid, threads = self.threads.len(), notes = self.notes.len(), "User data loaded");
    }

    // Window state

    pub fn toggle_sidebar(&mut self) -> bool {
        self.sidebar_open = !self.sidebar_open;
        self.persist_state();
        self.sidebar_open
    }

    pub fn save_state(&self) -> Result<()> {
        self.stores.browser_state.save(&self.snapshot())
    }

    pub fn snapshot(&self) -> BrowserState {
        self.nav.snapshot(self.sidebar_open)
    }

    /// Reload persisted navigation state and the signed-in identity.
    pub fn restore_state(&mut self) -> Result<()> {
        if let Some(state) = self.stores.browser_state.load()? {
            self.nav.restore(&state);
            self.sidebar_open = state.is_sidebar_open;
            debug!(url = %self.nav.current_url(), "Browser state restored");
        }
        self.identity = self.stores.identity.current()?;
        self.load_user_data();
        Ok(())
    }

    fn persist_state(&self) {
        if let Err(e) = self.save_state() {
            warn!(error = %e, "Failed to persist browser state");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::tests::{fast_settings, ScriptedProvider};
    use crate::orchestrator::API_ERROR_REPLY;
    use async_trait::async_trait;
    use letex_core::types::{ChatMessage, LLMResponse};
    use letex_core::Paths;
    use letex_navigation::WELCOME_CONTEXT;
    use letex_storage::SqliteDocumentStore;
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    struct StaticReader;

    #[async_trait]
    impl PageReader for StaticReader {
        async fn read_visible_text(&self, url: &str) -> Result<String> {
            if url.contains("denied") {
                return Err(Error::Other("X-Frame-Options: DENY".to_string()));
            }
            Ok(format!("{} explains ownership, borrowing and lifetimes in depth.", url))
        }
    }

    /// Answers from a script and records the stored thread at every call.
    struct StoreWatchingProvider {
        documents: DocumentStoreHandle,
        uid: Mutex<String>,
        replies: Mutex<Vec<LLMResponse>>,
        stored: Mutex<Vec<Vec<Message>>>,
    }

    #[async_trait]
    impl Provider for StoreWatchingProvider {
        async fn chat(&self, _messages: &[ChatMessage], _tools: &[Value]) -> Result<LLMResponse> {
            let uid = self.uid.lock().unwrap().clone();
            let threads = self.documents.get_user_threads(&uid)?;
            self.stored
                .lock()
                .unwrap()
                .push(threads.first().map(|t| t.messages.clone()).unwrap_or_default());
            Ok(self.replies.lock().unwrap().remove(0))
        }
    }

    fn stores(dir: &TempDir) -> SessionStores {
        let paths = Paths::with_base(dir.path().to_path_buf());
        SessionStores {
            documents: Arc::new(SqliteDocumentStore::open(&paths.store_db()).unwrap()),
            identity: IdentityStore::new(&paths),
            browser_state: BrowserStateStore::new(&paths),
        }
    }

    fn session(dir: &TempDir, replies: Vec<Result<LLMResponse>>) -> BrowserSession {
        BrowserSession::with_settings(
            &Config::default(),
            fast_settings(),
            ScriptedProvider::new(replies),
            Arc::new(StaticReader),
            stores(dir),
        )
    }

    #[tokio::test]
    async fn test_chat_requires_sign_in_and_opens_sidebar() {
        let dir = TempDir::new().unwrap();
        let mut s = session(&dir, vec![]);
        s.toggle_sidebar();
        assert!(!s.is_sidebar_open());

        let outcome = s.handle_command("what is this page").await;
        assert_eq!(outcome, CommandOutcome::Sent(SendOutcome::SignInRequired));
        assert!(s.is_sidebar_open());
        assert_eq!(s.messages().await.len(), 1);
    }

    #[tokio::test]
    async fn test_command_dispatch() {
        let dir = TempDir::new().unwrap();
        let mut s = session(&dir, vec![Ok(LLMResponse::text("hi"))]);
        s.sign_in(Some("Ada"), None).unwrap();

        assert_eq!(s.handle_command("   ").await, CommandOutcome::Ignored);

        let outcome = s.handle_command("docs.rs").await;
        assert_eq!(
            outcome,
            CommandOutcome::Navigated(Visit {
                url: "https://docs.rs".to_string(),
                blocked: false
            })
        );
        assert!(s.navigation().is_loading());

        let outcome = s.handle_command("hello there").await;
        assert!(matches!(outcome, CommandOutcome::Sent(SendOutcome::Answered { .. })));
    }

    #[tokio::test]
    async fn test_page_load_fills_context() {
        let dir = TempDir::new().unwrap();
        let mut s = session(&dir, vec![]);

        s.navigate("https://doc.rust-lang.org/book");
        assert_eq!(s.page_context(), "");
        s.on_page_load().await;
        assert!(!s.navigation().is_loading());
        assert!(s.page_context().contains("ownership"));

        s.navigate("https://denied.example.com");
        s.on_page_load().await;
        assert!(s.page_context().starts_with("Context extraction failed"));

        s.navigate("https://www.reddit.com/r/rust");
        let blocked = s.page_context().to_string();
        s.on_page_load().await;
        assert_eq!(s.page_context(), blocked);

        s.go_home();
        assert_eq!(s.page_context(), WELCOME_CONTEXT);
    }

    #[tokio::test]
    async fn test_page_context_reaches_model() {
        let dir = TempDir::new().unwrap();
        let provider = ScriptedProvider::new(vec![Ok(LLMResponse::text("It is the Rust book."))]);
        let mut s = BrowserSession::with_settings(
            &Config::default(),
            fast_settings(),
            provider.clone(),
            Arc::new(StaticReader),
            stores(&dir),
        );
        s.sign_in(Some("Ada"), None).unwrap();
        s.navigate("https://doc.rust-lang.org/book");
        s.on_page_load().await;

        s.summarize().await;
        let requests = provider.requests.lock().unwrap();
        let prompt = requests[0][1].text();
        assert!(prompt.contains("explains ownership"));
        assert!(prompt.ends_with(SUMMARIZE_PROMPT));
    }

    #[tokio::test]
    async fn test_reader_mode_names_current_url() {
        let dir = TempDir::new().unwrap();
        let mut s = session(&dir, vec![Ok(LLMResponse::text("summary"))]);
        s.sign_in(Some("Ada"), None).unwrap();
        s.navigate("https://www.reddit.com/r/rust");

        s.reader_mode().await;
        let msgs = s.messages().await;
        assert_eq!(msgs[1].text, reader_mode_prompt("https://www.reddit.com/r/rust"));
    }

    #[tokio::test]
    async fn test_threads_autosave_and_select() {
        let dir = TempDir::new().unwrap();
        let mut s = session(
            &dir,
            vec![Ok(LLMResponse::text("first answer")), Ok(LLMResponse::text("second answer"))],
        );
        s.sign_in(None, Some("ada@example.com")).unwrap();

        s.send_message("Tell me about the borrow checker please, in detail").await;
        let first_id = s.thread_id().await;
        assert_eq!(s.threads().len(), 1);
        assert_eq!(s.threads()[0].id, first_id);
        assert_eq!(s.threads()[0].title, "Tell me about the borrow checker please,...");

        tokio::time::sleep(Duration::from_millis(2)).await;
        s.new_chat();
        assert_eq!(s.messages().await.len(), 1);
        assert!(!s.autosave_thread().await.unwrap());

        s.send_message("second topic").await;
        assert_eq!(s.threads().len(), 2);
        assert_ne!(s.threads()[0].id, first_id);

        tokio::time::sleep(Duration::from_millis(2)).await;
        s.select_thread(&first_id).await.unwrap();
        assert_eq!(s.thread_id().await, first_id);
        assert_eq!(s.messages().await[2].text, "first answer");
        assert_eq!(s.threads()[0].id, first_id);

        assert!(s.select_thread("thread-0").await.is_err());
    }

    #[tokio::test]
    async fn test_thread_saved_while_model_is_working() {
        let dir = TempDir::new().unwrap();
        let stores = stores(&dir);
        let provider = Arc::new(StoreWatchingProvider {
            documents: stores.documents.clone(),
            uid: Mutex::new(String::new()),
            replies: Mutex::new(vec![
                LLMResponse::tool_call("add_to_notes", json!({"content_to_save": "borrow rules"})),
                LLMResponse::text("Saved."),
            ]),
            stored: Mutex::new(Vec::new()),
        });
        let mut s = BrowserSession::with_settings(
            &Config::default(),
            fast_settings(),
            provider.clone(),
            Arc::new(StaticReader),
            stores,
        );
        let identity = s.sign_in(Some("Ada"), None).unwrap();
        *provider.uid.lock().unwrap() = identity.uid.clone();

        s.send_message("keep the borrow rules").await;

        let stored = provider.stored.lock().unwrap();
        assert_eq!(stored.len(), 2);
        // Greeting, question and placeholder are on disk before the first call.
        assert_eq!(stored[0].len(), 3);
        assert_eq!(stored[0][1].text, "keep the borrow rules");
        assert!(stored[0][2].is_loading);
        // The tool step is on disk before the follow-up call.
        assert_eq!(stored[1].len(), 4);
        assert_eq!(stored[1][2].tool_call.as_ref().unwrap().name, "add_to_notes");
        assert!(stored[1][3].is_loading);

        let saved = s.stores.documents.get_user_threads(&identity.uid).unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].messages.len(), 4);
        assert_eq!(saved[0].messages[3].text, "Saved.");
        assert!(!saved[0].messages[3].is_loading);
        assert_eq!(s.threads()[0].messages, saved[0].messages);
    }

    #[tokio::test]
    async fn test_sign_out_clears_user_data() {
        let dir = TempDir::new().unwrap();
        let mut s = session(&dir, vec![Ok(LLMResponse::text("ok"))]);
        s.sign_in(Some("Ada"), None).unwrap();
        s.send_message("hello").await;
        assert_eq!(s.threads().len(), 1);

        s.sign_out().unwrap();
        assert!(s.identity().is_none());
        assert!(s.threads().is_empty());
        assert!(s.notes().is_empty());
        assert_eq!(s.messages().await.len(), 1);
    }

    #[tokio::test]
    async fn test_notes_refresh_after_tool() {
        let dir = TempDir::new().unwrap();
        let mut s = session(
            &dir,
            vec![
                Ok(LLMResponse::tool_call("add_to_notes", json!({"content_to_save": "remember the borrow rules"}))),
                Ok(LLMResponse::text("Saved.")),
            ],
        );
        s.sign_in(Some("Ada"), None).unwrap();
        assert!(s.notes().is_empty());

        s.send_message("save this").await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(s.drain_events(), 1);
        assert_eq!(s.notes().len(), 1);
        assert_eq!(s.notes()[0].content, "remember the borrow rules");
        assert_eq!(s.drain_events(), 0);
    }

    #[tokio::test]
    async fn test_failed_turn_still_saved() {
        let dir = TempDir::new().unwrap();
        let mut s = session(&dir, vec![Err(Error::Provider("down".to_string()))]);
        s.sign_in(Some("Ada"), None).unwrap();

        s.send_message("hello").await;
        assert_eq!(s.threads()[0].messages[2].text, API_ERROR_REPLY);
    }

    #[tokio::test]
    async fn test_state_survives_restart() {
        let dir = TempDir::new().unwrap();
        {
            let mut s = session(&dir, vec![]);
            s.sign_in(Some("Ada"), None).unwrap();
            s.navigate("docs.rs");
            s.navigate("https://www.youtube.com/watch?v=abc123");
            s.go_back();
            s.toggle_sidebar();
        }

        let mut s = session(&dir, vec![]);
        s.restore_state().unwrap();
        assert_eq!(s.identity().unwrap().display_name.as_deref(), Some("Ada"));
        assert_eq!(s.navigation().current_url(), "https://docs.rs");
        assert_eq!(s.navigation().history().len(), 3);
        assert!(s.navigation().can_go_forward());
        assert!(!s.is_sidebar_open());

        assert!(s.go_forward());
        assert_eq!(s.navigation().current_url(), "https://www.youtube.com/embed/abc123?autoplay=1");
        assert!(!s.navigation().is_blocked());
    }
}
