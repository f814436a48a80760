pub mod ask;
pub mod auth;
pub mod browse;
pub mod notes;
pub mod onboard;
pub mod render;
pub mod status;
pub mod threads;

use std::sync::Arc;

use letex_agent::{BrowserSession, SessionStores};
use letex_core::{Config, Paths};
use letex_navigation::HttpPageReader;
use letex_providers::{create_main_provider, Provider};
use letex_storage::{BrowserStateStore, IdentityStore, SqliteDocumentStore};

pub(crate) fn load_config(paths: &Paths) -> anyhow::Result<Config> {
    Ok(Config::load_or_default(paths)?)
}

pub(crate) fn open_stores(paths: &Paths) -> anyhow::Result<SessionStores> {
    paths.ensure_dirs()?;
    Ok(SessionStores {
        documents: Arc::new(SqliteDocumentStore::open(&paths.store_db())?),
        identity: IdentityStore::new(paths),
        browser_state: BrowserStateStore::new(paths),
    })
}

/// Wire a session from config and restore the last browser state.
pub(crate) fn build_session(config: &Config, paths: &Paths) -> anyhow::Result<BrowserSession> {
    let provider: Arc<dyn Provider> = Arc::from(create_main_provider(config)?);
    let reader = Arc::new(HttpPageReader::new(&config.browser)?);
    let mut session = BrowserSession::new(config, provider, reader, open_stores(paths)?);
    session.restore_state()?;
    Ok(session)
}
