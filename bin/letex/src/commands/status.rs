use letex_core::Paths;
use letex_storage::{BrowserStateStore, IdentityStore};

use super::load_config;

pub async fn run() -> anyhow::Result<()> {
    let paths = Paths::new();

    println!("letex status");
    println!("============");
    println!();

    let config_path = paths.config_file();
    let config_exists = config_path.exists();
    println!(
        "Config:   {} {}",
        config_path.display(),
        if config_exists { "✓" } else { "✗ (using defaults)" }
    );
    println!(
        "Store:    {} {}",
        paths.store_db().display(),
        if paths.store_db().exists() { "✓" } else { "✗ (not created yet)" }
    );

    let config = load_config(&paths)?;
    println!("Model:    {}", config.agent.model);
    println!(
        "Gemini:   {}",
        if config.api_key_for("gemini").is_some() {
            "✓ configured"
        } else {
            "✗ no key"
        }
    );
    println!("Search:   {}", config.browser.search_url);
    println!(
        "Grounding: {}",
        if config.agent.web_search { "Google Search" } else { "off" }
    );
    println!();

    match IdentityStore::new(&paths).current()? {
        Some(identity) => println!("Signed in as {}", identity.label()),
        None => println!("Not signed in. Run `letex login` to enable chat."),
    }

    if let Some(state) = BrowserStateStore::new(&paths).load()? {
        println!(
            "Last page: {} ({} of {} in history)",
            state.current_url,
            state.history_index + 1,
            state.history_stack.len()
        );
    }

    if !config_exists {
        println!();
        println!("Run `letex onboard` to write a config file.");
    }
    Ok(())
}
