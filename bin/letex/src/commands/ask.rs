use letex_agent::SendOutcome;
use letex_core::Paths;

use super::{build_session, load_config, render};

pub async fn run(message: String, url: Option<String>) -> anyhow::Result<()> {
    let paths = Paths::new();
    let config = load_config(&paths)?;
    let mut session = build_session(&config, &paths)?;

    if let Some(url) = url {
        session.navigate(&url);
    }
    session.on_page_load().await;

    match session.send_message(&message).await {
        SendOutcome::SignInRequired => {
            anyhow::bail!("Chat requires sign-in. Run `letex login --name <you>` first.");
        }
        SendOutcome::Answered { loading_id, text, .. } => {
            let messages = session.messages().await;
            // Show the tool step, if any, ahead of the answer.
            for msg in messages.iter().filter(|m| m.tool_call.is_some()) {
                println!("{}", render::format_message(msg));
            }
            tracing::debug!(loading_id = %loading_id, "Answer received");
            println!("{}", text);
        }
    }
    Ok(())
}
