use letex_agent::{BrowserSession, CommandOutcome, SendOutcome};
use letex_core::Paths;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use super::{build_session, load_config, render};

const HELP: &str = "\
Type a URL or domain to navigate, anything else to ask the agent.
  /back /forward /home /refresh   move through history
  /report                          mark the page as not displayable
  /summarize /reader               ask the agent about the page
  /new /threads /thread <n>        conversations
  /notes                           saved notes
  /login <name> [email] /logout    identity
  /sidebar /page /help /quit";

/// What a slash command asks the loop to do next.
#[derive(Debug, PartialEq, Eq)]
enum Slash<'a> {
    Back,
    Forward,
    Home,
    Refresh,
    Report,
    Summarize,
    Reader,
    NewChat,
    Threads,
    Thread(&'a str),
    Notes,
    Login(&'a str),
    Logout,
    Sidebar,
    Page,
    Help,
    Quit,
    Unknown(&'a str),
}

fn parse_slash(input: &str) -> Option<Slash<'_>> {
    let rest = input.strip_prefix('/')?;
    let (cmd, arg) = match rest.split_once(char::is_whitespace) {
        Some((cmd, arg)) => (cmd, arg.trim()),
        None => (rest, ""),
    };
    Some(match cmd {
        "back" => Slash::Back,
        "forward" => Slash::Forward,
        "home" => Slash::Home,
        "refresh" => Slash::Refresh,
        "report" => Slash::Report,
        "summarize" => Slash::Summarize,
        "reader" => Slash::Reader,
        "new" => Slash::NewChat,
        "threads" => Slash::Threads,
        "thread" => Slash::Thread(arg),
        "notes" => Slash::Notes,
        "login" => Slash::Login(arg),
        "logout" => Slash::Logout,
        "sidebar" => Slash::Sidebar,
        "page" => Slash::Page,
        "help" => Slash::Help,
        "quit" | "exit" => Slash::Quit,
        _ => Slash::Unknown(cmd),
    })
}

/// `/login Ada ada@example.com`: the word containing `@` is the email.
fn split_login(arg: &str) -> (Option<String>, Option<&str>) {
    let (emails, names): (Vec<&str>, Vec<&str>) =
        arg.split_whitespace().partition(|part| part.contains('@'));
    let name = if names.is_empty() {
        None
    } else {
        Some(names.join(" "))
    };
    (name, emails.first().copied())
}

pub async fn run(url: Option<String>) -> anyhow::Result<()> {
    let paths = Paths::new();
    let config = load_config(&paths)?;
    let mut session = build_session(&config, &paths)?;

    println!("letex browser (type /help for commands, /quit to exit)");
    match session.identity() {
        Some(identity) => println!("Signed in as {}", identity.label()),
        None => println!("Not signed in: browsing works, chat needs /login <name>"),
    }
    println!();

    if let Some(url) = url {
        session.navigate(&url);
    }
    load_page(&mut session).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if session.drain_events() > 0 {
            println!("(notes updated: {})", session.notes().len());
        }
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match parse_slash(input) {
            Some(Slash::Quit) => break,
            Some(cmd) => run_slash(&mut session, cmd).await,
            None => match session.handle_command(input).await {
                CommandOutcome::Navigated(_) => load_page(&mut session).await,
                CommandOutcome::Sent(outcome) => print_outcome(&session, outcome).await,
                CommandOutcome::Ignored => {}
            },
        }
    }

    session.save_state()?;
    println!("Bye.");
    Ok(())
}

async fn run_slash(session: &mut BrowserSession, cmd: Slash<'_>) {
    match cmd {
        Slash::Back => {
            if session.go_back() {
                load_page(session).await;
            } else {
                println!("Nothing to go back to.");
            }
        }
        Slash::Forward => {
            if session.go_forward() {
                load_page(session).await;
            } else {
                println!("Nothing to go forward to.");
            }
        }
        Slash::Home => {
            session.go_home();
            render::print_page(session.navigation());
        }
        Slash::Refresh => {
            if session.refresh() {
                load_page(session).await;
            }
        }
        Slash::Report => {
            session.report_blocked();
            render::print_page(session.navigation());
        }
        Slash::Summarize => {
            let outcome = session.summarize().await;
            print_outcome(session, outcome).await;
        }
        Slash::Reader => {
            let outcome = session.reader_mode().await;
            print_outcome(session, outcome).await;
        }
        Slash::NewChat => {
            session.new_chat();
            render::print_messages(&session.messages().await);
        }
        Slash::Threads => render::print_threads(session.threads()),
        Slash::Thread(arg) => {
            let picked = arg
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| session.threads().get(i))
                .map(|t| t.id.clone());
            match picked {
                Some(id) => match session.select_thread(&id).await {
                    Ok(()) => render::print_messages(&session.messages().await),
                    Err(e) => println!("{}", e),
                },
                None => println!("Usage: /thread <n> (see /threads)"),
            }
        }
        Slash::Notes => {
            session.refresh_notes();
            render::print_notes(session.notes());
        }
        Slash::Login(arg) => {
            let (name, email) = split_login(arg);
            match session.sign_in(name.as_deref(), email) {
                Ok(identity) => println!(
                    "Signed in as {} ({} threads, {} notes)",
                    identity.label(),
                    session.threads().len(),
                    session.notes().len()
                ),
                Err(e) => println!("{}", e),
            }
        }
        Slash::Logout => match session.sign_out() {
            Ok(()) => println!("Signed out."),
            Err(e) => println!("{}", e),
        },
        Slash::Sidebar => {
            let open = session.toggle_sidebar();
            println!("Chat sidebar {}.", if open { "open" } else { "closed" });
            if open {
                render::print_messages(&session.messages().await);
            }
        }
        Slash::Page => render::print_page(session.navigation()),
        Slash::Help => println!("{}", HELP),
        Slash::Unknown(cmd) => println!("Unknown command /{}. Type /help.", cmd),
        Slash::Quit => {}
    }
}

async fn load_page(session: &mut BrowserSession) {
    session.on_page_load().await;
    render::print_page(session.navigation());
}

async fn print_outcome(session: &BrowserSession, outcome: SendOutcome) {
    match outcome {
        SendOutcome::SignInRequired => {
            println!("Please sign in to chat with LetEX: /login <name> [email]");
        }
        SendOutcome::Answered { loading_id, .. } => {
            let messages = session.messages().await;
            // Everything after the user's message: the tool step, then the answer.
            let Some(end) = messages.iter().position(|m| m.id == loading_id) else {
                warn!(loading_id = %loading_id, "Answer not found in conversation");
                return;
            };
            let start = messages[..end]
                .iter()
                .rposition(|m| m.tool_call.is_none())
                .map(|i| i + 1)
                .unwrap_or(end);
            render::print_messages(&messages[start..=end]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_slash() {
        assert_eq!(parse_slash("hello"), None);
        assert_eq!(parse_slash("/back"), Some(Slash::Back));
        assert_eq!(parse_slash("/exit"), Some(Slash::Quit));
        assert_eq!(parse_slash("/thread 2"), Some(Slash::Thread("2")));
        assert_eq!(parse_slash("/login Ada Lovelace"), Some(Slash::Login("Ada Lovelace")));
        assert_eq!(parse_slash("/frobnicate"), Some(Slash::Unknown("frobnicate")));
    }

    #[test]
    fn test_split_login() {
        assert_eq!(split_login("Ada Lovelace"), (Some("Ada Lovelace".to_string()), None));
        assert_eq!(split_login("ada@example.com"), (None, Some("ada@example.com")));
        assert_eq!(
            split_login("Ada ada@example.com"),
            (Some("Ada".to_string()), Some("ada@example.com"))
        );
        assert_eq!(split_login(""), (None, None));
    }
}
