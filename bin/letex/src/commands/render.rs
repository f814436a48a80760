use chrono::TimeZone;
use letex_core::{Message, Note, Sender, Thread};
use letex_navigation::NavigationController;

const PREVIEW_CHARS: usize = 160;

fn preview(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > PREVIEW_CHARS {
        format!("{}...", flat.chars().take(PREVIEW_CHARS).collect::<String>())
    } else {
        flat
    }
}

pub fn format_time(ms: i64) -> String {
    chrono::Local
        .timestamp_millis_opt(ms)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn format_message(msg: &Message) -> String {
    match (msg.sender, &msg.tool_call) {
        (Sender::User, _) => format!("you   > {}", msg.text),
        (Sender::Agent, Some(call)) => format!(
            "tool  > {} {}",
            call.name,
            serde_json::Value::Object(call.args.clone())
        ),
        (Sender::Agent, None) if msg.is_loading => "letex > ...".to_string(),
        (Sender::Agent, None) => format!("letex > {}", msg.text),
    }
}

pub fn print_messages(messages: &[Message]) {
    for msg in messages {
        println!("{}", format_message(msg));
    }
}

pub fn format_page(nav: &NavigationController) -> String {
    let state = if nav.is_welcome() {
        "home"
    } else if nav.is_blocked() {
        "blocked"
    } else if nav.is_loading() {
        "loading"
    } else {
        "loaded"
    };
    format!(
        "[{} {}/{}] {} ({})",
        if nav.can_go_back() { "<" } else { " " },
        nav.index() + 1,
        nav.history().len(),
        nav.current_url(),
        state
    )
}

pub fn print_page(nav: &NavigationController) {
    println!("{}", format_page(nav));
    if nav.is_blocked() {
        println!("  This page refuses to be embedded. Try /reader to have the agent read it.");
    }
    if !nav.page_context().is_empty() {
        println!("  {}", preview(nav.page_context()));
    }
}

pub fn print_threads(threads: &[Thread]) {
    if threads.is_empty() {
        println!("No saved threads.");
        return;
    }
    for (i, thread) in threads.iter().enumerate() {
        println!(
            "{:>3}. {}  {}  ({} messages)",
            i + 1,
            format_time(thread.updated_at),
            thread.title,
            thread.messages.len()
        );
    }
}

pub fn print_notes(notes: &[Note]) {
    if notes.is_empty() {
        println!("No notes yet.");
        return;
    }
    for note in notes {
        println!("- {}  {}", format_time(note.created_at), preview(&note.content));
    }
}
