//! Text sent to the model on every turn.

pub const SYSTEM_INSTRUCTION: &str = "\
You are LetEX, a high-fidelity, context-aware AI browsing assistant.
Your goal is to help the user navigate the web, summarize content, and answer questions.
You have access to the content of the webpage the user is currently viewing (if available) via the \"pageContext\" variable provided in the prompt.
- If \"pageContext\" is available, use it to answer questions about the page.
- If \"pageContext\" indicates security restrictions, acknowledge that you cannot read the page directly and offer to search for the information using Google Search.
- Keep responses concise, professional, and formatted in clean Markdown.
- Use bullet points for lists and bold text for emphasis.";

const NO_CONTEXT: &str = "No specific page context available.";

pub const SUMMARIZE_PROMPT: &str =
    "Provide a 4-point, bulleted summary of the content in the current context.";

pub fn reader_mode_prompt(url: &str) -> String {
    format!(
        "Please read and summarize the content of this URL: {}. It cannot be displayed in the iframe due to security restrictions.",
        url
    )
}

/// Wrap the user's query with the page context block.
pub fn build_user_prompt(page_context: &str, query: &str) -> String {
    let context = if page_context.trim().is_empty() {
        NO_CONTEXT
    } else {
        page_context
    };
    format!(
        "[CURRENT PAGE CONTEXT]\n{}\n[END CONTEXT]\n\nUser Query: {}",
        context, query
    )
}
