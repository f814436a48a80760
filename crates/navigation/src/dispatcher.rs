use crate::url::{has_http_scheme, looks_like_domain};

/// What a line typed into the command bar is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Navigation,
    Query,
}

/// Decide whether `input` is an address or a question for the agent.
///
/// Anything containing whitespace is a query; otherwise it is a navigation
/// target when it carries an http(s) scheme or looks like a bare domain.
pub fn classify(input: &str) -> CommandKind {
    let trimmed = input.trim();
    if trimmed.chars().any(char::is_whitespace) {
        return CommandKind::Query;
    }
    if has_http_scheme(trimmed) || looks_like_domain(trimmed) {
        CommandKind::Navigation
    } else {
        CommandKind::Query
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domains_and_urls_navigate() {
        for input in ["example.com", "  news.ycombinator.com ", "https://a.b/c d", "http://x"] {
            let expected = if input.trim().contains(' ') {
                CommandKind::Query
            } else {
                CommandKind::Navigation
            };
            assert_eq!(classify(input), expected, "input: {input:?}");
        }
    }

    #[test]
    fn test_whitespace_always_queries() {
        assert_eq!(classify("what is example.com"), CommandKind::Query);
        assert_eq!(classify("example.com\tplease"), CommandKind::Query);
        assert_eq!(classify("summarize this page"), CommandKind::Query);
    }

    #[test]
    fn test_single_words_query() {
        assert_eq!(classify("hello"), CommandKind::Query);
        assert_eq!(classify("ftp://example"), CommandKind::Query);
        assert_eq!(classify(""), CommandKind::Query);
    }
}
