//! Fixed link heuristic for the anti-link filter.

use regex::Regex;
use std::sync::LazyLock;

// Scheme prefixes, common hosts, and short-link suffixes. Deliberately a fixed
// pattern set, not full URL parsing.
static LINK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(https?://|t\.me/|www\.|\.com\b|\.net\b|\.org\b|\.id\b|bit\.ly)")
        .expect("static regex")
});

/// Whether the text looks like it carries a link.
pub fn has_link(text: &str) -> bool {
    LINK_PATTERN.is_match(text)
}
