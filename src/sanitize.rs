//! Input clean-up applied after validation and before storage.

use std::collections::HashSet;

const MAX_SEARCH_LEN: usize = 100;

/// Remove all markup and keep only the text content.
pub fn strip_html(input: &str) -> String {
    ammonia::Builder::default()
        .tags(HashSet::<&str>::new())
        .clean(input)
        .to_string()
        .trim()
        .to_string()
}

/// Sanitize user-authored rich text (descriptions, FAQ answers).
pub fn clean_rich_text(input: &str) -> String {
    ammonia::clean(input).trim().to_string()
}

pub fn normalize_email(input: &str) -> String {
    input.trim().to_lowercase()
}

/// Keep digits and a single leading `+`.
pub fn normalize_phone(input: &str) -> String {
    let trimmed = input.trim();
    let mut out = String::with_capacity(trimmed.len());
    if trimmed.starts_with('+') {
        out.push('+');
    }
    out.extend(trimmed.chars().filter(char::is_ascii_digit));
    out
}

/// Free-text search terms: no markup, a small character set, collapsed
/// whitespace, bounded length.
pub fn sanitize_search(input: &str) -> String {
    let text = strip_html(input);
    let filtered: String = text
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | ',' | '.') {
                c
            } else {
                ' '
            }
        })
        .collect();

    filtered
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(MAX_SEARCH_LEN)
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// Lowercase ASCII alphanumerics joined by single dashes.
pub fn slugify(input: &str) -> String {
    input
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_html_keeps_text_only() {
        assert_eq!(strip_html("<b>Sea</b> view <script>alert(1)</script>"), "Sea view");
        assert_eq!(strip_html("  plain  "), "plain");
    }

    #[test]
    fn rich_text_drops_scripts_but_keeps_formatting() {
        let cleaned = clean_rich_text("<p>Nice <em>garden</em></p><script>x()</script>");
        assert_eq!(cleaned, "<p>Nice <em>garden</em></p>");
    }

    #[test]
    fn email_and_phone() {
        assert_eq!(normalize_email("  Agent@Example.COM "), "agent@example.com");
        assert_eq!(normalize_phone("+91 (987) 654-3210"), "+919876543210");
        assert_eq!(normalize_phone("987-654-3210"), "9876543210");
    }

    #[test]
    fn search_terms_are_bounded() {
        assert_eq!(sanitize_search("  2BHK;  <i>Pune</i>  DROP--"), "2BHK Pune DROP--");
        assert_eq!(sanitize_search(&"a".repeat(300)).len(), MAX_SEARCH_LEN);
    }

    #[test]
    fn slugs() {
        assert_eq!(slugify("Sunny 3BHK Flat, Koramangala!"), "sunny-3bhk-flat-koramangala");
        assert_eq!(slugify("---"), "");
    }
}
