use regex::Regex;
use std::sync::LazyLock;

static COLLAPSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s\s+|\r\n?|\n").expect("whitespace pattern is valid"));

/// Trims `text` and collapses whitespace runs and line breaks to one space.
pub fn sanitize_str(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    COLLAPSE.replace_all(trimmed, " ").into_owned()
}

/// Joins two optional parts with `sep`, skipping whichever is empty.
pub fn join_strs(a: Option<&str>, b: Option<&str>, sep: &str) -> String {
    match (a.filter(|s| !s.is_empty()), b.filter(|s| !s.is_empty())) {
        (Some(a), Some(b)) => format!("{a}{sep}{b}"),
        (Some(a), None) => a.to_string(),
        (None, Some(b)) => b.to_string(),
        (None, None) => String::new(),
    }
}
