/// Maximum length of a memory key.
pub const MAX_KEY_LEN: usize = 50;

/// Words shorter than this carry no signal for fuzzy recall.
///
/// Three-letter words count on purpose, rather than only words longer than
/// three. "Why do you want to join us" and "Why do you want to work here"
/// share "why", "you" and "want"; with a longer-than-three cut only "want"
/// is left, and the two questions would not recall each other.
pub const MIN_SIGNIFICANT_WORD_LEN: usize = 3;

/// Memory key for a label: lowercased, ASCII alphanumerics only, whitespace
/// runs collapsed to `_`, truncated to `MAX_KEY_LEN`.
pub fn normalize_label_key(label: &str) -> String {
    let lowered = label.to_lowercase();
    let kept: String = lowered
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect();

    kept.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .take(MAX_KEY_LEN)
        .collect()
}

/// Lowercased words of at least `MIN_SIGNIFICANT_WORD_LEN` characters, with
/// surrounding punctuation trimmed.
pub fn significant_words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| w.chars().count() >= MIN_SIGNIFICANT_WORD_LEN)
        .map(str::to_string)
        .collect()
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Label text as shown to users: required-markers and trailing colons
/// removed, whitespace collapsed.
pub fn clean_label(text: &str) -> String {
    let stripped: String = text.chars().filter(|c| *c != '*' && *c != ':').collect();
    collapse_whitespace(&stripped)
}

/// `first_name` / `first-name` → `first name`.
pub fn separators_to_spaces(text: &str) -> String {
    collapse_whitespace(&text.replace(['-', '_'], " "))
}

/// `first_name` / `first-name` → `firstname`.
pub fn strip_separators(text: &str) -> String {
    text.replace(['-', '_'], "")
}

/// Truncate to at most `max` characters without splitting a code point.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn text_fingerprint(text: &str) -> String {
    use sha1::{Digest, Sha1};

    let mut hasher = Sha1::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
