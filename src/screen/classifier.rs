use crate::screen::patterns::{FIELD_PATTERNS, LABEL_PATTERNS};
use crate::screen::screen_model::{IdentifierTokens, SemanticFieldType};
use crate::state::normalize::strip_separators;
use crate::state::profile::CustomParameter;

/// Custom-parameter tokens must be longer than this to match attributes.
const MIN_CUSTOM_TOKEN_LEN: usize = 2;

/// Assign at most one semantic type: attributes first, then label text,
/// then the user's custom parameters.
pub fn classify(
    tokens: &IdentifierTokens,
    label: &str,
    custom: &[CustomParameter],
) -> Option<SemanticFieldType> {
    let attrs = tokens.attribute_string();

    classify_by_attributes(&attrs)
        .or_else(|| classify_by_label(label))
        .or_else(|| match_custom_parameter(&attrs, label, custom))
}

pub fn classify_by_attributes(attrs: &str) -> Option<SemanticFieldType> {
    if attrs.trim().is_empty() {
        return None;
    }

    FIELD_PATTERNS
        .iter()
        .find(|entry| {
            entry.fragments.iter().any(|fragment| {
                attrs.contains(&strip_separators(fragment)) || attrs.contains(fragment)
            })
        })
        .map(|entry| entry.field.clone())
}

pub fn classify_by_label(label: &str) -> Option<SemanticFieldType> {
    let label = label.trim();
    if label.is_empty() {
        return None;
    }

    LABEL_PATTERNS
        .iter()
        .find(|entry| entry.regex.is_match(label))
        .map(|entry| entry.field.clone())
}

pub fn match_custom_parameter(
    attrs: &str,
    label: &str,
    custom: &[CustomParameter],
) -> Option<SemanticFieldType> {
    let label = label.to_lowercase();

    custom
        .iter()
        .find(|param| {
            let wanted = param.label.trim().to_lowercase();
            if wanted.is_empty() {
                return false;
            }
            if !label.is_empty() && label.contains(&wanted) {
                return true;
            }
            custom_tokens(&wanted)
                .iter()
                .any(|token| attrs.contains(token.as_str()))
        })
        .map(CustomParameter::field)
}

/// `"Notice Period (weeks)"` → `["notice", "period", "weeks"]`.
fn custom_tokens(label: &str) -> Vec<String> {
    label
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| t.len() > MIN_CUSTOM_TOKEN_LEN)
        .map(str::to_string)
        .collect()
}
