use once_cell::sync::Lazy;

use crate::browser::document::{Document, NodeId};
use crate::browser::selector::Selector;
use crate::state::normalize::{clean_label, collapse_whitespace, separators_to_spaces, truncate_chars};

/// Block elements that scope a control's visible question.
pub const CONTAINER_SELECTOR: &str = "div, fieldset, section, li, td";

/// Surrounding container text is clipped to this many characters.
pub const MAX_CONTAINER_TEXT: usize = 500;

static CONTAINER: Lazy<Option<Selector>> = Lazy::new(|| Selector::parse(CONTAINER_SELECTOR).ok());
static LABEL: Lazy<Option<Selector>> = Lazy::new(|| Selector::parse("label").ok());
static LABEL_LIKE: Lazy<Option<Selector>> =
    Lazy::new(|| Selector::parse("label, legend, .label").ok());

/// The label element explicitly or structurally associated with `control`.
///
/// Same search as [`resolve_label`] without the attribute fallback; `None`
/// when no element carries the text.
pub fn find_label_text(doc: &dyn Document, control: NodeId) -> Option<String> {
    let candidates = [
        label_by_for(doc, control),
        labelled_by(doc, control),
        wrapping_label(doc, control),
        container_label(doc, control),
    ];

    candidates
        .into_iter()
        .flatten()
        .map(|text| clean_label(&text))
        .find(|text| !text.is_empty())
}

/// Best human-readable text for `control`; empty when nothing is found.
pub fn resolve_label(doc: &dyn Document, control: NodeId) -> String {
    if let Some(text) = find_label_text(doc, control) {
        return text;
    }

    if let Some(placeholder) = non_empty_attr(doc, control, "placeholder") {
        return clean_label(&placeholder);
    }
    for attr in ["name", "id"] {
        if let Some(raw) = non_empty_attr(doc, control, attr) {
            return clean_label(&separators_to_spaces(&raw));
        }
    }
    String::new()
}

/// Whitespace-collapsed text of the nearest block container.
pub fn container_text(doc: &dyn Document, control: NodeId) -> String {
    let Some(selector) = CONTAINER.as_ref() else {
        return String::new();
    };
    let Some(parent) = parent_container(doc, control, selector) else {
        return String::new();
    };
    truncate_chars(&doc.text(parent), MAX_CONTAINER_TEXT).to_string()
}

fn non_empty_attr(doc: &dyn Document, node: NodeId, name: &str) -> Option<String> {
    doc.attr(node, name).filter(|v| !v.trim().is_empty())
}

fn label_by_for(doc: &dyn Document, control: NodeId) -> Option<String> {
    let id = non_empty_attr(doc, control, "id")?;
    let selector = Selector::parse(&format!("label[for=\"{}\"]", id.replace('"', ""))).ok()?;
    doc.query_first(&selector).map(|label| doc.text(label))
}

fn labelled_by(doc: &dyn Document, control: NodeId) -> Option<String> {
    let ids = non_empty_attr(doc, control, "aria-labelledby")?;
    let text = ids
        .split_whitespace()
        .filter_map(|id| doc.element_by_id(id))
        .map(|node| doc.text(node))
        .collect::<Vec<_>>()
        .join(" ");
    Some(text)
}

fn wrapping_label(doc: &dyn Document, control: NodeId) -> Option<String> {
    let label = doc.closest(control, LABEL.as_ref()?)?;
    Some(without_control_text(doc, label, control))
}

fn container_label(doc: &dyn Document, control: NodeId) -> Option<String> {
    let container = parent_container(doc, control, CONTAINER.as_ref()?)?;
    let label = doc.query_first_within(container, LABEL_LIKE.as_ref()?)?;
    Some(without_control_text(doc, label, control))
}

/// Closest container strictly above the control itself.
fn parent_container(doc: &dyn Document, control: NodeId, selector: &Selector) -> Option<NodeId> {
    doc.closest(control, selector).filter(|&c| c != control)
}

// A label that wraps its control also contains the control's own text
// (option lists, textarea content).
fn without_control_text(doc: &dyn Document, label: NodeId, control: NodeId) -> String {
    let text = doc.text(label);
    let own = doc.text(control);
    if own.is_empty() {
        return text;
    }
    collapse_whitespace(&text.replacen(&own, " ", 1))
}
