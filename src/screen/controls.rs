use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::browser::document::{Document, NodeId};
use crate::browser::selector::Selector;
use crate::browser::widget::{ChoiceWidget, Combobox, NativeSelect};
use crate::screen::screen_model::{FormControl, IdentifierTokens, WidgetKind};
use crate::state::normalize::text_fingerprint;

pub const CONTROL_SELECTOR: &str = "input, textarea, select";

/// Wrappers of composite dropdowns; inputs inside them other than the
/// combobox itself belong to the widget, not the form.
pub const COMPOSITE_SHELL_SELECTOR: &str = ".select-shell, .select__control";

static CONTROLS: Lazy<Option<Selector>> = Lazy::new(|| Selector::parse(CONTROL_SELECTOR).ok());
static COMPOSITE_SHELL: Lazy<Option<Selector>> =
    Lazy::new(|| Selector::parse(COMPOSITE_SHELL_SELECTOR).ok());
static COMPOSITE_ROOT: Lazy<Option<Selector>> = Lazy::new(|| Selector::parse(".select__control").ok());

/// All fillable controls in document order.
pub fn enumerate_controls(doc: &dyn Document) -> Vec<FormControl> {
    let Some(selector) = CONTROLS.as_ref() else {
        return Vec::new();
    };

    let mut occurrences: HashMap<String, usize> = HashMap::new();
    let mut controls = Vec::new();

    for node in doc.query_all(selector) {
        let Some(kind) = widget_kind(doc, node) else {
            continue;
        };
        if !is_editable(doc, node) || !doc.is_rendered(node) {
            continue;
        }

        let tokens = identifier_tokens(doc, node);
        let input_type = doc.attr(node, "type").map(|t| t.to_lowercase());
        let max_length = doc.attr(node, "maxlength").and_then(|m| m.trim().parse().ok());

        let current_value = read_current_value(doc, node, kind);

        let signature = control_signature(&doc.tag(node), &tokens, input_type.as_deref());
        let index = occurrences.entry(signature.clone()).or_insert(0);
        let fingerprint = text_fingerprint(&format!("{}#{}", signature, index));
        *index += 1;

        controls.push(FormControl {
            node,
            kind,
            tokens,
            input_type,
            max_length,
            current_value,
            editable: true,
            fingerprint,
        });
    }

    controls
}

/// Raw value for text controls; for dropdowns the rendered selection, empty
/// while only a placeholder shows.
pub fn read_current_value(doc: &dyn Document, node: NodeId, kind: WidgetKind) -> String {
    match kind {
        WidgetKind::CompositeCombobox { root } => Combobox::new(node, root).selection_text(doc),
        WidgetKind::NativeSelect => NativeSelect::new(node).chosen_text(doc),
        WidgetKind::NativeText | WidgetKind::NativeTextarea => doc.value(node),
    }
}

/// Widget kind for a candidate node, `None` when it is not a data control.
pub fn widget_kind(doc: &dyn Document, node: NodeId) -> Option<WidgetKind> {
    let in_shell = COMPOSITE_SHELL
        .as_ref()
        .and_then(|shell| doc.closest(node, shell))
        .is_some();

    match doc.tag(node).as_str() {
        "textarea" => Some(WidgetKind::NativeTextarea),
        "select" if in_shell => None,
        "select" => Some(WidgetKind::NativeSelect),
        "input" => {
            if doc.attr(node, "role").as_deref() == Some("combobox") {
                return Some(WidgetKind::CompositeCombobox {
                    root: composite_root(doc, node),
                });
            }
            if in_shell || !is_data_input_type(doc.attr(node, "type").as_deref()) {
                return None;
            }
            Some(WidgetKind::NativeText)
        }
        _ => None,
    }
}

fn composite_root(doc: &dyn Document, input: NodeId) -> NodeId {
    COMPOSITE_ROOT
        .as_ref()
        .and_then(|sel| doc.closest(input, sel))
        .unwrap_or(input)
}

fn is_data_input_type(input_type: Option<&str>) -> bool {
    match input_type.map(|t| t.trim().to_lowercase()).as_deref() {
        None
        | Some("")
        | Some("text")
        | Some("email")
        | Some("search")
        | Some("number")
        | Some("tel")
        | Some("url")
        | Some("date")
        | Some("month")
        | Some("week")
        | Some("time") => true,

        // Explicit non-data kinds
        Some("hidden")
        | Some("submit")
        | Some("button")
        | Some("file")
        | Some("checkbox")
        | Some("radio")
        | Some("reset")
        | Some("image") => false,

        // Unknown, be conservative
        _ => false,
    }
}

fn is_editable(doc: &dyn Document, node: NodeId) -> bool {
    doc.attr(node, "disabled").is_none() && doc.attr(node, "readonly").is_none()
}

pub fn identifier_tokens(doc: &dyn Document, node: NodeId) -> IdentifierTokens {
    IdentifierTokens {
        name: doc.attr(node, "name"),
        id: doc.attr(node, "id"),
        placeholder: doc.attr(node, "placeholder"),
        data_field: doc.attr(node, "data-field"),
        aria_label: doc.attr(node, "aria-label"),
        autocomplete: doc.attr(node, "autocomplete"),
    }
}

fn control_signature(tag: &str, tokens: &IdentifierTokens, input_type: Option<&str>) -> String {
    format!(
        "{}|{}|{}",
        tag,
        input_type.unwrap_or(""),
        tokens.attribute_string()
    )
}
