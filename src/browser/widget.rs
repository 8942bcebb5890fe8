use once_cell::sync::Lazy;
use serde::Serialize;

use crate::browser::clock::Pacer;
use crate::browser::document::{Document, DomEvent, Key, NodeId};
use crate::browser::selector::Selector;
use crate::browser::setter::set_value_safely;
use crate::screen::screen_model::{FormControl, WidgetKind};

/// Option text at or above this length is page noise, not a choice.
pub const MAX_OPTION_TEXT_LEN: usize = 200;

/// Structural selectors for the options of an open composite widget, most
/// specific first. The first selector yielding a usable option wins.
pub const OPTION_SELECTORS: &[&str] = &[
    ".select__menu .select__option",
    ".select__menu-list .select__option",
    "[class*=\"menu\"] [class*=\"option\"]",
    "[role=\"listbox\"] [role=\"option\"]",
    ".select__menu-list > div",
    "[id*=\"react-select\"][id*=\"option\"]",
];

static PARSED_OPTION_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    OPTION_SELECTORS
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .collect()
});

static SINGLE_VALUE: Lazy<Option<Selector>> =
    Lazy::new(|| Selector::parse("[class*=\"single-value\"]").ok());

static OPTION_TAG: Lazy<Option<Selector>> = Lazy::new(|| Selector::parse("option").ok());

/// One choice scraped from an open widget.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateOption {
    pub display_text: String,
    pub node: NodeId,
    /// Submitted value; equals the display text for composite widgets.
    pub value: String,
}

/// Whether scraped option text is a real choice.
pub fn is_usable_option_text(text: &str) -> bool {
    let text = text.trim();
    !text.is_empty()
        && text != "Select..."
        && text != "Select"
        && text.chars().count() < MAX_OPTION_TEXT_LEN
}

// ============================================================================
// ChoiceWidget
// ============================================================================

/// Uniform interaction surface over the dropdown kinds.
pub trait ChoiceWidget {
    fn control(&self) -> NodeId;

    /// Make the options available for scraping.
    fn open(&self, doc: &mut dyn Document, pacer: &Pacer<'_>);

    fn scrape_options(&self, doc: &dyn Document) -> Vec<CandidateOption>;

    /// Choose `option` and report whether the widget now shows it.
    fn select(&self, doc: &mut dyn Document, option: &CandidateOption, pacer: &Pacer<'_>) -> bool;

    /// Second attempt by typing `text` and confirming from the keyboard.
    fn fallback_select(&self, _doc: &mut dyn Document, _text: &str, _pacer: &Pacer<'_>) -> bool {
        false
    }

    fn close(&self, doc: &mut dyn Document);

    /// Text of the rendered selection; empty when nothing is chosen.
    fn selection_text(&self, doc: &dyn Document) -> String;
}

/// Widget for a dropdown control, `None` for free-text kinds.
pub fn choice_widget(control: &FormControl) -> Option<Box<dyn ChoiceWidget>> {
    match control.kind {
        WidgetKind::NativeSelect => Some(Box::new(NativeSelect::new(control.node))),
        WidgetKind::CompositeCombobox { root } => Some(Box::new(Combobox::new(control.node, root))),
        WidgetKind::NativeText | WidgetKind::NativeTextarea => None,
    }
}

fn selection_matches(shown: &str, wanted: &str) -> bool {
    let shown = shown.trim().to_lowercase();
    let wanted = wanted.trim().to_lowercase();
    !shown.is_empty() && (shown == wanted || shown.contains(&wanted))
}

// ============================================================================
// Native <select>
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct NativeSelect {
    select: NodeId,
}

impl NativeSelect {
    pub fn new(select: NodeId) -> Self {
        NativeSelect { select }
    }

    fn options(&self, doc: &dyn Document) -> Vec<NodeId> {
        match OPTION_TAG.as_ref() {
            Some(sel) => doc.query_within(self.select, sel),
            None => Vec::new(),
        }
    }

    fn option_value(doc: &dyn Document, option: NodeId) -> String {
        doc.attr(option, "value").unwrap_or_else(|| doc.text(option))
    }

    /// Number of `<option>` elements, placeholders included.
    pub fn option_count(&self, doc: &dyn Document) -> usize {
        self.options(doc).len()
    }

    /// Selection text, or empty while a placeholder is chosen: an option
    /// with a blank value or with prompt text such as "Select...".
    pub fn chosen_text(&self, doc: &dyn Document) -> String {
        let text = self.selection_text(doc);
        if is_usable_option_text(&text) {
            text
        } else {
            String::new()
        }
    }
}

impl ChoiceWidget for NativeSelect {
    fn control(&self) -> NodeId {
        self.select
    }

    fn open(&self, _doc: &mut dyn Document, _pacer: &Pacer<'_>) {}

    fn scrape_options(&self, doc: &dyn Document) -> Vec<CandidateOption> {
        self.options(doc)
            .into_iter()
            .filter_map(|option| {
                let value = Self::option_value(doc, option);
                let text = doc.text(option);
                if value.trim().is_empty() || !is_usable_option_text(&text) {
                    return None;
                }
                Some(CandidateOption {
                    display_text: text,
                    node: option,
                    value,
                })
            })
            .collect()
    }

    fn select(&self, doc: &mut dyn Document, option: &CandidateOption, pacer: &Pacer<'_>) -> bool {
        set_value_safely(doc, self.select, &option.value);
        pacer.after_select();
        doc.value(self.select) == option.value
    }

    fn close(&self, _doc: &mut dyn Document) {}

    fn selection_text(&self, doc: &dyn Document) -> String {
        let current = doc.value(self.select);
        if current.trim().is_empty() {
            return String::new();
        }
        self.options(doc)
            .into_iter()
            .find(|&o| Self::option_value(doc, o) == current)
            .map(|o| doc.text(o))
            .unwrap_or_default()
    }
}

// ============================================================================
// Composite combobox
// ============================================================================

/// Text input with a floating option list and a rendered selection.
#[derive(Debug, Clone, Copy)]
pub struct Combobox {
    input: NodeId,
    root: NodeId,
}

impl Combobox {
    pub fn new(input: NodeId, root: NodeId) -> Self {
        Combobox { input, root }
    }

    fn pointer_click(doc: &mut dyn Document, node: NodeId, pause: impl Fn()) {
        let (x, y) = doc.bounding_box(node).center();
        doc.dispatch(node, DomEvent::PointerDown { x, y });
        pause();
        doc.dispatch(node, DomEvent::PointerUp { x, y });
        pause();
        doc.dispatch(node, DomEvent::Click { x, y });
    }

    /// Listbox the input points at through `aria-controls` / `aria-owns`.
    fn controlled_listbox(&self, doc: &dyn Document) -> Option<NodeId> {
        let id = doc
            .attr(self.input, "aria-controls")
            .or_else(|| doc.attr(self.input, "aria-owns"))?;
        doc.element_by_id(&id)
    }

    /// What the widget shows after a choice. Widgets without a single-value
    /// node echo the choice into the input itself.
    fn shown_text(&self, doc: &dyn Document) -> String {
        let rendered = self.selection_text(doc);
        if rendered.trim().is_empty() {
            doc.value(self.input)
        } else {
            rendered
        }
    }

    fn collect(doc: &dyn Document, nodes: Vec<NodeId>) -> Vec<CandidateOption> {
        let mut seen = Vec::new();
        let mut options = Vec::new();
        for node in nodes {
            if seen.contains(&node) || !doc.is_rendered(node) {
                continue;
            }
            seen.push(node);
            let text = doc.text(node);
            if is_usable_option_text(&text) {
                options.push(CandidateOption {
                    value: text.clone(),
                    display_text: text,
                    node,
                });
            }
        }
        options
    }
}

impl ChoiceWidget for Combobox {
    fn control(&self) -> NodeId {
        self.input
    }

    fn open(&self, doc: &mut dyn Document, pacer: &Pacer<'_>) {
        doc.dispatch(self.input, DomEvent::Focus);
        Self::pointer_click(doc, self.input, || pacer.between_pointer_events());
        pacer.after_open();
    }

    fn scrape_options(&self, doc: &dyn Document) -> Vec<CandidateOption> {
        let scopes: Vec<Option<NodeId>> = match self.controlled_listbox(doc) {
            Some(listbox) => vec![Some(listbox), None],
            None => vec![None],
        };

        for scope in scopes {
            for selector in PARSED_OPTION_SELECTORS.iter() {
                let nodes = match scope {
                    Some(listbox) => doc.query_within(listbox, selector),
                    None => doc.query_all(selector),
                };
                let options = Self::collect(doc, nodes);
                if !options.is_empty() {
                    return options;
                }
            }
        }
        Vec::new()
    }

    fn select(&self, doc: &mut dyn Document, option: &CandidateOption, pacer: &Pacer<'_>) -> bool {
        Self::pointer_click(doc, option.node, || pacer.between_clicks());
        pacer.after_select();
        selection_matches(&self.shown_text(doc), &option.display_text)
    }

    fn fallback_select(&self, doc: &mut dyn Document, text: &str, pacer: &Pacer<'_>) -> bool {
        doc.dispatch(self.input, DomEvent::Focus);
        doc.set_value_untracked(self.input, text);
        doc.dispatch(self.input, DomEvent::Input);
        pacer.after_typing();

        doc.dispatch(self.input, DomEvent::KeyDown(Key::ArrowDown));
        pacer.between_keys();
        doc.dispatch(self.input, DomEvent::KeyDown(Key::Enter));
        pacer.after_select();

        // An unmatched Enter leaves the list open with the typed text in place.
        let still_open = doc.attr(self.input, "aria-expanded").as_deref() == Some("true");
        !still_open && selection_matches(&self.shown_text(doc), text)
    }

    fn close(&self, doc: &mut dyn Document) {
        // A leftover search query would read as an answer on the next pass.
        if !doc.value(self.input).is_empty() {
            doc.set_value_untracked(self.input, "");
            doc.dispatch(self.input, DomEvent::Input);
        }
        doc.dispatch(self.input, DomEvent::KeyDown(Key::Escape));
        doc.dispatch(self.input, DomEvent::Blur);
    }

    /// Only the rendered single-value node counts; typed search text does not.
    fn selection_text(&self, doc: &dyn Document) -> String {
        SINGLE_VALUE
            .as_ref()
            .and_then(|sel| doc.query_first_within(self.root, sel))
            .map(|node| doc.text(node))
            .unwrap_or_default()
    }
}
