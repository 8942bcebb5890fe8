use scraper::{ElementRef, Html, Node};

use crate::browser::document::{Document, DomEvent, Highlight, Key, NodeId, Rect};
use scraper::selector::{CssLocalName, CssString, NonTSPseudoClass, PseudoElement, Simple};
use selectors::OpaqueElement;
use selectors::attr::{AttrSelectorOperation, CaseSensitivity, NamespaceConstraint};
use selectors::bloom::BloomFilter;
use selectors::matching::{ElementSelectorFlags, MatchingContext};
use selectors::parser::SelectorImpl;

use crate::browser::selector::Selector;

// ============================================================================
// HtmlPage: in-memory page model
// ============================================================================
//
// Parses static markup into a mutable arena and simulates the pieces of
// browser behaviour the engine relies on: control values, a framework-style
// value tracker, and ARIA comboboxes whose listbox opens on click, closes on
// Escape, and commits a choice on option click or ArrowDown + Enter.

#[derive(Debug, Clone)]
enum NodeKind {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone, Default)]
struct ControlState {
    value: String,
    // Last value the page's framework observed; input events commit only
    // when the native value differs from it.
    tracker: String,
    committed: String,
}

#[derive(Debug, Clone)]
struct PageNode {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    control: Option<ControlState>,
    highlight: Option<Highlight>,
    active_option: Option<NodeId>,
}

#[derive(Debug, Clone)]
pub struct HtmlPage {
    nodes: Vec<PageNode>,
    events: Vec<(NodeId, DomEvent)>,
    focused: Option<NodeId>,
}

#[derive(Clone, Copy)]
struct PageRef<'a> {
    page: &'a HtmlPage,
    id: NodeId,
}

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

impl<'a> PageRef<'a> {
    fn at(&self, id: NodeId) -> PageRef<'a> {
        PageRef { page: self.page, id }
    }

    fn tag(&self) -> &'a str {
        self.page.element_tag(self.id).unwrap_or("")
    }

    fn attrs(&self) -> &'a [(String, String)] {
        match &self.page.node(self.id).kind {
            NodeKind::Element { attrs, .. } => attrs,
            NodeKind::Text(_) => &[],
        }
    }

    fn element_siblings(&self) -> (Vec<NodeId>, Option<usize>) {
        let Some(parent) = self.page.node(self.id).parent else {
            return (Vec::new(), None);
        };
        let siblings: Vec<NodeId> = self
            .page
            .node(parent)
            .children
            .iter()
            .copied()
            .filter(|&n| self.page.element_tag(n).is_some())
            .collect();
        let position = siblings.iter().position(|&n| n == self.id);
        (siblings, position)
    }
}

impl std::fmt::Debug for PageRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{}> {:?}", self.tag(), self.id)
    }
}

impl selectors::Element for PageRef<'_> {
    type Impl = Simple;

    fn opaque(&self) -> OpaqueElement {
        OpaqueElement::new(self.page.node(self.id))
    }

    fn parent_element(&self) -> Option<Self> {
        self.page
            .node(self.id)
            .parent
            .filter(|&p| self.page.element_tag(p).is_some())
            .map(|p| self.at(p))
    }

    fn parent_node_is_shadow_root(&self) -> bool {
        false
    }

    fn containing_shadow_host(&self) -> Option<Self> {
        None
    }

    fn is_pseudo_element(&self) -> bool {
        false
    }

    fn prev_sibling_element(&self) -> Option<Self> {
        let (siblings, position) = self.element_siblings();
        let index = position?.checked_sub(1)?;
        Some(self.at(siblings[index]))
    }

    fn next_sibling_element(&self) -> Option<Self> {
        let (siblings, position) = self.element_siblings();
        siblings.get(position? + 1).map(|&n| self.at(n))
    }

    fn first_element_child(&self) -> Option<Self> {
        self.page
            .node(self.id)
            .children
            .iter()
            .copied()
            .find(|&n| self.page.element_tag(n).is_some())
            .map(|n| self.at(n))
    }

    fn is_html_element_in_html_document(&self) -> bool {
        true
    }

    fn has_local_name(&self, name: &CssLocalName) -> bool {
        self.tag().eq_ignore_ascii_case(&name.0)
    }

    fn has_namespace(&self, ns: &<Simple as SelectorImpl>::BorrowedNamespaceUrl) -> bool {
        &**ns == HTML_NAMESPACE
    }

    fn is_same_type(&self, other: &Self) -> bool {
        self.tag() == other.tag()
    }

    fn attr_matches(
        &self,
        _ns: &NamespaceConstraint<&<Simple as SelectorImpl>::NamespaceUrl>,
        local_name: &CssLocalName,
        operation: &AttrSelectorOperation<&CssString>,
    ) -> bool {
        self.attrs()
            .iter()
            .any(|(key, value)| key.eq_ignore_ascii_case(&local_name.0) && operation.eval_str(value))
    }

    fn match_non_ts_pseudo_class(
        &self,
        _pc: &NonTSPseudoClass,
        _context: &mut MatchingContext<'_, Simple>,
    ) -> bool {
        false
    }

    fn match_pseudo_element(
        &self,
        _pe: &PseudoElement,
        _context: &mut MatchingContext<'_, Simple>,
    ) -> bool {
        false
    }

    fn apply_selector_flags(&self, _flags: ElementSelectorFlags) {}

    fn is_link(&self) -> bool {
        self.tag() == "a" && self.page.raw_attr(self.id, "href").is_some()
    }

    fn is_html_slot_element(&self) -> bool {
        false
    }

    fn has_id(&self, id: &CssLocalName, case_sensitivity: CaseSensitivity) -> bool {
        self.page
            .raw_attr(self.id, "id")
            .is_some_and(|have| case_sensitivity.eq(id.0.as_bytes(), have.as_bytes()))
    }

    fn has_class(&self, name: &CssLocalName, case_sensitivity: CaseSensitivity) -> bool {
        self.page.raw_attr(self.id, "class").is_some_and(|classes| {
            classes
                .split_whitespace()
                .any(|have| case_sensitivity.eq(name.0.as_bytes(), have.as_bytes()))
        })
    }

    fn has_custom_state(&self, _name: &CssLocalName) -> bool {
        false
    }

    fn imported_part(&self, _name: &CssLocalName) -> Option<CssLocalName> {
        None
    }

    fn is_part(&self, _name: &CssLocalName) -> bool {
        false
    }

    fn is_empty(&self) -> bool {
        !self
            .page
            .node(self.id)
            .children
            .iter()
            .any(|&n| match &self.page.node(n).kind {
                NodeKind::Element { .. } => true,
                NodeKind::Text(t) => !t.is_empty(),
            })
    }

    fn is_root(&self) -> bool {
        self.page.node(self.id).parent.is_none()
    }

    fn add_element_unique_hashes(&self, _filter: &mut BloomFilter) -> bool {
        false
    }
}

impl HtmlPage {
    pub fn parse(source: &str) -> HtmlPage {
        let html = Html::parse_document(source);
        let mut page = HtmlPage {
            nodes: Vec::new(),
            events: Vec::new(),
            focused: None,
        };
        page.import(html.root_element(), None);
        page.init_controls();
        page
    }

    fn import(&mut self, element: ElementRef<'_>, parent: Option<NodeId>) -> NodeId {
        let attrs = element
            .value()
            .attrs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let id = self.push(
            NodeKind::Element {
                tag: element.value().name().to_lowercase(),
                attrs,
            },
            parent,
        );

        for child in element.children() {
            match child.value() {
                Node::Element(_) => {
                    if let Some(child_el) = ElementRef::wrap(child) {
                        self.import(child_el, Some(id));
                    }
                }
                Node::Text(text) => {
                    self.push(NodeKind::Text(String::from(&**text)), Some(id));
                }
                _ => {}
            }
        }
        id
    }

    fn push(&mut self, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(PageNode {
            kind,
            parent,
            children: Vec::new(),
            control: None,
            highlight: None,
            active_option: None,
        });
        if let Some(p) = parent {
            self.nodes[p.0].children.push(id);
        }
        id
    }

    fn init_controls(&mut self) {
        for index in 0..self.nodes.len() {
            let id = NodeId(index);
            let initial = match self.element_tag(id) {
                Some("input") => Some(self.raw_attr(id, "value").unwrap_or("").to_string()),
                Some("textarea") => Some(self.raw_text(id)),
                Some("select") => Some(self.initial_select_value(id)),
                _ => None,
            };
            if let Some(value) = initial {
                self.nodes[index].control = Some(ControlState {
                    tracker: value.clone(),
                    committed: value.clone(),
                    value,
                });
            }
        }
    }

    fn initial_select_value(&self, select: NodeId) -> String {
        let options: Vec<NodeId> = self
            .descendants(select)
            .into_iter()
            .filter(|&n| self.element_tag(n) == Some("option"))
            .collect();
        let chosen = options
            .iter()
            .find(|&&o| self.raw_attr(o, "selected").is_some())
            .or_else(|| options.first());
        chosen.map(|&o| self.option_value(o)).unwrap_or_default()
    }

    /// `value` attribute of an `<option>`, falling back to its text.
    pub fn option_value(&self, option: NodeId) -> String {
        match self.raw_attr(option, "value") {
            Some(v) => v.to_string(),
            None => self.text(option),
        }
    }

    fn node(&self, id: NodeId) -> &PageNode {
        &self.nodes[id.0]
    }

    fn element_tag(&self, id: NodeId) -> Option<&str> {
        match &self.nodes.get(id.0)?.kind {
            NodeKind::Element { tag, .. } => Some(tag.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    fn raw_attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.nodes.get(id.0)?.kind {
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    fn set_attr(&mut self, id: NodeId, name: &str, value: Option<&str>) {
        if let NodeKind::Element { attrs, .. } = &mut self.nodes[id.0].kind {
            attrs.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
            if let Some(v) = value {
                attrs.push((name.to_string(), v.to_string()));
            }
        }
    }

    fn raw_text(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match &self.node(id).kind {
            NodeKind::Text(t) => out.push_str(t),
            NodeKind::Element { tag, .. } => {
                if matches!(tag.as_str(), "script" | "style") {
                    return;
                }
                for &child in &self.node(id).children {
                    self.collect_text(child, out);
                    if self.element_tag(child).is_some() {
                        out.push(' ');
                    }
                }
            }
        }
    }

    fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.node(id).children.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.node(next).children.iter().rev().copied());
        }
        out
    }

    fn matches(&self, id: NodeId, selector: &Selector) -> bool {
        self.element_tag(id).is_some() && selector.matches(&PageRef { page: self, id })
    }

    fn self_hidden(&self, id: NodeId) -> bool {
        if self.raw_attr(id, "hidden").is_some() {
            return true;
        }
        if self.element_tag(id) == Some("input")
            && self
                .raw_attr(id, "type")
                .is_some_and(|t| t.eq_ignore_ascii_case("hidden"))
        {
            return true;
        }
        self.raw_attr(id, "style").is_some_and(|s| {
            let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
            let compact = compact.to_lowercase();
            compact.contains("display:none") || compact.contains("visibility:hidden")
        })
    }

    // ------------------------------------------------------------------
    // Inspection helpers for callers that own the page
    // ------------------------------------------------------------------

    /// First node matching a selector string; `None` on a bad selector.
    pub fn find(&self, selector: &str) -> Option<NodeId> {
        let selector = Selector::parse(selector).ok()?;
        self.query_first(&selector)
    }

    /// Value the page's framework has observed for a control.
    pub fn committed_value(&self, id: NodeId) -> String {
        self.node(id)
            .control
            .as_ref()
            .map(|c| c.committed.clone())
            .unwrap_or_default()
    }

    /// Set a value the way page script would: the tracker follows along.
    pub fn set_value(&mut self, id: NodeId, value: &str) {
        if let Some(control) = self.nodes[id.0].control.as_mut() {
            control.value = value.to_string();
            control.tracker = value.to_string();
            control.committed = value.to_string();
        }
    }

    pub fn highlight_of(&self, id: NodeId) -> Option<Highlight> {
        self.node(id).highlight
    }

    pub fn events_for(&self, id: NodeId) -> Vec<DomEvent> {
        self.events
            .iter()
            .filter(|(n, _)| *n == id)
            .map(|(_, e)| e.clone())
            .collect()
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    // ------------------------------------------------------------------
    // Combobox simulation
    // ------------------------------------------------------------------

    fn listbox_for(&self, combobox: NodeId) -> Option<NodeId> {
        let target = self
            .raw_attr(combobox, "aria-controls")
            .or_else(|| self.raw_attr(combobox, "aria-owns"))?
            .to_string();
        self.element_by_id(&target)
    }

    fn combobox_for_listbox(&self, listbox: NodeId) -> Option<NodeId> {
        let id = self.raw_attr(listbox, "id")?.to_string();
        (0..self.nodes.len()).map(NodeId).find(|&n| {
            self.raw_attr(n, "aria-controls") == Some(id.as_str())
                || self.raw_attr(n, "aria-owns") == Some(id.as_str())
        })
    }

    fn is_combobox(&self, id: NodeId) -> bool {
        self.raw_attr(id, "role") == Some("combobox")
    }

    fn is_option(&self, id: NodeId) -> bool {
        self.raw_attr(id, "role") == Some("option")
            || self
                .raw_attr(id, "class")
                .is_some_and(|c| c.split_whitespace().any(|cls| cls.ends_with("option")))
    }

    fn open_listbox(&mut self, combobox: NodeId) {
        if let Some(listbox) = self.listbox_for(combobox) {
            self.set_attr(listbox, "hidden", None);
            self.set_attr(combobox, "aria-expanded", Some("true"));
        }
    }

    fn close_listbox(&mut self, combobox: NodeId) {
        if let Some(listbox) = self.listbox_for(combobox) {
            self.set_attr(listbox, "hidden", Some(""));
            self.set_attr(combobox, "aria-expanded", Some("false"));
        }
        self.nodes[combobox.0].active_option = None;
    }

    fn rendered_options(&self, listbox: NodeId) -> Vec<NodeId> {
        self.descendants(listbox)
            .into_iter()
            .filter(|&n| self.element_tag(n).is_some() && self.is_option(n) && self.is_rendered(n))
            .collect()
    }

    fn option_listbox(&self, option: NodeId) -> Option<NodeId> {
        let mut current = self.node(option).parent;
        while let Some(id) = current {
            if self.raw_attr(id, "role") == Some("listbox") || self.raw_attr(id, "id").is_some() {
                if self.combobox_for_listbox(id).is_some() {
                    return Some(id);
                }
            }
            current = self.node(id).parent;
        }
        None
    }

    fn choose_option(&mut self, combobox: NodeId, option: NodeId) {
        let text = self.text(option);
        let root = self.widget_root(combobox);

        let display = Selector::parse("[class*=\"single-value\"], [class*=\"placeholder\"]")
            .ok()
            .and_then(|sel| self.query_first_within(root, &sel));

        match display {
            Some(node) => {
                self.nodes[node.0].children.clear();
                self.push(NodeKind::Text(text.clone()), Some(node));
                self.set_attr(node, "class", Some("select__single-value"));
                self.set_value(combobox, "");
            }
            None => self.set_value(combobox, &text),
        }

        self.set_attr(option, "aria-selected", Some("true"));
        self.close_listbox(combobox);
    }

    fn widget_root(&self, combobox: NodeId) -> NodeId {
        Selector::parse(".select__control")
            .ok()
            .and_then(|sel| self.closest(combobox, &sel))
            .or(self.node(combobox).parent)
            .unwrap_or(combobox)
    }

    fn on_click(&mut self, node: NodeId) {
        if self.is_combobox(node) {
            self.open_listbox(node);
            return;
        }
        if self.is_option(node) && self.is_rendered(node) {
            if let Some(combobox) = self
                .option_listbox(node)
                .and_then(|lb| self.combobox_for_listbox(lb))
            {
                self.choose_option(combobox, node);
            }
        }
    }

    fn on_key(&mut self, node: NodeId, key: Key) {
        if !self.is_combobox(node) {
            return;
        }
        match key {
            Key::Escape => self.close_listbox(node),
            Key::ArrowDown => {
                self.open_listbox(node);
                let filter = self
                    .node(node)
                    .control
                    .as_ref()
                    .map(|c| c.value.trim().to_lowercase())
                    .unwrap_or_default();
                let active = self.listbox_for(node).and_then(|lb| {
                    self.rendered_options(lb)
                        .into_iter()
                        .find(|&o| filter.is_empty() || self.text(o).to_lowercase().contains(&filter))
                });
                self.nodes[node.0].active_option = active;
            }
            Key::Enter => {
                if let Some(option) = self.node(node).active_option {
                    self.choose_option(node, option);
                }
            }
        }
    }

    fn on_input(&mut self, node: NodeId) {
        if let Some(control) = self.nodes[node.0].control.as_mut() {
            if control.value != control.tracker {
                control.tracker = control.value.clone();
                control.committed = control.value.clone();
            }
        }
    }
}

impl Document for HtmlPage {
    fn title(&self) -> String {
        self.find("title")
            .map(|t| self.text(t))
            .unwrap_or_default()
    }

    fn query_all(&self, selector: &Selector) -> Vec<NodeId> {
        if self.nodes.is_empty() {
            return Vec::new();
        }
        let root = NodeId(0);
        std::iter::once(root)
            .chain(self.descendants(root))
            .filter(|&n| self.matches(n, selector))
            .collect()
    }

    fn query_within(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|&n| self.matches(n, selector))
            .collect()
    }

    fn closest(&self, node: NodeId, selector: &Selector) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(id) = current {
            if self.matches(id, selector) {
                return Some(id);
            }
            current = self.node(id).parent;
        }
        None
    }

    fn tag(&self, node: NodeId) -> String {
        self.element_tag(node).unwrap_or("").to_string()
    }

    fn attr(&self, node: NodeId, name: &str) -> Option<String> {
        self.raw_attr(node, name).map(str::to_string)
    }

    fn text(&self, node: NodeId) -> String {
        self.raw_text(node)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn value(&self, node: NodeId) -> String {
        self.node(node)
            .control
            .as_ref()
            .map(|c| c.value.clone())
            .unwrap_or_default()
    }

    fn is_rendered(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if self.self_hidden(id) {
                return false;
            }
            current = self.node(id).parent;
        }
        true
    }

    fn bounding_box(&self, node: NodeId) -> Rect {
        let parts: Vec<f32> = self
            .raw_attr(node, "data-rect")
            .unwrap_or("")
            .split(',')
            .filter_map(|p| p.trim().parse().ok())
            .collect();
        match parts.as_slice() {
            [x, y, width, height] => Rect {
                x: *x,
                y: *y,
                width: *width,
                height: *height,
            },
            _ => Rect::default(),
        }
    }

    fn set_value_untracked(&mut self, node: NodeId, value: &str) {
        if let Some(control) = self.nodes[node.0].control.as_mut() {
            control.value = value.to_string();
        }
    }

    fn reset_value_tracker(&mut self, node: NodeId) {
        if let Some(control) = self.nodes[node.0].control.as_mut() {
            control.tracker.clear();
        }
    }

    fn dispatch(&mut self, node: NodeId, event: DomEvent) {
        self.events.push((node, event.clone()));
        match event {
            DomEvent::Input | DomEvent::Change => self.on_input(node),
            DomEvent::Focus => self.focused = Some(node),
            DomEvent::Blur => {
                if self.focused == Some(node) {
                    self.focused = None;
                }
            }
            DomEvent::Click { .. } => self.on_click(node),
            DomEvent::KeyDown(key) => self.on_key(node, key),
            DomEvent::PointerDown { .. } | DomEvent::PointerUp { .. } => {}
        }
    }

    fn highlight(&mut self, node: NodeId, mark: Highlight) {
        self.nodes[node.0].highlight = Some(mark);
    }
}
