use serde::Serialize;

use crate::browser::selector::Selector;

/// Opaque handle to a node of a `Document`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Key {
    ArrowDown,
    Enter,
    Escape,
}

/// Synthetic events the engine dispatches at controls.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DomEvent {
    Input,
    Change,
    Blur,
    Focus,
    PointerDown { x: f32, y: f32 },
    PointerUp { x: f32, y: f32 },
    Click { x: f32, y: f32 },
    KeyDown(Key),
}

/// Transient visual acknowledgement on a control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Highlight {
    Pending,
    Filled,
    Failed,
}

// ============================================================================
// Document trait
// ============================================================================

/// Read-only traversal plus the small set of writes the engine performs:
/// synthetic events, untracked value writes, and highlight marks.
pub trait Document {
    fn title(&self) -> String;

    /// All element nodes matching `selector`, in document order.
    fn query_all(&self, selector: &Selector) -> Vec<NodeId>;

    /// Descendants of `scope` matching `selector`, in document order.
    fn query_within(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId>;

    /// Nearest inclusive ancestor of `node` matching `selector`.
    fn closest(&self, node: NodeId, selector: &Selector) -> Option<NodeId>;

    fn tag(&self, node: NodeId) -> String;

    fn attr(&self, node: NodeId, name: &str) -> Option<String>;

    /// Concatenated text of the node's subtree, whitespace-collapsed.
    fn text(&self, node: NodeId) -> String;

    /// Current value of a form control (empty for non-controls).
    fn value(&self, node: NodeId) -> String;

    /// Whether the node is rendered (no hidden ancestor).
    fn is_rendered(&self, node: NodeId) -> bool;

    fn bounding_box(&self, node: NodeId) -> Rect;

    /// Write a control's value through the native setter, leaving the
    /// framework's change tracker untouched.
    fn set_value_untracked(&mut self, node: NodeId, value: &str);

    /// Reset the framework's last-seen value so the next input event is
    /// observed as a change.
    fn reset_value_tracker(&mut self, node: NodeId);

    fn dispatch(&mut self, node: NodeId, event: DomEvent);

    fn highlight(&mut self, node: NodeId, mark: Highlight);

    fn query_first(&self, selector: &Selector) -> Option<NodeId> {
        self.query_all(selector).into_iter().next()
    }

    fn query_first_within(&self, scope: NodeId, selector: &Selector) -> Option<NodeId> {
        self.query_within(scope, selector).into_iter().next()
    }

    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        let selector = Selector::parse(&format!("[id=\"{}\"]", id.replace('"', ""))).ok()?;
        self.query_first(&selector)
    }
}
