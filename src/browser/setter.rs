use crate::browser::document::{Document, DomEvent, NodeId};

/// Write `value` into a control so that both the page and any framework
/// state bound to it observe the change.
///
/// Frameworks that cache the last value they saw ignore an input event when
/// the cache already matches; resetting the cache and firing input again
/// forces them to pick the value up. Returns whether the control now holds
/// `value`.
pub fn set_value_safely(doc: &mut dyn Document, node: NodeId, value: &str) -> bool {
    doc.set_value_untracked(node, value);
    doc.dispatch(node, DomEvent::Input);
    doc.dispatch(node, DomEvent::Change);
    doc.dispatch(node, DomEvent::Blur);

    doc.reset_value_tracker(node);
    doc.dispatch(node, DomEvent::Input);

    doc.value(node) == value
}
