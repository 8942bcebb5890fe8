use std::cell::RefCell;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::screen::screen_model::{ResolutionPath, SemanticFieldType};

/// What happened to a field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum FieldEventKind {
    /// Queued for an AI answer.
    Pending,
    Filled { value: String },
    Failed { reason: String },
    Skipped { reason: String },
}

/// One resolution event for UI highlighting and run inspection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldEvent {
    pub fingerprint: String,
    pub label: String,
    pub field: Option<SemanticFieldType>,
    pub path: Option<ResolutionPath>,
    pub kind: FieldEventKind,
}

/// Receives field events synchronously as they happen.
pub trait FillObserver {
    fn on_field(&self, event: &FieldEvent);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl FillObserver for NullObserver {
    fn on_field(&self, _event: &FieldEvent) {}
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct CollectingObserver {
    events: RefCell<Vec<FieldEvent>>,
}

impl CollectingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<FieldEvent> {
        self.events.borrow().clone()
    }

    pub fn filled(&self) -> Vec<FieldEvent> {
        self.events
            .borrow()
            .iter()
            .filter(|e| matches!(e.kind, FieldEventKind::Filled { .. }))
            .cloned()
            .collect()
    }
}

impl FillObserver for CollectingObserver {
    fn on_field(&self, event: &FieldEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

// ============================================================================
// Trace line
// ============================================================================

/// A `FieldEvent` as written to the JSONL trace.
#[derive(Debug, Serialize)]
pub struct FieldTraceEvent {
    pub timestamp_ms: u128,
    pub step: u64,
    #[serde(flatten)]
    pub event: FieldEvent,
}

impl FieldTraceEvent {
    pub fn now(step: u64, event: &FieldEvent) -> Self {
        Self {
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or(0),
            step,
            event: event.clone(),
        }
    }
}
