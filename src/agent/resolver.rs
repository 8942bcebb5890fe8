use serde::Serialize;

use crate::agent::context::FillContext;
use crate::browser::document::Document;
use crate::browser::widget::NativeSelect;
use crate::screen::intent::{QuestionSignals, detect_question, textarea_question};
use crate::screen::label::container_text;
use crate::screen::screen_model::{
    DetectedQuestion, FormControl, ResolutionPath, SemanticFieldType, WidgetKind,
};

/// How a control will be, or was not, filled.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "resolution", rename_all = "kebab-case")]
pub enum Resolution {
    /// Known value from the profile or memory, applied right away.
    Value { value: String, path: ResolutionPath },
    /// Dropdown answered by constrained AI choice.
    AiDropdown { question: String },
    /// Free text answered by AI generation.
    AiText { question: DetectedQuestion },
    /// Native select with nothing to choose between.
    TooFewOptions,
    Unresolved,
}

impl Resolution {
    pub fn path(&self) -> Option<ResolutionPath> {
        match self {
            Resolution::Value { path, .. } => Some(*path),
            Resolution::AiDropdown { .. } => Some(ResolutionPath::AiDropdown),
            Resolution::AiText { .. } => Some(ResolutionPath::AiText),
            Resolution::TooFewOptions | Resolution::Unresolved => None,
        }
    }

    pub fn is_ai(&self) -> bool {
        matches!(self, Resolution::AiDropdown { .. } | Resolution::AiText { .. })
    }
}

/// Attribute text used for question detection.
fn question_attributes(control: &FormControl) -> String {
    let t = &control.tokens;
    [&t.name, &t.id, &t.placeholder, &t.aria_label]
        .iter()
        .filter_map(|v| v.as_deref())
        .filter(|v| !v.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Open-ended question a free-text control asks, if any.
///
/// Textareas always have one (cover letter, a detected intent, or
/// miscellaneous). Single-line inputs need room for an answer and a
/// detectable intent.
pub fn free_text_question(
    doc: &dyn Document,
    control: &FormControl,
    label: &str,
) -> Option<DetectedQuestion> {
    let attributes = question_attributes(control);
    let container = container_text(doc, control.node);
    let signals = QuestionSignals {
        attributes: &attributes,
        label,
        container_text: &container,
    };

    match control.kind {
        WidgetKind::NativeTextarea => Some(textarea_question(&signals)),
        WidgetKind::NativeText => {
            let textual = matches!(control.input_type.as_deref(), None | Some("") | Some("text"));
            if textual && control.is_long_form_input() {
                detect_question(&signals)
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Precedence: profile, memory, then AI. Dropdowns only ever go to AI.
pub fn resolve(
    doc: &dyn Document,
    control: &FormControl,
    label: &str,
    field: Option<&SemanticFieldType>,
    ctx: &FillContext,
    ai_enabled: bool,
) -> Resolution {
    if control.is_dropdown() {
        if control.kind == WidgetKind::NativeSelect
            && NativeSelect::new(control.node).option_count(doc) <= 1
        {
            return Resolution::TooFewOptions;
        }
        if ai_enabled {
            return Resolution::AiDropdown {
                question: label.to_string(),
            };
        }
        return Resolution::Unresolved;
    }

    if let Some(value) = field.and_then(|f| ctx.profile.get(f)) {
        return Resolution::Value {
            value: value.to_string(),
            path: ResolutionPath::Profile,
        };
    }

    if !label.trim().is_empty() {
        if let Some(value) = ctx.memory.recall(label) {
            return Resolution::Value {
                value: value.to_string(),
                path: ResolutionPath::Memory,
            };
        }
    }

    if ai_enabled {
        if let Some(question) = free_text_question(doc, control, label) {
            return Resolution::AiText { question };
        }
    }

    Resolution::Unresolved
}
