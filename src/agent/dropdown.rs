use serde::Serialize;
use tracing::{debug, info, warn};

use crate::agent::ai_model::CompletionService;
use crate::agent::prompts::{build_choice_prompt, clean_choice_reply};
use crate::browser::clock::Pacer;
use crate::browser::document::Document;
use crate::browser::widget::{CandidateOption, ChoiceWidget};
use crate::state::profile::ProfileRecord;

// ============================================================================
// States
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChoiceState {
    Idle,
    OptionsOpened,
    OptionsScraped,
    ChoiceRequested,
    ChoiceApplied,
    Failed,
}

impl ChoiceState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChoiceState::ChoiceApplied | ChoiceState::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum ChoiceFailure {
    NoOptions,
    Completion { message: String },
    EmptyReply,
    NoMatchingOption { reply: String },
    NotApplied { option: String },
}

impl std::fmt::Display for ChoiceFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChoiceFailure::NoOptions => write!(f, "no usable options"),
            ChoiceFailure::Completion { message } => write!(f, "completion failed: {}", message),
            ChoiceFailure::EmptyReply => write!(f, "empty completion reply"),
            ChoiceFailure::NoMatchingOption { reply } => write!(f, "no option matches '{}'", reply),
            ChoiceFailure::NotApplied { option } => write!(f, "'{}' did not stick", option),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChoiceTransition {
    pub from: ChoiceState,
    pub to: ChoiceState,
    pub note: String,
}

/// Inspectable record of one dropdown resolution.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChoiceTrace {
    pub transitions: Vec<ChoiceTransition>,
    pub options: Vec<String>,
    pub reply: Option<String>,
    pub selected: Option<String>,
    pub failure: Option<ChoiceFailure>,
}

impl ChoiceTrace {
    pub fn states(&self) -> Vec<ChoiceState> {
        let mut states: Vec<ChoiceState> = self.transitions.iter().map(|t| t.from).take(1).collect();
        states.extend(self.transitions.iter().map(|t| t.to));
        states
    }

    pub fn final_state(&self) -> ChoiceState {
        self.transitions.last().map_or(ChoiceState::Idle, |t| t.to)
    }
}

/// What to ask the completion service.
#[derive(Debug, Clone, Copy)]
pub struct ChoiceRequest<'a> {
    pub question: &'a str,
    pub profile: &'a ProfileRecord,
    pub model: &'a str,
    pub max_tokens: u32,
}

// ============================================================================
// Option matching
// ============================================================================

/// Exact text, then case-insensitive, then containment either way.
pub fn match_option<'o>(reply: &str, options: &'o [CandidateOption]) -> Option<&'o CandidateOption> {
    let reply = reply.trim();
    if reply.is_empty() {
        return None;
    }
    let lower = reply.to_lowercase();

    options
        .iter()
        .find(|o| o.display_text.trim() == reply)
        .or_else(|| {
            options
                .iter()
                .find(|o| o.display_text.trim().to_lowercase() == lower)
        })
        .or_else(|| {
            options.iter().find(|o| {
                let text = o.display_text.trim().to_lowercase();
                !text.is_empty() && (text.contains(&lower) || lower.contains(&text))
            })
        })
}

// ============================================================================
// Machine
// ============================================================================

/// Drives one dropdown from closed to a verified selection or failure.
/// Every transition is recorded; entering `Failed` always closes the widget.
pub struct ChoiceMachine<'w> {
    widget: &'w dyn ChoiceWidget,
    state: ChoiceState,
    options: Vec<CandidateOption>,
    reply: Option<String>,
    trace: ChoiceTrace,
}

impl<'w> ChoiceMachine<'w> {
    pub fn new(widget: &'w dyn ChoiceWidget) -> Self {
        ChoiceMachine {
            widget,
            state: ChoiceState::Idle,
            options: Vec::new(),
            reply: None,
            trace: ChoiceTrace::default(),
        }
    }

    pub fn state(&self) -> ChoiceState {
        self.state
    }

    pub fn options(&self) -> &[CandidateOption] {
        &self.options
    }

    pub fn trace(&self) -> &ChoiceTrace {
        &self.trace
    }

    pub fn into_trace(self) -> ChoiceTrace {
        self.trace
    }

    fn advance(&mut self, to: ChoiceState, note: impl Into<String>) {
        let note = note.into();
        debug!(from = ?self.state, to = ?to, %note, "dropdown transition");
        self.trace.transitions.push(ChoiceTransition {
            from: self.state,
            to,
            note,
        });
        self.state = to;
    }

    fn fail(&mut self, doc: &mut dyn Document, failure: ChoiceFailure) {
        self.widget.close(doc);
        self.advance(ChoiceState::Failed, failure.to_string());
        self.trace.failure = Some(failure);
    }

    /// Idle → OptionsOpened.
    pub fn open(&mut self, doc: &mut dyn Document, pacer: &Pacer<'_>) -> bool {
        if self.state != ChoiceState::Idle {
            return false;
        }
        self.widget.open(doc, pacer);
        self.advance(ChoiceState::OptionsOpened, "opened");
        true
    }

    /// OptionsOpened → OptionsScraped, or Failed when nothing usable shows.
    pub fn scrape(&mut self, doc: &mut dyn Document) -> bool {
        if self.state != ChoiceState::OptionsOpened {
            return false;
        }
        self.options = self.widget.scrape_options(doc);
        self.trace.options = self.options.iter().map(|o| o.display_text.clone()).collect();

        if self.options.is_empty() {
            self.fail(doc, ChoiceFailure::NoOptions);
            return false;
        }
        let note = format!("{} options", self.options.len());
        self.advance(ChoiceState::OptionsScraped, note);
        true
    }

    /// OptionsScraped → ChoiceRequested, or Failed on a transport error or
    /// blank reply.
    pub fn request(
        &mut self,
        doc: &mut dyn Document,
        service: &dyn CompletionService,
        request: &ChoiceRequest<'_>,
    ) -> bool {
        if self.state != ChoiceState::OptionsScraped {
            return false;
        }

        let texts: Vec<String> = self.options.iter().map(|o| o.display_text.clone()).collect();
        let prompt = build_choice_prompt(request.question, &texts, request.profile);

        let raw = match service.complete(&prompt, request.max_tokens, request.model) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(service = service.name(), error = %e, "dropdown completion failed");
                self.fail(
                    doc,
                    ChoiceFailure::Completion {
                        message: e.to_string(),
                    },
                );
                return false;
            }
        };

        let reply = clean_choice_reply(&raw);
        if reply.is_empty() {
            self.fail(doc, ChoiceFailure::EmptyReply);
            return false;
        }

        self.trace.reply = Some(reply.clone());
        self.advance(ChoiceState::ChoiceRequested, format!("reply '{}'", reply));
        self.reply = Some(reply);
        true
    }

    /// ChoiceRequested → ChoiceApplied, or Failed when neither a click nor
    /// the typing fallback produces a verified selection.
    pub fn apply(&mut self, doc: &mut dyn Document, pacer: &Pacer<'_>) -> bool {
        if self.state != ChoiceState::ChoiceRequested {
            return false;
        }
        let reply = self.reply.clone().unwrap_or_default();

        let Some(option) = match_option(&reply, &self.options).cloned() else {
            // Composite widgets may still filter to the reply when typed.
            if self.widget.fallback_select(doc, &reply, pacer) {
                let shown = self.widget.selection_text(doc);
                let shown = if shown.trim().is_empty() { reply.clone() } else { shown };
                self.trace.selected = Some(shown);
                self.advance(ChoiceState::ChoiceApplied, format!("typed '{}'", reply));
                return true;
            }
            self.fail(doc, ChoiceFailure::NoMatchingOption { reply });
            return false;
        };

        if self.widget.select(doc, &option, pacer) {
            self.trace.selected = Some(option.display_text.clone());
            self.advance(
                ChoiceState::ChoiceApplied,
                format!("clicked '{}'", option.display_text),
            );
            return true;
        }

        debug!(option = %option.display_text, "click did not verify, typing instead");
        if self.widget.fallback_select(doc, &option.display_text, pacer) {
            self.trace.selected = Some(option.display_text.clone());
            self.advance(
                ChoiceState::ChoiceApplied,
                format!("typed '{}'", option.display_text),
            );
            return true;
        }

        self.fail(
            doc,
            ChoiceFailure::NotApplied {
                option: option.display_text,
            },
        );
        false
    }
}

/// Result of running the machine to a terminal state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChoiceOutcome {
    pub selected: Option<String>,
    pub trace: ChoiceTrace,
}

impl ChoiceOutcome {
    pub fn is_applied(&self) -> bool {
        self.trace.final_state() == ChoiceState::ChoiceApplied
    }
}

/// Open, scrape, ask, and apply in sequence, stopping at the first failure.
pub fn resolve_choice(
    doc: &mut dyn Document,
    widget: &dyn ChoiceWidget,
    service: &dyn CompletionService,
    request: &ChoiceRequest<'_>,
    pacer: &Pacer<'_>,
) -> ChoiceOutcome {
    let mut machine = ChoiceMachine::new(widget);

    let applied = machine.open(doc, pacer)
        && machine.scrape(doc)
        && machine.request(doc, service, request)
        && machine.apply(doc, pacer);

    let trace = machine.into_trace();
    if applied {
        info!(question = request.question, selected = ?trace.selected, "dropdown filled");
    } else {
        info!(question = request.question, failure = ?trace.failure, "dropdown left unfilled");
    }

    ChoiceOutcome {
        selected: trace.selected.clone(),
        trace,
    }
}
