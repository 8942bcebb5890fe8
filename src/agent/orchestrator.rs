use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::agent::ai_model::CompletionService;
use crate::agent::context::{AiOptions, FillContext};
use crate::agent::dropdown::{ChoiceRequest, resolve_choice};
use crate::agent::page_context::PageContext;
use crate::agent::prompts::{AnswerContext, build_answer_prompt};
use crate::agent::resolver::{Resolution, free_text_question, resolve};
use crate::browser::clock::{Clock, Pacer, SystemClock, Timing};
use crate::browser::document::{Document, Highlight};
use crate::browser::setter::set_value_safely;
use crate::browser::widget::choice_widget;
use crate::screen::classifier::classify;
use crate::screen::controls::{enumerate_controls, read_current_value};
use crate::screen::label::resolve_label;
use crate::screen::screen_model::{DetectedQuestion, FormControl, ResolutionPath, SemanticFieldType};
use crate::state::profile::RunCounters;
use crate::state::store::KeyValueStore;
use crate::trace::trace::{FieldEvent, FieldEventKind, FillObserver, NullObserver};

static SYSTEM_CLOCK: SystemClock = SystemClock;
static NULL_OBSERVER: NullObserver = NullObserver;

// ============================================================================
// Work items and results
// ============================================================================

/// A control waiting for an AI answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkItem {
    pub control: FormControl,
    pub label: String,
    pub field: Option<SemanticFieldType>,
    pub path: ResolutionPath,
    pub question: Option<DetectedQuestion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldStatus {
    Filled,
    Failed,
    Skipped,
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldOutcome {
    pub label: String,
    pub fingerprint: String,
    pub widget: &'static str,
    pub field: Option<SemanticFieldType>,
    pub path: Option<ResolutionPath>,
    pub status: FieldStatus,
    pub value: Option<String>,
    pub detail: Option<String>,
}

impl FieldOutcome {
    fn new(control: &FormControl, label: &str, status: FieldStatus) -> Self {
        FieldOutcome {
            label: label.to_string(),
            fingerprint: control.fingerprint.clone(),
            widget: control.kind.name(),
            field: None,
            path: None,
            status,
            value: None,
            detail: None,
        }
    }

    fn with_field(mut self, field: Option<SemanticFieldType>) -> Self {
        self.field = field;
        self
    }

    fn with_path(mut self, path: Option<ResolutionPath>) -> Self {
        self.path = path;
        self
    }

    fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    fn event_kind(&self) -> FieldEventKind {
        let detail = || self.detail.clone().unwrap_or_default();
        match self.status {
            FieldStatus::Filled => FieldEventKind::Filled {
                value: self.value.clone().unwrap_or_default(),
            },
            FieldStatus::Failed => FieldEventKind::Failed { reason: detail() },
            FieldStatus::Skipped | FieldStatus::Unresolved => FieldEventKind::Skipped { reason: detail() },
        }
    }
}

/// Aggregate result of a fill run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FillReport {
    pub filled_count: usize,
    pub filled_labels: Vec<String>,
    pub outcomes: Vec<FieldOutcome>,
    /// AI was requested but no completion service was available.
    pub ai_skipped: bool,
}

impl FillReport {
    fn record(&mut self, outcome: FieldOutcome) {
        if outcome.status == FieldStatus::Filled {
            self.filled_count += 1;
            self.filled_labels.push(outcome.label.clone());
        }
        self.outcomes.push(outcome);
    }

    pub fn count(&self, status: FieldStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }
}

/// Output of the synchronous phase: what was filled already plus the AI
/// queue, dropdowns ahead of free text.
#[derive(Debug, Default)]
pub struct FillPass {
    pub dropdowns: Vec<WorkItem>,
    pub texts: Vec<WorkItem>,
    pub report: FillReport,
}

impl FillPass {
    pub fn pending(&self) -> usize {
        self.dropdowns.len() + self.texts.len()
    }
}

/// Classification of one control without touching the page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedField {
    pub label: String,
    pub widget: &'static str,
    pub field: Option<SemanticFieldType>,
    pub path: Option<ResolutionPath>,
    pub has_value: bool,
}

// ============================================================================
// Orchestrator
// ============================================================================

pub struct Orchestrator<'a> {
    ctx: FillContext,
    completion: Option<&'a dyn CompletionService>,
    ai_options: AiOptions,
    pacer: Pacer<'a>,
    observer: &'a dyn FillObserver,
    store: Option<&'a mut dyn KeyValueStore>,
    page_url: Option<String>,
    // Fingerprints claimed by a pass whose work is not finished yet.
    processed: HashSet<String>,
    ai_warned: bool,
}

impl<'a> Orchestrator<'a> {
    pub fn new(ctx: FillContext) -> Self {
        Orchestrator {
            ctx,
            completion: None,
            ai_options: AiOptions::default(),
            pacer: Pacer::new(&SYSTEM_CLOCK, Timing::default()),
            observer: &NULL_OBSERVER,
            store: None,
            page_url: None,
            processed: HashSet::new(),
            ai_warned: false,
        }
    }

    pub fn with_completion(mut self, service: &'a dyn CompletionService) -> Self {
        self.completion = Some(service);
        self
    }

    pub fn with_ai_options(mut self, options: AiOptions) -> Self {
        self.ai_options = options;
        self
    }

    pub fn with_clock(mut self, clock: &'a dyn Clock, timing: Timing) -> Self {
        self.pacer = Pacer::new(clock, timing);
        self
    }

    pub fn with_observer(mut self, observer: &'a dyn FillObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Persist run counters and learned values here.
    pub fn with_store(mut self, store: &'a mut dyn KeyValueStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_page_url(mut self, url: impl Into<String>) -> Self {
        self.page_url = Some(url.into());
        self
    }

    pub fn context(&self) -> &FillContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut FillContext {
        &mut self.ctx
    }

    pub fn into_context(self) -> FillContext {
        self.ctx
    }

    /// Controls claimed by a pass that has not drained yet.
    pub fn in_flight(&self) -> usize {
        self.processed.len()
    }

    fn ai_available(&mut self, include_ai: bool) -> bool {
        if !include_ai {
            return false;
        }
        if self.completion.is_some() {
            return true;
        }
        if !self.ai_warned {
            warn!("AI resolution skipped: no completion service configured");
            self.ai_warned = true;
        }
        false
    }

    fn finish(&self, doc: &mut dyn Document, control: &FormControl, outcome: FieldOutcome, report: &mut FillReport) {
        match outcome.status {
            FieldStatus::Filled => doc.highlight(control.node, Highlight::Filled),
            FieldStatus::Failed => doc.highlight(control.node, Highlight::Failed),
            FieldStatus::Skipped | FieldStatus::Unresolved => {}
        }
        self.observer.on_field(&FieldEvent {
            fingerprint: outcome.fingerprint.clone(),
            label: outcome.label.clone(),
            field: outcome.field.clone(),
            path: outcome.path,
            kind: outcome.event_kind(),
        });
        report.record(outcome);
    }

    fn mark_pending(&self, doc: &mut dyn Document, item: &WorkItem) {
        doc.highlight(item.control.node, Highlight::Pending);
        self.observer.on_field(&FieldEvent {
            fingerprint: item.control.fingerprint.clone(),
            label: item.label.clone(),
            field: item.field.clone(),
            path: Some(item.path),
            kind: FieldEventKind::Pending,
        });
    }

    // ------------------------------------------------------------------
    // Synchronous phase
    // ------------------------------------------------------------------

    /// Scan, classify, and fill everything known; queue the rest for AI.
    pub fn begin_pass(&mut self, doc: &mut dyn Document, include_ai: bool) -> FillPass {
        let ai_enabled = self.ai_available(include_ai);
        let mut pass = FillPass::default();
        pass.report.ai_skipped = include_ai && !ai_enabled;

        let controls = enumerate_controls(doc);
        debug!(controls = controls.len(), ai_enabled, "starting fill pass");

        for control in controls {
            if self.processed.contains(&control.fingerprint) {
                debug!(fingerprint = %control.fingerprint, "control claimed by an earlier pass");
                continue;
            }

            let label = resolve_label(doc, control.node);
            if control.has_value() {
                let outcome = FieldOutcome::new(&control, &label, FieldStatus::Skipped)
                    .with_detail("already has a value");
                self.finish(doc, &control, outcome, &mut pass.report);
                continue;
            }

            self.processed.insert(control.fingerprint.clone());
            let field = classify(&control.tokens, &label, &self.ctx.custom_params);
            let resolution = resolve(doc, &control, &label, field.as_ref(), &self.ctx, ai_enabled);
            debug!(label = %label, field = ?field, resolution = ?resolution, "resolved control");

            match resolution {
                Resolution::Value { value, path } => {
                    let outcome = if set_value_safely(doc, control.node, &value) {
                        FieldOutcome::new(&control, &label, FieldStatus::Filled).with_value(value)
                    } else {
                        FieldOutcome::new(&control, &label, FieldStatus::Failed)
                            .with_detail("value did not stick")
                    };
                    let outcome = outcome.with_field(field).with_path(Some(path));
                    self.finish(doc, &control, outcome, &mut pass.report);
                    self.processed.remove(&control.fingerprint);
                }
                Resolution::AiDropdown { .. } => {
                    let item = WorkItem {
                        control,
                        label,
                        field,
                        path: ResolutionPath::AiDropdown,
                        question: None,
                    };
                    self.mark_pending(doc, &item);
                    pass.dropdowns.push(item);
                }
                Resolution::AiText { question } => {
                    let item = WorkItem {
                        control,
                        label,
                        field,
                        path: ResolutionPath::AiText,
                        question: Some(question),
                    };
                    self.mark_pending(doc, &item);
                    pass.texts.push(item);
                }
                Resolution::TooFewOptions => {
                    let outcome = FieldOutcome::new(&control, &label, FieldStatus::Skipped)
                        .with_field(field)
                        .with_detail("select has at most one option");
                    self.finish(doc, &control, outcome, &mut pass.report);
                    self.processed.remove(&control.fingerprint);
                }
                Resolution::Unresolved => {
                    let outcome = FieldOutcome::new(&control, &label, FieldStatus::Unresolved)
                        .with_field(field)
                        .with_detail("no value available");
                    self.finish(doc, &control, outcome, &mut pass.report);
                    self.processed.remove(&control.fingerprint);
                }
            }
        }

        info!(
            filled = pass.report.filled_count,
            dropdowns = pass.dropdowns.len(),
            texts = pass.texts.len(),
            "synchronous phase done"
        );
        pass
    }

    // ------------------------------------------------------------------
    // AI phase
    // ------------------------------------------------------------------

    /// Answer queued items one at a time, dropdowns first.
    pub fn drain(&mut self, doc: &mut dyn Document, pass: FillPass) -> FillReport {
        let FillPass {
            dropdowns,
            texts,
            mut report,
        } = pass;

        for item in dropdowns {
            let outcome = self.apply_dropdown(doc, &item);
            self.finish(doc, &item.control, outcome, &mut report);
            self.processed.remove(&item.control.fingerprint);
        }

        if !texts.is_empty() {
            let page = PageContext::extract(doc, self.page_url.as_deref());
            for item in texts {
                let outcome = self.apply_text(doc, &item, &page);
                self.finish(doc, &item.control, outcome, &mut report);
                self.processed.remove(&item.control.fingerprint);
            }
        }

        report
    }

    fn filled_meanwhile(doc: &dyn Document, item: &WorkItem) -> bool {
        let current = read_current_value(doc, item.control.node, item.control.kind);
        !current.trim().is_empty()
    }

    fn apply_dropdown(&self, doc: &mut dyn Document, item: &WorkItem) -> FieldOutcome {
        let base = FieldOutcome::new(&item.control, &item.label, FieldStatus::Failed)
            .with_field(item.field.clone())
            .with_path(Some(item.path));

        if Self::filled_meanwhile(doc, item) {
            return FieldOutcome {
                status: FieldStatus::Skipped,
                ..base
            }
            .with_detail("filled while queued");
        }
        let (Some(service), Some(widget)) = (self.completion, choice_widget(&item.control)) else {
            return base.with_detail("no completion service");
        };

        let request = ChoiceRequest {
            question: &item.label,
            profile: &self.ctx.profile,
            model: &self.ai_options.choice_model,
            max_tokens: self.ai_options.choice_max_tokens,
        };
        let outcome = resolve_choice(doc, widget.as_ref(), service, &request, &self.pacer);

        match (outcome.is_applied(), outcome.selected) {
            (true, Some(selected)) => FieldOutcome {
                status: FieldStatus::Filled,
                ..base
            }
            .with_value(selected),
            _ => {
                let detail = outcome
                    .trace
                    .failure
                    .map(|f| f.to_string())
                    .unwrap_or_else(|| "dropdown not filled".to_string());
                base.with_detail(detail)
            }
        }
    }

    fn apply_text(&self, doc: &mut dyn Document, item: &WorkItem, page: &PageContext) -> FieldOutcome {
        let base = FieldOutcome::new(&item.control, &item.label, FieldStatus::Failed)
            .with_field(item.field.clone())
            .with_path(Some(item.path));

        if Self::filled_meanwhile(doc, item) {
            return FieldOutcome {
                status: FieldStatus::Skipped,
                ..base
            }
            .with_detail("filled while queued");
        }
        let (Some(service), Some(question)) = (self.completion, item.question.as_ref()) else {
            return base.with_detail("no completion service");
        };

        let ctx = AnswerContext {
            page,
            profile: &self.ctx.profile,
            user_notes: self.ctx.ai.user_notes.as_deref(),
            resume_text: self.ctx.ai.resume_text.as_deref(),
        };
        let prompt = build_answer_prompt(question.intent, &question.question, &ctx);

        let answer = match service.complete(
            &prompt,
            self.ai_options.text_max_tokens,
            &self.ai_options.text_model,
        ) {
            Ok(answer) => answer.trim().to_string(),
            Err(e) => {
                warn!(label = %item.label, service = service.name(), error = %e, "answer generation failed");
                return base.with_detail(e.to_string());
            }
        };
        if answer.is_empty() {
            return base.with_detail("empty answer");
        }

        if set_value_safely(doc, item.control.node, &answer) {
            info!(label = %item.label, intent = question.intent.name(), "answer written");
            FieldOutcome {
                status: FieldStatus::Filled,
                ..base
            }
            .with_value(answer)
        } else {
            base.with_detail("value did not stick")
        }
    }

    // ------------------------------------------------------------------
    // Whole runs
    // ------------------------------------------------------------------

    /// One complete pass; the filled count is added to the stored totals.
    pub fn run_fill(&mut self, doc: &mut dyn Document, include_ai: bool) -> FillReport {
        let pass = self.begin_pass(doc, include_ai);
        let report = self.drain(doc, pass);

        if let Some(store) = self.store.as_deref_mut() {
            match RunCounters::record_run(store, report.filled_count) {
                Ok(totals) => debug!(fill_count = totals.fill_count, page_count = totals.page_count, "run counters updated"),
                Err(e) => warn!(error = %e, "could not update run counters"),
            }
        }

        info!(filled = report.filled_count, ai_skipped = report.ai_skipped, "fill run complete");
        report
    }

    /// Remember what the user typed into short free-text controls.
    /// Dropdowns and long-form answers are never learned.
    pub fn learn_from_page(&mut self, doc: &dyn Document) -> usize {
        let mut learned = 0;
        for control in enumerate_controls(doc) {
            if control.is_dropdown() || !control.has_value() {
                continue;
            }
            let label = resolve_label(doc, control.node);
            if label.is_empty() || free_text_question(doc, &control, &label).is_some() {
                continue;
            }
            if self.ctx.memory.remember(&label, control.current_value.trim()) {
                learned += 1;
            }
        }

        if learned > 0 {
            if let Some(store) = self.store.as_deref_mut() {
                if let Err(e) = self.ctx.save_memory(store) {
                    warn!(error = %e, "could not persist learned values");
                }
            }
        }
        info!(learned, "learned values from page");
        learned
    }

    /// Label, kind, type and intended path of every control.
    pub fn plan(&self, doc: &dyn Document) -> Vec<PlannedField> {
        let ai_enabled = self.completion.is_some();
        enumerate_controls(doc)
            .into_iter()
            .map(|control| {
                let label = resolve_label(doc, control.node);
                let field = classify(&control.tokens, &label, &self.ctx.custom_params);
                let path = if control.has_value() {
                    None
                } else {
                    resolve(doc, &control, &label, field.as_ref(), &self.ctx, ai_enabled).path()
                };
                PlannedField {
                    label,
                    widget: control.kind.name(),
                    field,
                    path,
                    has_value: control.has_value(),
                }
            })
            .collect()
    }
}
