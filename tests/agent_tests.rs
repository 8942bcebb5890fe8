use std::cell::Cell;

use autofill_engine::{
    agent::{
        ai_model::{CompletionService, MockCompletion, Provider, build_completion_service},
        context::{AiOptions, FillContext},
        dropdown::{ChoiceFailure, ChoiceMachine, ChoiceRequest, ChoiceState, match_option, resolve_choice},
        error::FillError,
        page_context::{PageContext, extract_company, is_job_board},
        prompts::{
            AnswerContext, build_answer_prompt, build_choice_prompt, clean_choice_reply, display_name,
        },
        resolver::{Resolution, resolve},
    },
    browser::{
        clock::{Pacer, RecordingClock, Timing},
        document::{Document, NodeId},
        page::HtmlPage,
        selector::Selector,
        widget::{CandidateOption, ChoiceWidget, Combobox, NativeSelect},
    },
    screen::{
        classifier::classify,
        controls::enumerate_controls,
        label::resolve_label,
        screen_model::{FormControl, QuestionIntent, ResolutionPath, SemanticFieldType},
    },
    state::{memory::MemoryStore, profile::ProfileRecord, store::Record},
};
use pretty_assertions::assert_eq;
use serde_json::json;

mod common;
use crate::common::utils::{ada, form_page, node, page};

fn control_by_id(page: &HtmlPage, id: &str) -> FormControl {
    enumerate_controls(page)
        .into_iter()
        .find(|c| c.tokens.id.as_deref() == Some(id))
        .unwrap_or_else(|| panic!("no control #{}", id))
}

fn resolve_control(page: &HtmlPage, id: &str, ctx: &FillContext, ai: bool) -> Resolution {
    let control = control_by_id(page, id);
    let label = resolve_label(page, control.node);
    let field = classify(&control.tokens, &label, &ctx.custom_params);
    resolve(page, &control, &label, field.as_ref(), ctx, ai)
}

fn options(texts: &[&str]) -> Vec<CandidateOption> {
    texts
        .iter()
        .enumerate()
        .map(|(i, t)| CandidateOption {
            display_text: t.to_string(),
            node: NodeId(i),
            value: t.to_string(),
        })
        .collect()
}

// =========================================================================
// Value resolver
// =========================================================================

#[test]
fn profile_value_wins_over_memory() {
    let page = page("application_form.html");
    let mut memory = MemoryStore::new();
    memory.remember("Email", "old@example.com");
    let ctx = FillContext::new(ada()).with_memory(memory);

    assert_eq!(
        resolve_control(&page, "email", &ctx, false),
        Resolution::Value {
            value: "ada@example.com".into(),
            path: ResolutionPath::Profile,
        }
    );
}

#[test]
fn memory_fills_what_the_profile_lacks() {
    let page = page("application_form.html");
    let mut memory = MemoryStore::new();
    memory.remember("Email", "learned@example.com");
    let ctx = FillContext::default().with_memory(memory);

    assert_eq!(
        resolve_control(&page, "email", &ctx, false),
        Resolution::Value {
            value: "learned@example.com".into(),
            path: ResolutionPath::Memory,
        }
    );
}

#[test]
fn dropdowns_never_resolve_from_profile_or_memory() {
    let page = page("application_form.html");
    let mut memory = MemoryStore::new();
    memory.remember("How did you hear about us?", "LinkedIn");
    let profile = ada().with(SemanticFieldType::HeardAbout, "LinkedIn");
    let ctx = FillContext::new(profile).with_memory(memory);

    assert_eq!(resolve_control(&page, "hear", &ctx, false), Resolution::Unresolved);
    assert_eq!(
        resolve_control(&page, "hear", &ctx, true),
        Resolution::AiDropdown {
            question: "How did you hear about us?".into()
        }
    );

    let combo = self::page("combobox_form.html");
    let mut memory = MemoryStore::new();
    memory.remember("Will you require visa sponsorship?", "No");
    let ctx = FillContext::default().with_memory(memory);
    assert_eq!(resolve_control(&combo, "sponsor", &ctx, false), Resolution::Unresolved);
}

#[test]
fn single_option_selects_are_skipped() {
    let page = page("application_form.html");
    let ctx = FillContext::new(ada());
    assert_eq!(resolve_control(&page, "residency", &ctx, true), Resolution::TooFewOptions);
}

#[test]
fn textareas_route_to_ai_with_detected_intent() {
    let page = page("application_form.html");
    let ctx = FillContext::default();

    match resolve_control(&page, "why", &ctx, true) {
        Resolution::AiText { question } => {
            assert_eq!(question.intent, QuestionIntent::CompanyInterest);
            assert_eq!(question.question, "Why do you want to work here?");
        }
        other => panic!("unexpected resolution {:?}", other),
    }
    assert_eq!(resolve_control(&page, "about", &ctx, false), Resolution::Unresolved);
}

#[test]
fn short_text_inputs_do_not_go_to_ai() {
    let page = form_page(
        r#"<label for="a">Why do you want to join us?</label><input id="a" maxlength="40">
           <label for="b">Why do you want to join us?</label><input id="b" maxlength="400">
           <label for="c">Favourite colour</label><input id="c">"#,
    );
    let ctx = FillContext::default();

    assert_eq!(resolve_control(&page, "a", &ctx, true), Resolution::Unresolved);
    assert!(matches!(resolve_control(&page, "b", &ctx, true), Resolution::AiText { .. }));
    assert_eq!(resolve_control(&page, "c", &ctx, true), Resolution::Unresolved);
}

#[test]
fn custom_parameter_values_fill_matching_controls() {
    let page = form_page(r#"<label for="n">Favourite editor</label><input id="n" name="q_7">"#);
    let data: Record = match json!({
        "customParams": [{"key": "favouriteEditor", "label": "Favourite editor"}],
        "favouriteEditor": "Helix"
    }) {
        serde_json::Value::Object(map) => map,
        _ => unreachable!(),
    };
    let ctx = FillContext::from_record(&data);

    assert_eq!(
        resolve_control(&page, "n", &ctx, false),
        Resolution::Value {
            value: "Helix".into(),
            path: ResolutionPath::Profile,
        }
    );
}

// =========================================================================
// Option matching
// =========================================================================

#[test]
fn option_matching_prefers_exact_then_case_then_containment() {
    let opts = options(&["No", "no preference", "Yes"]);
    assert_eq!(match_option("No", &opts).unwrap().display_text, "No");
    assert_eq!(match_option("yes", &opts).unwrap().display_text, "Yes");
    assert_eq!(match_option("NO PREFERENCE", &opts).unwrap().display_text, "no preference");
    assert_eq!(match_option("Yes, I am", &opts).unwrap().display_text, "Yes");
    assert!(match_option("Maybe", &opts).is_none());
    assert!(match_option("   ", &opts).is_none());
}

#[test]
fn choice_replies_lose_quotes_and_whitespace() {
    assert_eq!(clean_choice_reply("  \"Yes\"\n"), "Yes");
    assert_eq!(clean_choice_reply("'No'"), "No");
    assert_eq!(clean_choice_reply("Remote"), "Remote");
}

// =========================================================================
// Dropdown state machine
// =========================================================================

fn sponsor(page: &HtmlPage) -> Combobox {
    Combobox::new(node(page, "#sponsor"), node(page, ".select__control"))
}

fn request<'a>(question: &'a str, profile: &'a ProfileRecord) -> ChoiceRequest<'a> {
    ChoiceRequest {
        question,
        profile,
        model: "gpt-4o-mini",
        max_tokens: 100,
    }
}

#[test]
fn composite_yes_no_with_lowercase_reply_selects_yes() {
    let mut page = page("combobox_form.html");
    let widget = sponsor(&page);
    let service = MockCompletion::with_replies(["yes"]);
    let clock = RecordingClock::new();
    let pacer = Pacer::new(&clock, Timing::default());
    let profile = ada();

    let outcome = resolve_choice(
        &mut page,
        &widget,
        &service,
        &request("Will you require visa sponsorship?", &profile),
        &pacer,
    );

    assert!(outcome.is_applied());
    assert_eq!(outcome.selected.as_deref(), Some("Yes"));
    assert_eq!(widget.selection_text(&page), "Yes");
    assert_eq!(
        outcome.trace.states(),
        vec![
            ChoiceState::Idle,
            ChoiceState::OptionsOpened,
            ChoiceState::OptionsScraped,
            ChoiceState::ChoiceRequested,
            ChoiceState::ChoiceApplied,
        ]
    );
    assert_eq!(outcome.trace.options, vec!["Yes", "No"]);
    assert!(clock.total().as_millis() >= 600, "settle delays go through the clock");

    let prompt = &service.prompts()[0];
    assert_eq!(prompt.model, "gpt-4o-mini");
    assert_eq!(prompt.max_tokens, 100);
    assert!(prompt.prompt.contains("1. \"Yes\""));
    assert!(prompt.prompt.contains("Will you require visa sponsorship?"));
}

#[test]
fn empty_listbox_fails_and_closes_the_widget() {
    let mut page = page("combobox_form.html");
    let input = node(&page, "#pronouns");
    let root = page
        .closest(input, &Selector::parse(".select__control").unwrap())
        .unwrap();
    let widget = Combobox::new(input, root);
    let service = MockCompletion::new();
    let clock = RecordingClock::new();
    let pacer = Pacer::new(&clock, Timing::instant());
    let profile = ProfileRecord::new();

    let outcome = resolve_choice(&mut page, &widget, &service, &request("Pronouns", &profile), &pacer);

    assert!(!outcome.is_applied());
    assert_eq!(outcome.trace.final_state(), ChoiceState::Failed);
    assert_eq!(outcome.trace.failure, Some(ChoiceFailure::NoOptions));
    assert_eq!(service.call_count(), 0, "no question without options");
    assert_eq!(page.attr(input, "aria-expanded").as_deref(), Some("false"));
}

#[test]
fn transport_failure_fails_the_dropdown() {
    let mut page = page("combobox_form.html");
    let widget = sponsor(&page);
    let service = MockCompletion::new();
    service.push_failure("upstream down");
    let clock = RecordingClock::new();
    let pacer = Pacer::new(&clock, Timing::instant());
    let profile = ProfileRecord::new();

    let outcome = resolve_choice(&mut page, &widget, &service, &request("Sponsorship?", &profile), &pacer);

    assert!(matches!(outcome.trace.failure, Some(ChoiceFailure::Completion { .. })));
    assert_eq!(widget.selection_text(&page), "");
    assert_eq!(page.attr(widget.control(), "aria-expanded").as_deref(), Some("false"));
}

#[test]
fn unmatched_reply_on_native_select_fails() {
    let mut page = page("application_form.html");
    let widget = NativeSelect::new(node(&page, "#hear"));
    let service = MockCompletion::with_replies(["Company website"]);
    let clock = RecordingClock::new();
    let pacer = Pacer::new(&clock, Timing::instant());
    let profile = ProfileRecord::new();

    let outcome = resolve_choice(&mut page, &widget, &service, &request("How did you hear?", &profile), &pacer);

    assert_eq!(
        outcome.trace.failure,
        Some(ChoiceFailure::NoMatchingOption {
            reply: "Company website".into()
        })
    );
    assert_eq!(page.value(widget.control()), "");
}

#[test]
fn native_select_reply_is_applied_by_value() {
    let mut page = page("application_form.html");
    let widget = NativeSelect::new(node(&page, "#hear"));
    let service = MockCompletion::with_replies(["\"LinkedIn\""]);
    let clock = RecordingClock::new();
    let pacer = Pacer::new(&clock, Timing::instant());
    let profile = ProfileRecord::new();

    let outcome = resolve_choice(&mut page, &widget, &service, &request("How did you hear?", &profile), &pacer);

    assert!(outcome.is_applied());
    assert_eq!(page.value(widget.control()), "linkedin");
    assert_eq!(page.committed_value(widget.control()), "linkedin");
}

#[test]
fn machine_refuses_out_of_order_steps() {
    let mut page = page("combobox_form.html");
    let widget = sponsor(&page);
    let mut machine = ChoiceMachine::new(&widget);

    assert!(!machine.scrape(&mut page), "cannot scrape before opening");
    assert_eq!(machine.state(), ChoiceState::Idle);
    assert!(machine.trace().transitions.is_empty());
}

/// Combobox whose option clicks never register, so every choice has to go
/// through the keyboard.
struct ClickIgnoringCombobox {
    inner: Combobox,
    typing_works: bool,
    clicks: Cell<usize>,
}

impl ChoiceWidget for ClickIgnoringCombobox {
    fn control(&self) -> NodeId {
        self.inner.control()
    }

    fn open(&self, doc: &mut dyn Document, pacer: &Pacer<'_>) {
        self.inner.open(doc, pacer);
    }

    fn scrape_options(&self, doc: &dyn Document) -> Vec<CandidateOption> {
        self.inner.scrape_options(doc)
    }

    fn select(&self, _doc: &mut dyn Document, _option: &CandidateOption, _pacer: &Pacer<'_>) -> bool {
        self.clicks.set(self.clicks.get() + 1);
        false
    }

    fn fallback_select(&self, doc: &mut dyn Document, text: &str, pacer: &Pacer<'_>) -> bool {
        self.typing_works && self.inner.fallback_select(doc, text, pacer)
    }

    fn close(&self, doc: &mut dyn Document) {
        self.inner.close(doc);
    }

    fn selection_text(&self, doc: &dyn Document) -> String {
        self.inner.selection_text(doc)
    }
}

fn click_ignoring(page: &HtmlPage, typing_works: bool) -> ClickIgnoringCombobox {
    ClickIgnoringCombobox {
        inner: sponsor(page),
        typing_works,
        clicks: Cell::new(0),
    }
}

#[test]
fn unverified_click_falls_back_to_typing() {
    let mut page = page("combobox_form.html");
    let widget = click_ignoring(&page, true);
    let service = MockCompletion::with_replies(["no"]);
    let clock = RecordingClock::new();
    let pacer = Pacer::new(&clock, Timing::instant());
    let profile = ProfileRecord::new();

    let outcome = resolve_choice(&mut page, &widget, &service, &request("Sponsorship?", &profile), &pacer);

    assert!(outcome.is_applied());
    assert_eq!(widget.clicks.get(), 1);
    assert_eq!(outcome.selected.as_deref(), Some("No"));
    assert_eq!(outcome.trace.final_state(), ChoiceState::ChoiceApplied);
    assert_eq!(outcome.trace.transitions.last().unwrap().note, "typed 'No'");
    assert_eq!(widget.selection_text(&page), "No");
    assert_eq!(page.attr(widget.control(), "aria-expanded").as_deref(), Some("false"));
}

#[test]
fn click_and_typing_both_failing_closes_the_widget() {
    let mut page = page("combobox_form.html");
    let widget = click_ignoring(&page, false);
    let service = MockCompletion::with_replies(["Yes"]);
    let clock = RecordingClock::new();
    let pacer = Pacer::new(&clock, Timing::instant());
    let profile = ProfileRecord::new();

    let outcome = resolve_choice(&mut page, &widget, &service, &request("Sponsorship?", &profile), &pacer);

    assert!(!outcome.is_applied());
    assert_eq!(
        outcome.trace.states(),
        vec![
            ChoiceState::Idle,
            ChoiceState::OptionsOpened,
            ChoiceState::OptionsScraped,
            ChoiceState::ChoiceRequested,
            ChoiceState::Failed,
        ]
    );
    assert_eq!(
        outcome.trace.failure,
        Some(ChoiceFailure::NotApplied {
            option: "Yes".into()
        })
    );
    assert_eq!(widget.selection_text(&page), "");
    assert_eq!(page.value(widget.control()), "");
    assert_eq!(page.attr(widget.control(), "aria-expanded").as_deref(), Some("false"));
}

// =========================================================================
// Prompts
// =========================================================================

#[test]
fn choice_prompt_lists_options_and_candidate() {
    let profile = ada().with_key("workAuthorization", "UK citizen");
    let prompt = build_choice_prompt("Are you authorized to work?", &["Yes".into(), "No".into()], &profile);

    assert!(prompt.contains("Question: \"Are you authorized to work?\""));
    assert!(prompt.contains("1. \"Yes\"\n2. \"No\""));
    assert!(prompt.contains("- Name: Ada Lovelace"));
    assert!(prompt.contains("- Work Authorization: UK citizen"));
    assert!(prompt.contains("- Visa Sponsorship Needed: Not specified"));
}

#[test]
fn display_name_prefers_full_name() {
    assert_eq!(display_name(&ada()), "Ada Lovelace");
    let full = ada().with(SemanticFieldType::FullName, "Augusta Ada King");
    assert_eq!(display_name(&full), "Augusta Ada King");
    assert_eq!(display_name(&ProfileRecord::new()), "Not specified");
}

#[test]
fn answer_prompt_carries_page_profile_and_notes() {
    let page_ctx = PageContext {
        job_title: Some("Senior Rust Engineer".into()),
        company: Some("Acme Robotics".into()),
        job_description: Some("x".repeat(5000)),
        summary: "Page headings: Senior Rust Engineer".into(),
    };
    let profile = ada();
    let ctx = AnswerContext {
        page: &page_ctx,
        profile: &profile,
        user_notes: Some("Prefers remote work"),
        resume_text: None,
    };

    let prompt = build_answer_prompt(QuestionIntent::CompanyInterest, "Why Acme?", &ctx);
    assert!(prompt.contains("Answer the question: \"Why Acme?\""));
    assert!(prompt.contains("- Company: Acme Robotics"));
    assert!(prompt.contains("Prefers remote work"));
    assert!(!prompt.contains("CANDIDATE RESUME"));
    assert!(!prompt.contains(&"x".repeat(2501)), "description is clipped");

    let letter = build_answer_prompt(QuestionIntent::CoverLetter, "", &ctx);
    assert!(letter.contains("cover letter"));
    assert!(letter.contains("\"Senior Rust Engineer\" at \"Acme Robotics\""));
}

// =========================================================================
// Page context
// =========================================================================

#[test]
fn page_context_reads_posting_details() {
    let page = page("application_form.html");
    let ctx = PageContext::extract(&page, None);

    assert_eq!(ctx.job_title.as_deref(), Some("Senior Rust Engineer"));
    assert_eq!(ctx.company.as_deref(), Some("Acme Robotics"));
    assert!(ctx.job_description.unwrap().starts_with("We build warehouse robots"));
    assert!(ctx.summary.contains("Key Requirements: five years of systems programming in Rust."));
}

#[test]
fn company_falls_back_through_title_body_and_host() {
    let titled = HtmlPage::parse("<html><head><title>Engineer at Northwind - Careers</title></head><body></body></html>");
    assert_eq!(extract_company(&titled, None).as_deref(), Some("Northwind"));

    let board = HtmlPage::parse(
        "<html><head><title>Engineer | LinkedIn</title></head><body><p>Come and work at Globex Corp today.</p></body></html>",
    );
    assert_eq!(extract_company(&board, None).as_deref(), Some("Globex Corp"));

    let bare = HtmlPage::parse("<html><head><title>Apply</title></head><body></body></html>");
    assert_eq!(
        extract_company(&bare, Some("https://jobs.initech.com/apply/42")).as_deref(),
        Some("Initech")
    );
    assert_eq!(extract_company(&bare, Some("https://www.greenhouse.io/acme")), None);
}

#[test]
fn job_boards_are_recognized() {
    assert!(is_job_board("LinkedIn Jobs"));
    assert!(is_job_board("Greenhouse"));
    assert!(!is_job_board("Acme Robotics"));
}

// =========================================================================
// Completion backends
// =========================================================================

#[test]
fn mock_completion_replays_script_and_records_prompts() {
    let mock = MockCompletion::with_replies(["first"]);
    assert_eq!(mock.complete("p1", 10, "m").unwrap(), "first");

    let err = mock.complete("p2", 10, "m").unwrap_err();
    assert!(matches!(err, FillError::EmptyCompletion(_)));
    assert!(err.is_transport());
    assert_eq!(mock.call_count(), 2);
    assert_eq!(mock.prompts()[1].prompt, "p2");
}

#[test]
fn openai_backend_requires_a_credential() {
    let err = build_completion_service(Provider::OpenAi, None, Some("  ")).err().unwrap();
    assert!(matches!(err, FillError::MissingCredential { .. }));
    assert!(!err.is_transport());

    assert!(build_completion_service(Provider::OpenAi, None, Some("sk-test")).is_ok());
    assert!(build_completion_service(Provider::Ollama, None, None).is_ok());
}

#[test]
fn providers_parse_case_insensitively() {
    assert_eq!("OpenAI".parse::<Provider>().unwrap(), Provider::OpenAi);
    assert_eq!(" ollama ".parse::<Provider>().unwrap(), Provider::Ollama);
    assert!("gemini".parse::<Provider>().is_err());
}

#[test]
fn default_ai_options_match_documented_budgets() {
    let options = AiOptions::default();
    assert_eq!(options.choice_model, "gpt-4o-mini");
    assert_eq!(options.choice_max_tokens, 100);
    assert_eq!(options.text_model, "o3-mini");
    assert_eq!(options.text_max_tokens, 2000);
}
