use std::time::Duration;

use autofill_engine::{
    browser::{
        clock::{Pacer, RecordingClock, Timing},
        document::{Document, DomEvent, Highlight, Key},
        page::HtmlPage,
        selector::Selector,
        setter::set_value_safely,
        widget::{ChoiceWidget, Combobox, NativeSelect, is_usable_option_text},
    },
};
use pretty_assertions::assert_eq;

mod common;
use crate::common::utils::{form_page, node, page};

// =========================================================================
// Selector
// =========================================================================

#[test]
fn selector_matches_tags_classes_and_attributes() {
    let page = form_page(
        r#"<div class="select__menu open"><span id="a" class="select__option" data-kind="x">One</span></div>
           <span id="b" class="other">Two</span>"#,
    );

    let by_class = Selector::parse(".select__menu .select__option").unwrap();
    let hits = page.query_all(&by_class);
    assert_eq!(hits.len(), 1);
    assert_eq!(page.text(hits[0]), "One");

    let contains = Selector::parse("[class*=\"option\"]").unwrap();
    assert_eq!(page.query_all(&contains).len(), 1);

    let grouped = Selector::parse("#a, #b").unwrap();
    assert_eq!(page.query_all(&grouped).len(), 2);

    let prefixed = Selector::parse("span[data-kind^=\"x\"]").unwrap();
    assert_eq!(page.query_all(&prefixed), vec![node(&page, "#a")]);
}

#[test]
fn selector_child_combinator_requires_direct_parent() {
    let page = form_page(r#"<div class="list"><p><span class="item">deep</span></p><span class="item">direct</span></div>"#);
    let child = Selector::parse(".list > span").unwrap();
    let hits = page.query_all(&child);
    assert_eq!(hits.len(), 1);
    assert_eq!(page.text(hits[0]), "direct");
}

#[test]
fn selector_rejects_malformed_input() {
    assert!(Selector::parse("").is_err());
    assert!(Selector::parse("div >").is_err());
    assert!(Selector::parse("..option").is_err());
}

#[test]
fn selector_supports_structural_pseudo_classes() {
    let page = form_page(
        r#"<ul class="menu"><li class="opt">First</li><li class="opt muted">Second</li><li class="opt">Third</li></ul>"#,
    );

    let first = Selector::parse(".menu li:first-child").unwrap();
    let hits = page.query_all(&first);
    assert_eq!(hits.len(), 1);
    assert_eq!(page.text(hits[0]), "First");

    let last = Selector::parse("li:last-child").unwrap();
    assert_eq!(page.text(page.query_all(&last)[0]), "Third");

    let not_muted = Selector::parse("li.opt:not(.muted)").unwrap();
    assert_eq!(page.query_all(&not_muted).len(), 2);

    let sibling = Selector::parse(".muted + li").unwrap();
    assert_eq!(page.text(page.query_all(&sibling)[0]), "Third");
}

// =========================================================================
// HtmlPage
// =========================================================================

#[test]
fn page_reads_initial_control_values() {
    let page = form_page(
        r#"<input id="t" value="hello">
           <textarea id="ta">  some text </textarea>
           <select id="s"><option value="a">A</option><option value="b" selected>B</option></select>"#,
    );

    assert_eq!(page.value(node(&page, "#t")), "hello");
    assert_eq!(page.value(node(&page, "#ta")), "  some text ");
    assert_eq!(page.value(node(&page, "#s")), "b");
}

#[test]
fn page_rendering_follows_hidden_ancestors() {
    let page = form_page(
        r#"<div hidden><input id="a"></div>
           <div style="display: none"><input id="b"></div>
           <input id="c" type="hidden">
           <input id="d">"#,
    );

    assert!(!page.is_rendered(node(&page, "#a")));
    assert!(!page.is_rendered(node(&page, "#b")));
    assert!(!page.is_rendered(node(&page, "#c")));
    assert!(page.is_rendered(node(&page, "#d")));
}

#[test]
fn page_bounding_box_comes_from_data_rect() {
    let page = form_page(r#"<input id="a" data-rect="10,20,100,40"><input id="b">"#);
    assert_eq!(page.bounding_box(node(&page, "#a")).center(), (60.0, 40.0));
    assert_eq!(page.bounding_box(node(&page, "#b")).center(), (0.0, 0.0));
}

#[test]
fn untracked_write_is_not_observed_until_input_fires() {
    let mut page = form_page(r#"<input id="a">"#);
    let input = node(&page, "#a");

    page.set_value(input, "x");
    page.set_value_untracked(input, "y");
    assert_eq!(page.value(input), "y");
    assert_eq!(page.committed_value(input), "x");

    page.dispatch(input, DomEvent::Input);
    assert_eq!(page.committed_value(input), "y");
}

// =========================================================================
// Safe setter
// =========================================================================

#[test]
fn safe_setter_commits_and_fires_events_in_order() {
    let mut page = form_page(r#"<input id="email">"#);
    let input = node(&page, "#email");

    assert!(set_value_safely(&mut page, input, "ada@example.com"));
    assert_eq!(page.value(input), "ada@example.com");
    assert_eq!(page.committed_value(input), "ada@example.com");
    assert_eq!(
        page.events_for(input),
        vec![DomEvent::Input, DomEvent::Change, DomEvent::Blur, DomEvent::Input]
    );
}

#[test]
fn safe_setter_overwrites_a_prefilled_value() {
    let mut page = form_page(r#"<input id="a" value="old">"#);
    let input = node(&page, "#a");

    assert!(set_value_safely(&mut page, input, "new"));
    assert_eq!(page.committed_value(input), "new");
}

#[test]
fn highlight_marks_are_recorded() {
    let mut page = form_page(r#"<input id="a">"#);
    let input = node(&page, "#a");
    assert_eq!(page.highlight_of(input), None);
    page.highlight(input, Highlight::Pending);
    page.highlight(input, Highlight::Filled);
    assert_eq!(page.highlight_of(input), Some(Highlight::Filled));
}

// =========================================================================
// Clock / pacing
// =========================================================================

#[test]
fn pacer_sleeps_through_clock_and_skips_zero_delays() {
    let clock = RecordingClock::new();
    let pacer = Pacer::new(&clock, Timing::default());
    pacer.after_open();
    pacer.after_select();
    assert_eq!(
        clock.sleeps(),
        vec![Duration::from_millis(600), Duration::from_millis(300)]
    );

    let quiet = RecordingClock::new();
    let instant = Pacer::new(&quiet, Timing::instant());
    instant.after_open();
    instant.after_typing();
    assert!(quiet.sleeps().is_empty());
}

// =========================================================================
// Widgets
// =========================================================================

#[test]
fn option_text_filter_drops_placeholders_and_noise() {
    assert!(is_usable_option_text("Yes"));
    assert!(!is_usable_option_text("   "));
    assert!(!is_usable_option_text("Select..."));
    assert!(!is_usable_option_text("Select"));
    assert!(!is_usable_option_text(&"x".repeat(250)));
}

#[test]
fn native_select_scrapes_real_options_and_selects() {
    let mut page = page("application_form.html");
    let select = NativeSelect::new(node(&page, "#hear"));
    let clock = RecordingClock::new();
    let pacer = Pacer::new(&clock, Timing::instant());

    assert_eq!(select.option_count(&page), 3);
    assert_eq!(select.chosen_text(&page), "");

    let options = select.scrape_options(&page);
    let texts: Vec<&str> = options.iter().map(|o| o.display_text.as_str()).collect();
    assert_eq!(texts, vec!["LinkedIn", "A friend"]);

    assert!(select.select(&mut page, &options[1], &pacer));
    assert_eq!(page.value(select.control()), "friend");
    assert_eq!(select.selection_text(&page), "A friend");
    assert_eq!(select.chosen_text(&page), "A friend");
}

fn sponsor_widget(page: &HtmlPage) -> Combobox {
    let input = node(page, "#sponsor");
    let root = node(page, ".select__control");
    Combobox::new(input, root)
}

#[test]
fn combobox_opens_on_pointer_click_and_scrapes_listbox() {
    let mut page = page("combobox_form.html");
    let widget = sponsor_widget(&page);
    let clock = RecordingClock::new();
    let pacer = Pacer::new(&clock, Timing::default());

    assert!(widget.scrape_options(&page).is_empty(), "closed menu shows nothing");

    widget.open(&mut page, &pacer);
    assert_eq!(page.attr(widget.control(), "aria-expanded").as_deref(), Some("true"));

    let events = page.events_for(widget.control());
    assert_eq!(events[0], DomEvent::Focus);
    assert_eq!(events[1], DomEvent::PointerDown { x: 110.0, y: 120.0 });
    assert!(matches!(events[3], DomEvent::Click { .. }));

    let texts: Vec<String> = widget
        .scrape_options(&page)
        .into_iter()
        .map(|o| o.display_text)
        .collect();
    assert_eq!(texts, vec!["Yes", "No"]);
    assert_eq!(clock.total(), Duration::from_millis(100 + 100 + 600));
}

#[test]
fn combobox_click_selection_shows_in_rendered_value() {
    let mut page = page("combobox_form.html");
    let widget = sponsor_widget(&page);
    let clock = RecordingClock::new();
    let pacer = Pacer::new(&clock, Timing::instant());

    assert_eq!(widget.selection_text(&page), "");
    widget.open(&mut page, &pacer);
    let options = widget.scrape_options(&page);

    assert!(widget.select(&mut page, &options[1], &pacer));
    assert_eq!(widget.selection_text(&page), "No");
    assert_eq!(page.attr(widget.control(), "aria-expanded").as_deref(), Some("false"));
}

#[test]
fn combobox_typing_fallback_confirms_with_keyboard() {
    let mut page = page("combobox_form.html");
    let widget = sponsor_widget(&page);
    let clock = RecordingClock::new();
    let pacer = Pacer::new(&clock, Timing::instant());

    assert!(widget.fallback_select(&mut page, "Ye", &pacer));
    assert_eq!(widget.selection_text(&page), "Yes");
    assert!(
        page.events_for(widget.control())
            .contains(&DomEvent::KeyDown(Key::Enter))
    );
}

#[test]
fn combobox_typing_fallback_fails_without_a_match() {
    let mut page = page("combobox_form.html");
    let widget = sponsor_widget(&page);
    let clock = RecordingClock::new();
    let pacer = Pacer::new(&clock, Timing::instant());

    assert!(!widget.fallback_select(&mut page, "Maybe", &pacer));
    assert_eq!(page.value(widget.control()), "Maybe");
    assert_eq!(widget.selection_text(&page), "", "typed query is not a selection");

    widget.close(&mut page);
    assert_eq!(page.attr(widget.control(), "aria-expanded").as_deref(), Some("false"));
    assert_eq!(page.value(widget.control()), "", "close clears the leftover query");
    assert_eq!(page.focused(), None);
}

#[test]
fn native_select_with_a_real_default_counts_as_chosen() {
    let page = form_page(
        r#"<select id="relocate"><option value="yes">Yes</option><option value="no">No</option></select>
           <select id="visa"><option value="">Choose one</option><option value="h1b">H-1B</option></select>
           <select id="team"><option value="none">Select...</option><option value="infra">Infra</option></select>"#,
    );

    assert_eq!(NativeSelect::new(node(&page, "#relocate")).chosen_text(&page), "Yes");
    assert_eq!(NativeSelect::new(node(&page, "#visa")).chosen_text(&page), "");
    assert_eq!(NativeSelect::new(node(&page, "#team")).chosen_text(&page), "");
}
