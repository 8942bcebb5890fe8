use crate::agent::orchestrator::{FieldOutcome, FieldStatus, FillReport, PlannedField};
use crate::state::profile::RunCounters;

const MAX_VALUE_CHARS: usize = 60;

// ============================================================================
// Console reporter
// ============================================================================

/// Format a fill run for terminal output.
///
/// Produces output like:
/// ```text
/// === Fill Report ===
///
/// ✓ FILLED   Email [email via profile] = "a@b.com"
/// ✗ FAILED   Do you need sponsorship? [ai-dropdown] no option matches 'Maybe'
/// - SKIPPED  Phone (already has a value)
///
/// === Results: 1 filled, 1 failed, 1 skipped, 0 unresolved ===
/// ```
pub fn format_fill_report(report: &FillReport) -> String {
    let mut out = String::from("=== Fill Report ===\n\n");

    for outcome in &report.outcomes {
        out.push_str(&format_outcome(outcome));
        out.push('\n');
    }

    if report.ai_skipped {
        out.push_str("\n[WARN] AI resolution skipped: no completion service configured\n");
    }

    out.push_str(&format!(
        "\n=== Results: {} filled, {} failed, {} skipped, {} unresolved ===\n",
        report.filled_count,
        report.count(FieldStatus::Failed),
        report.count(FieldStatus::Skipped),
        report.count(FieldStatus::Unresolved),
    ));

    out
}

fn format_outcome(outcome: &FieldOutcome) -> String {
    let marker = match outcome.status {
        FieldStatus::Filled => "\u{2713} FILLED ",
        FieldStatus::Failed => "\u{2717} FAILED ",
        FieldStatus::Skipped => "- SKIPPED",
        FieldStatus::Unresolved => "? NONE   ",
    };

    let mut line = format!("{}  {}", marker, display_label(&outcome.label));

    let source = match (&outcome.field, outcome.path) {
        (Some(field), Some(path)) => Some(format!("{} via {}", field, path)),
        (Some(field), None) => Some(field.to_string()),
        (None, Some(path)) => Some(path.to_string()),
        (None, None) => None,
    };
    if let Some(source) = source {
        line.push_str(&format!(" [{}]", source));
    }

    match (&outcome.value, &outcome.detail) {
        (Some(value), _) => line.push_str(&format!(" = {:?}", clip(value))),
        (None, Some(detail)) if outcome.status == FieldStatus::Failed => {
            line.push_str(&format!(" {}", detail))
        }
        (None, Some(detail)) => line.push_str(&format!(" ({})", detail)),
        (None, None) => {}
    }

    line
}

/// Format the classification of every control on a page.
pub fn format_plan(plan: &[PlannedField]) -> String {
    let mut out = format!("=== Controls: {} ===\n\n", plan.len());

    for field in plan {
        let kind = field
            .field
            .as_ref()
            .map(|f| f.to_string())
            .unwrap_or_else(|| "-".to_string());
        let path = if field.has_value {
            "has value".to_string()
        } else {
            field
                .path
                .map(|p| p.to_string())
                .unwrap_or_else(|| "unresolved".to_string())
        };
        out.push_str(&format!(
            "{:<20} {:<18} {:<14} {}\n",
            field.widget,
            kind,
            path,
            display_label(&field.label)
        ));
    }

    out
}

pub fn format_counters(counters: &RunCounters) -> String {
    format!(
        "Fields filled: {}\nPages filled:  {}\n",
        counters.fill_count, counters.page_count
    )
}

fn display_label(label: &str) -> &str {
    if label.is_empty() { "(no label)" } else { label }
}

fn clip(value: &str) -> String {
    if value.chars().count() <= MAX_VALUE_CHARS {
        return value.to_string();
    }
    let head: String = value.chars().take(MAX_VALUE_CHARS).collect();
    format!("{}...", head)
}
