use tracing::{info, warn};

use crate::agent::ai_model::{CompletionService, build_completion_service};
use crate::agent::context::FillContext;
use crate::agent::orchestrator::{FillReport, Orchestrator};
use crate::browser::clock::SystemClock;
use crate::browser::page::HtmlPage;
use crate::cli::config::{API_KEY_ENV, AppConfig, resolve_api_key};
use crate::report::console::{format_counters, format_fill_report, format_plan};
use crate::state::memory::MEMORY_STORE_KEY;
use crate::state::profile::RunCounters;
use crate::state::store::{JsonFileStore, KeyValueStore, Record};
use crate::trace::logger::TraceLogger;

/// Settings shared by every subcommand, already merged from CLI and config.
#[derive(Debug, Clone)]
pub struct Settings {
    pub config: AppConfig,
    pub store_path: String,
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub model: Option<String>,
}

fn load_page(path: &str) -> Result<HtmlPage, Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(path)?;
    Ok(HtmlPage::parse(&source))
}

/// Completion backend for this run, or `None` when no credential is available.
fn completion_service(settings: &Settings, ctx: &FillContext) -> Option<Box<dyn CompletionService>> {
    let env_key = std::env::var(API_KEY_ENV).ok();
    let api_key = resolve_api_key(
        settings.api_key.as_deref(),
        settings.config.ai.api_key.as_deref(),
        ctx.ai.api_key.as_deref(),
        env_key.as_deref(),
    );
    let endpoint = settings
        .endpoint
        .as_deref()
        .or(settings.config.ai.endpoint.as_deref());

    match build_completion_service(settings.config.ai.provider, endpoint, api_key.as_deref()) {
        Ok(service) => Some(service),
        Err(e) => {
            warn!(error = %e, "completion service unavailable");
            None
        }
    }
}

// ============================================================================
// fill subcommand
// ============================================================================

pub fn cmd_fill(
    settings: &Settings,
    html: &str,
    url: Option<&str>,
    no_ai: bool,
    trace: Option<&str>,
    output: Option<&str>,
) -> Result<FillReport, Box<dyn std::error::Error>> {
    let mut store = JsonFileStore::new(&settings.store_path);
    let ctx = FillContext::load(&store)?;
    let mut page = load_page(html)?;

    let service = if no_ai {
        None
    } else {
        completion_service(settings, &ctx)
    };
    let tracer = match trace {
        Some(path) => TraceLogger::new(path),
        None => TraceLogger::disabled(),
    };
    let clock = SystemClock;

    let mut orchestrator = Orchestrator::new(ctx)
        .with_ai_options(settings.config.ai.options(settings.model.as_deref()))
        .with_clock(&clock, settings.config.fill.timing)
        .with_observer(&tracer)
        .with_store(&mut store);
    if let Some(service) = service.as_deref() {
        orchestrator = orchestrator.with_completion(service);
    }
    if let Some(url) = url {
        orchestrator = orchestrator.with_page_url(url);
    }

    info!(html, ai = !no_ai, "filling page");
    let report = orchestrator.run_fill(&mut page, !no_ai);

    print!("{}", format_fill_report(&report));
    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&report)?)?;
    }

    Ok(report)
}

// ============================================================================
// classify subcommand
// ============================================================================

pub fn cmd_classify(settings: &Settings, html: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = JsonFileStore::new(&settings.store_path);
    let ctx = FillContext::load(&store)?;
    let page = load_page(html)?;

    let service = completion_service(settings, &ctx);
    let mut orchestrator = Orchestrator::new(ctx);
    if let Some(service) = service.as_deref() {
        orchestrator = orchestrator.with_completion(service);
    }

    print!("{}", format_plan(&orchestrator.plan(&page)));
    Ok(())
}

// ============================================================================
// learn / remember / recall subcommands
// ============================================================================

pub fn cmd_learn(settings: &Settings, html: &str) -> Result<usize, Box<dyn std::error::Error>> {
    let mut store = JsonFileStore::new(&settings.store_path);
    let ctx = FillContext::load(&store)?;
    let page = load_page(html)?;

    let learned = Orchestrator::new(ctx).with_store(&mut store).learn_from_page(&page);
    println!("Learned {} values", learned);
    Ok(learned)
}

pub fn cmd_remember(settings: &Settings, label: &str, value: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = JsonFileStore::new(&settings.store_path);
    let mut ctx = FillContext::load(&store)?;

    if ctx.memory.remember(label, value) {
        ctx.save_memory(&mut store)?;
        println!("Remembered answer for \"{}\"", label);
    } else {
        println!("Nothing remembered: label or value too short");
    }
    Ok(())
}

/// Print the stored answer; returns whether one was found.
pub fn cmd_recall(settings: &Settings, label: &str) -> Result<bool, Box<dyn std::error::Error>> {
    let store = JsonFileStore::new(&settings.store_path);
    let ctx = FillContext::load(&store)?;

    match ctx.memory.recall(label) {
        Some(value) => {
            println!("{}", value);
            Ok(true)
        }
        None => {
            eprintln!("No stored answer for \"{}\"", label);
            Ok(false)
        }
    }
}

// ============================================================================
// stats subcommand
// ============================================================================

pub fn cmd_stats(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let store = JsonFileStore::new(&settings.store_path);
    let counters = RunCounters::load(&store)?;
    let record: Record = store.get(Some(&[MEMORY_STORE_KEY]))?;
    let ctx = FillContext::from_record(&record);

    print!("{}", format_counters(&counters));
    println!("Learned answers: {}", ctx.memory.len());
    Ok(())
}
