use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::agent::ai_model::Provider;
use crate::agent::context::{
    AiOptions, DEFAULT_CHOICE_MAX_TOKENS, DEFAULT_CHOICE_MODEL, DEFAULT_TEXT_MAX_TOKENS,
    DEFAULT_TEXT_MODEL,
};
use crate::browser::clock::Timing;

pub const DEFAULT_CONFIG_PATH: &str = "autofill.yaml";
pub const DEFAULT_STORE_PATH: &str = "autofill-store.json";
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "autofill",
    version,
    about = "Fill job-application forms from a stored profile, learned answers, and AI"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: autofill.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Path to the JSON store holding profile, memory and counters
    #[arg(long, global = true)]
    pub store: Option<String>,

    /// Completion service API key
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Completion service endpoint
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Model used for both dropdown choices and written answers
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Completion provider: openai or ollama
    #[arg(long, global = true)]
    pub provider: Option<Provider>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fill the form controls of an HTML page
    Fill {
        /// HTML file to fill
        #[arg(long)]
        html: String,

        /// Page URL, used for company-name fallback
        #[arg(long)]
        url: Option<String>,

        /// Only use profile and learned values
        #[arg(long)]
        no_ai: bool,

        /// Append per-field events to this JSONL file
        #[arg(long)]
        trace: Option<String>,

        /// Write the fill report as JSON to this path
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Show how each control on a page would be resolved
    Classify {
        /// HTML file to inspect
        #[arg(long)]
        html: String,
    },

    /// Learn the values already entered on a page
    Learn {
        /// HTML file holding the user's answers
        #[arg(long)]
        html: String,
    },

    /// Store an answer for a question label
    Remember {
        #[arg(long)]
        label: String,

        #[arg(long)]
        value: String,
    },

    /// Look up the stored answer for a question label
    Recall {
        #[arg(long)]
        label: String,
    },

    /// Show running fill totals
    Stats,
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `autofill.yaml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub fill: FillConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub provider: Provider,

    pub endpoint: Option<String>,

    pub api_key: Option<String>,

    #[serde(default = "default_choice_model")]
    pub choice_model: String,

    #[serde(default = "default_choice_max_tokens")]
    pub choice_max_tokens: u32,

    #[serde(default = "default_text_model")]
    pub text_model: String,

    #[serde(default = "default_text_max_tokens")]
    pub text_max_tokens: u32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            endpoint: None,
            api_key: None,
            choice_model: default_choice_model(),
            choice_max_tokens: default_choice_max_tokens(),
            text_model: default_text_model(),
            text_max_tokens: default_text_max_tokens(),
        }
    }
}

impl AiConfig {
    /// Models and budgets, with a single `model_override` replacing both models.
    pub fn options(&self, model_override: Option<&str>) -> AiOptions {
        let model = |configured: &str| model_override.unwrap_or(configured).to_string();
        AiOptions {
            choice_model: model(&self.choice_model),
            choice_max_tokens: self.choice_max_tokens,
            text_model: model(&self.text_model),
            text_max_tokens: self.text_max_tokens,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FillConfig {
    #[serde(default)]
    pub timing: Timing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

// Serde default helpers
fn default_choice_model() -> String { DEFAULT_CHOICE_MODEL.to_string() }
fn default_choice_max_tokens() -> u32 { DEFAULT_CHOICE_MAX_TOKENS }
fn default_text_model() -> String { DEFAULT_TEXT_MODEL.to_string() }
fn default_text_max_tokens() -> u32 { DEFAULT_TEXT_MAX_TOKENS }
fn default_store_path() -> String { DEFAULT_STORE_PATH.to_string() }

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or(DEFAULT_CONFIG_PATH);
    match std::fs::read_to_string(config_path) {
        Ok(content) => parse_config(&content),
        Err(_) => AppConfig::default(),
    }
}

pub fn parse_config(content: &str) -> AppConfig {
    match serde_yaml::from_str(content) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "malformed config file, using defaults");
            AppConfig::default()
        }
    }
}

// ============================================================================
// Setting resolution (CLI > config > store > environment)
// ============================================================================

/// First non-blank candidate wins.
pub fn first_setting(candidates: &[Option<&str>]) -> Option<String> {
    candidates
        .iter()
        .flatten()
        .map(|v| v.trim())
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

/// API key from the flag, config file, stored `openaiKey`, then environment.
pub fn resolve_api_key(
    cli: Option<&str>,
    config: Option<&str>,
    stored: Option<&str>,
    env: Option<&str>,
) -> Option<String> {
    first_setting(&[cli, config, stored, env])
}
