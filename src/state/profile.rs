use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::agent::error::FillError;
use crate::screen::screen_model::SemanticFieldType;
use crate::state::store::{KeyValueStore, Record};

// Storage keys outside the profile fields themselves.
pub const CUSTOM_PARAMS_KEY: &str = "customParams";
pub const API_KEY_KEY: &str = "openaiKey";
pub const USER_NOTES_KEY: &str = "userContext";
pub const RESUME_TEXT_KEY: &str = "cvContent";
pub const FILL_COUNT_KEY: &str = "fillCount";
pub const PAGE_COUNT_KEY: &str = "pageCount";

/// Profile keys that are not form fields but feed the AI profile summary.
pub const WORK_AUTHORIZATION_KEY: &str = "workAuthorization";
pub const NEEDS_VISA_KEY: &str = "needsVisa";

/// User-defined field: controls whose label mentions `label` get the
/// profile value stored under `key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomParameter {
    pub key: String,
    pub label: String,
}

impl CustomParameter {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        CustomParameter {
            key: key.into(),
            label: label.into(),
        }
    }

    pub fn field(&self) -> SemanticFieldType {
        SemanticFieldType::Custom(self.key.clone())
    }
}

// ============================================================================
// ProfileRecord
// ============================================================================

/// Read-only view of the user's stored profile, keyed by storage key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileRecord {
    values: BTreeMap<String, String>,
}

impl ProfileRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scalar values of a stored record; objects and nulls are ignored and
    /// arrays are joined with ", ".
    pub fn from_record(record: &Record) -> Self {
        let values = record
            .iter()
            .filter_map(|(key, value)| scalar_text(value).map(|text| (key.clone(), text)))
            .collect();
        ProfileRecord { values }
    }

    pub fn with(mut self, field: SemanticFieldType, value: impl Into<String>) -> Self {
        self.values.insert(field.key().to_string(), value.into());
        self
    }

    pub fn with_key(mut self, key: &str, value: impl Into<String>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    /// Non-empty value for `field`.
    pub fn get(&self, field: &SemanticFieldType) -> Option<&str> {
        self.get_key(field.key())
    }

    pub fn get_key(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if *b { "Yes" } else { "No" }.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(scalar_text).collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        Value::Null | Value::Object(_) => None,
    }
}

/// Custom parameters stored under `customParams`; malformed entries skipped.
pub fn custom_parameters(record: &Record) -> Vec<CustomParameter> {
    let Some(Value::Array(items)) = record.get(CUSTOM_PARAMS_KEY) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match serde_json::from_value::<CustomParameter>(item.clone()) {
            Ok(param) if !param.key.is_empty() && !param.label.trim().is_empty() => Some(param),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "skipping malformed custom parameter");
                None
            }
        })
        .collect()
}

// ============================================================================
// AI settings
// ============================================================================

/// AI inputs kept alongside the profile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AiSettings {
    pub api_key: Option<String>,
    /// Free-form notes the user wants every answer to consider.
    pub user_notes: Option<String>,
    /// Plain text of the user's résumé.
    pub resume_text: Option<String>,
}

impl AiSettings {
    pub fn from_record(record: &Record) -> Self {
        let text = |key: &str| {
            record
                .get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        AiSettings {
            api_key: text(API_KEY_KEY),
            user_notes: text(USER_NOTES_KEY),
            resume_text: text(RESUME_TEXT_KEY),
        }
    }
}

// ============================================================================
// Run counters
// ============================================================================

/// Running totals across fill runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounters {
    #[serde(rename = "fillCount")]
    pub fill_count: u64,
    #[serde(rename = "pageCount")]
    pub page_count: u64,
}

impl RunCounters {
    pub fn from_record(record: &Record) -> Self {
        let count = |key: &str| record.get(key).and_then(Value::as_u64).unwrap_or(0);
        RunCounters {
            fill_count: count(FILL_COUNT_KEY),
            page_count: count(PAGE_COUNT_KEY),
        }
    }

    pub fn load(store: &dyn KeyValueStore) -> Result<Self, FillError> {
        let record = store.get(Some(&[FILL_COUNT_KEY, PAGE_COUNT_KEY]))?;
        Ok(Self::from_record(&record))
    }

    /// Add one run's fill count; pages only count when something was filled.
    pub fn add_run(&mut self, filled: usize) {
        self.fill_count = self.fill_count.saturating_add(filled as u64);
        if filled > 0 {
            self.page_count = self.page_count.saturating_add(1);
        }
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<(), FillError> {
        let mut record = Record::new();
        record.insert(FILL_COUNT_KEY.to_string(), Value::from(self.fill_count));
        record.insert(PAGE_COUNT_KEY.to_string(), Value::from(self.page_count));
        store.set(record)
    }

    /// Load, add a run, and persist in one step.
    pub fn record_run(store: &mut dyn KeyValueStore, filled: usize) -> Result<Self, FillError> {
        let mut counters = Self::load(store)?;
        counters.add_run(filled);
        counters.save(store)?;
        Ok(counters)
    }
}
