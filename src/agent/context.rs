use serde::{Deserialize, Serialize};

use crate::agent::error::FillError;
use crate::state::memory::{MEMORY_STORE_KEY, MemoryStore};
use crate::state::profile::{AiSettings, CustomParameter, ProfileRecord, custom_parameters};
use crate::state::store::{KeyValueStore, Record};

pub const DEFAULT_CHOICE_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_CHOICE_MAX_TOKENS: u32 = 100;
pub const DEFAULT_TEXT_MODEL: &str = "o3-mini";
pub const DEFAULT_TEXT_MAX_TOKENS: u32 = 2000;

/// Models and token budgets for the two AI strategies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiOptions {
    pub choice_model: String,
    pub choice_max_tokens: u32,
    pub text_model: String,
    pub text_max_tokens: u32,
}

impl Default for AiOptions {
    fn default() -> Self {
        AiOptions {
            choice_model: DEFAULT_CHOICE_MODEL.to_string(),
            choice_max_tokens: DEFAULT_CHOICE_MAX_TOKENS,
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            text_max_tokens: DEFAULT_TEXT_MAX_TOKENS,
        }
    }
}

/// Everything a fill pass reads or learns, passed explicitly.
#[derive(Debug, Clone, Default)]
pub struct FillContext {
    pub profile: ProfileRecord,
    pub custom_params: Vec<CustomParameter>,
    pub memory: MemoryStore,
    pub ai: AiSettings,
}

impl FillContext {
    pub fn new(profile: ProfileRecord) -> Self {
        FillContext {
            profile,
            ..Default::default()
        }
    }

    pub fn with_memory(mut self, memory: MemoryStore) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_custom_params(mut self, params: Vec<CustomParameter>) -> Self {
        self.custom_params = params;
        self
    }

    pub fn with_ai_settings(mut self, ai: AiSettings) -> Self {
        self.ai = ai;
        self
    }

    pub fn from_record(record: &Record) -> Self {
        FillContext {
            profile: ProfileRecord::from_record(record),
            custom_params: custom_parameters(record),
            memory: MemoryStore::from_value(record.get(MEMORY_STORE_KEY)),
            ai: AiSettings::from_record(record),
        }
    }

    pub fn load(store: &dyn KeyValueStore) -> Result<Self, FillError> {
        Ok(Self::from_record(&store.get(None)?))
    }

    pub fn save_memory(&self, store: &mut dyn KeyValueStore) -> Result<(), FillError> {
        let mut record = Record::new();
        record.insert(MEMORY_STORE_KEY.to_string(), self.memory.to_value());
        store.set(record)
    }
}
