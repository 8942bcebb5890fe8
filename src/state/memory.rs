use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::state::normalize::{normalize_label_key, significant_words};

/// Storage key holding learned responses.
pub const MEMORY_STORE_KEY: &str = "learnedResponses";

/// Values shorter than this are never learned.
pub const MIN_VALUE_LEN: usize = 2;

/// One learned label → value pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    #[serde(skip)]
    pub key: String,
    #[serde(rename = "fieldLabel")]
    pub original_label: String,
    pub value: String,
    #[serde(rename = "usageCount", default)]
    pub usage_count: u32,
    #[serde(rename = "learnedAt", default)]
    pub learned_at: u64,
}

/// Label → value cache with exact and fuzzy recall.
///
/// Entries keep insertion order; fuzzy recall returns the first qualifying
/// entry in that order.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Vec<MemoryEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[MemoryEntry] {
        &self.entries
    }

    pub fn get(&self, key: &str) -> Option<&MemoryEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    /// Learn `value` for `label`. Returns `false` when nothing was stored.
    pub fn remember(&mut self, label: &str, value: &str) -> bool {
        self.remember_at(label, value, now_ms())
    }

    pub fn remember_at(&mut self, label: &str, value: &str, learned_at: u64) -> bool {
        if value.trim().chars().count() < MIN_VALUE_LEN {
            return false;
        }

        let key = normalize_label_key(label);
        if key.is_empty() {
            debug!(label, "label normalizes to an empty key, not learning");
            return false;
        }

        match self.entries.iter_mut().find(|e| e.key == key) {
            Some(entry) => {
                entry.value = value.to_string();
                entry.original_label = label.to_string();
                entry.learned_at = learned_at;
                entry.usage_count = entry.usage_count.saturating_add(1);
            }
            None => self.entries.push(MemoryEntry {
                key,
                original_label: label.to_string(),
                value: value.to_string(),
                usage_count: 1,
                learned_at,
            }),
        }
        true
    }

    /// Exact key hit first, then the first entry sharing enough significant
    /// words with `label`.
    pub fn recall(&self, label: &str) -> Option<&str> {
        let key = normalize_label_key(label);
        if !key.is_empty() {
            if let Some(entry) = self.get(&key) {
                return Some(&entry.value);
            }
        }

        let query = significant_words(label);
        if query.is_empty() {
            return None;
        }

        self.entries
            .iter()
            .find(|entry| {
                let stored = significant_words(&entry.original_label);
                let common = query.iter().filter(|w| stored.contains(w)).count();
                common >= 2 || (common == 1 && query.len() <= 2)
            })
            .map(|entry| entry.value.as_str())
    }

    pub fn forget(&mut self, key: &str) -> Option<MemoryEntry> {
        let index = self.entries.iter().position(|e| e.key == key)?;
        Some(self.entries.remove(index))
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Rebuild from the stored `learnedResponses` object. Malformed entries
    /// are skipped.
    pub fn from_value(value: Option<&Value>) -> Self {
        let Some(Value::Object(map)) = value else {
            return Self::default();
        };

        let mut entries: Vec<MemoryEntry> = map
            .iter()
            .filter_map(|(key, raw)| match serde_json::from_value::<MemoryEntry>(raw.clone()) {
                Ok(mut entry) => {
                    entry.key = key.clone();
                    Some(entry)
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "skipping malformed memory entry");
                    None
                }
            })
            .collect();

        // Storage objects carry no order; learning time restores it.
        entries.sort_by(|a, b| a.learned_at.cmp(&b.learned_at).then_with(|| a.key.cmp(&b.key)));
        Self { entries }
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        for entry in &self.entries {
            if let Ok(v) = serde_json::to_value(entry) {
                map.insert(entry.key.clone(), v);
            }
        }
        Value::Object(map)
    }
}

pub(crate) fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
