use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::agent::error::FillError;

pub type Record = Map<String, Value>;

/// Key-value persistence shared by profile, memory, and run counters.
///
/// `get(None)` returns everything; `set` merges the given keys into what is
/// already stored.
pub trait KeyValueStore {
    fn get(&self, keys: Option<&[&str]>) -> Result<Record, FillError>;
    fn set(&mut self, record: Record) -> Result<(), FillError>;
}

fn select_keys(all: &Record, keys: Option<&[&str]>) -> Record {
    match keys {
        None => all.clone(),
        Some(keys) => keys
            .iter()
            .filter_map(|k| all.get(*k).map(|v| (k.to_string(), v.clone())))
            .collect(),
    }
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct MemoryKv {
    data: Record,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(data: Record) -> Self {
        Self { data }
    }
}

impl KeyValueStore for MemoryKv {
    fn get(&self, keys: Option<&[&str]>) -> Result<Record, FillError> {
        Ok(select_keys(&self.data, keys))
    }

    fn set(&mut self, record: Record) -> Result<(), FillError> {
        self.data.extend(record);
        Ok(())
    }
}

// ============================================================================
// JSON file store
// ============================================================================

/// Whole-file JSON object store. A missing file reads as empty.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Record, FillError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Record::new()),
            Err(e) => {
                return Err(FillError::Storage {
                    path: self.path.display().to_string(),
                    source: e,
                });
            }
        };

        if content.trim().is_empty() {
            return Ok(Record::new());
        }

        serde_json::from_str(&content).map_err(|e| FillError::JsonParse {
            context: format!("store file {}", self.path.display()),
            source: e,
        })
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, keys: Option<&[&str]>) -> Result<Record, FillError> {
        Ok(select_keys(&self.load()?, keys))
    }

    fn set(&mut self, record: Record) -> Result<(), FillError> {
        let mut data = self.load()?;
        data.extend(record);

        let json = serde_json::to_string_pretty(&data).map_err(|e| FillError::JsonSerialize {
            context: format!("store file {}", self.path.display()),
            source: e,
        })?;

        std::fs::write(&self.path, json).map_err(|e| FillError::Storage {
            path: self.path.display().to_string(),
            source: e,
        })
    }
}
