use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use uuid::Uuid;

/// Slot holding the password-tier expiry (UNIX epoch milliseconds)
pub const PASSWORD_EXPIRY_KEY: &str = "password-expiry";
/// Slot holding the elevated-tier expiry (UNIX epoch milliseconds)
pub const ELEVATED_EXPIRY_KEY: &str = "elevated-expiry";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Session store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session store document is corrupt: {0}")]
    Corrupt(String),

    #[error("Session store unavailable: {0}")]
    Unavailable(String),
}

/// Durable per-session key-value slots
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<i64>, StoreError>;
    fn set(&self, key: &str, value: i64) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Process-local store, mostly for tests and single-node development
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    slots: Mutex<HashMap<String, i64>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<i64>, StoreError> {
        let slots = self
            .slots
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))?;
        Ok(slots.get(key).copied())
    }

    fn set(&self, key: &str, value: i64) -> Result<(), StoreError> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))?;
        slots.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))?;
        slots.remove(key);
        Ok(())
    }
}

/// One JSON document per session: `<dir>/<session-id>.json`
///
/// Values may be stored as numbers or numeric strings; both read back as epoch milliseconds.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn for_session(dir: &Path, session_id: Uuid) -> Self {
        Self::new(dir.join(format!("{}.json", session_id)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Map<String, Value>, StoreError> {
        if !self.path.exists() {
            return Ok(Map::new());
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(StoreError::Corrupt("expected a JSON object".to_string())),
            Err(e) => Err(StoreError::Corrupt(e.to_string())),
        }
    }

    fn save(&self, slots: &Map<String, Value>) -> Result<(), StoreError> {
        if slots.is_empty() {
            if self.path.exists() {
                fs::remove_file(&self.path)?;
            }
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(slots)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Result<Option<i64>, StoreError> {
        let slots = self.load()?;
        match slots.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_i64()
                .map(Some)
                .ok_or_else(|| StoreError::Corrupt(format!("slot '{}' is not an integer", key))),
            Some(Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| StoreError::Corrupt(format!("slot '{}' is not an integer", key))),
            Some(_) => Err(StoreError::Corrupt(format!("slot '{}' has an unexpected type", key))),
        }
    }

    fn set(&self, key: &str, value: i64) -> Result<(), StoreError> {
        let mut slots = self.load()?;
        slots.insert(key.to_string(), Value::from(value));
        self.save(&slots)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut slots = self.load()?;
        if slots.remove(key).is_some() {
            self.save(&slots)?;
        }
        Ok(())
    }
}
