use crate::core::models::{CatPayload, RefreshInterval};
use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const CACHE_KEY: &str = "cat_cache";
pub const HISTORY_KEY: &str = "cat_history";
pub const INTERVAL_KEY: &str = "refresh_interval_minutes";

/// Process-wide key-value storage. `set_many` applies all entries or none.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>>;
    fn set_many(&self, entries: Vec<(&str, Value)>) -> Result<()>;
}

/// All keys live in a single JSON object on disk, replaced by rename on
/// every write.
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, Value>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read state file: {}", self.path.display()))?;

        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", self.path.display()))
    }

    fn save(&self, map: &BTreeMap<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(map)?;
        std::fs::write(&tmp, content)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        tracing::debug!(path = ?self.path, "Saved state");
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.load()?.remove(key))
    }

    fn set_many(&self, entries: Vec<(&str, Value)>) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow::anyhow!("state write lock poisoned"))?;

        let mut map = self.load()?;
        for (key, value) in entries {
            map.insert(key.to_string(), value);
        }
        self.save(&map)
    }
}

pub fn read_interval(store: &dyn KeyValueStore, fallback: RefreshInterval) -> RefreshInterval {
    match store.get(INTERVAL_KEY) {
        Ok(Some(value)) => value
            .as_i64()
            .map(RefreshInterval::from_minutes)
            .unwrap_or(fallback),
        Ok(None) => fallback,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read refresh interval, using fallback");
            fallback
        }
    }
}

pub fn save_interval(store: &dyn KeyValueStore, minutes: i64) -> Result<RefreshInterval> {
    let interval = RefreshInterval::from_minutes(minutes);
    store.set_many(vec![(INTERVAL_KEY, Value::from(interval.minutes()))])?;
    tracing::info!(%interval, "Saved refresh interval");
    Ok(interval)
}

/// `None` both when nothing is cached and when the cached value is unreadable.
pub fn read_current(store: &dyn KeyValueStore) -> Result<Option<CatPayload>> {
    let Some(value) = store.get(CACHE_KEY)? else {
        return Ok(None);
    };

    match serde_json::from_value(value) {
        Ok(payload) => Ok(Some(payload)),
        Err(e) => {
            tracing::warn!(error = %e, "Cached cat is malformed, ignoring");
            Ok(None)
        }
    }
}

pub fn read_history(store: &dyn KeyValueStore) -> Result<Vec<CatPayload>> {
    let Some(value) = store.get(HISTORY_KEY)? else {
        return Ok(Vec::new());
    };

    match serde_json::from_value(value) {
        Ok(history) => Ok(history),
        Err(e) => {
            tracing::warn!(error = %e, "Cat history is malformed, starting over");
            Ok(Vec::new())
        }
    }
}
