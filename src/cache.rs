//! Persistence of condition state across process lifetimes.
//!
//! The registry and gateway only see [`ConditionCache`]. Two implementations
//! ship with the crate:
//!
//! - [`FileConditionCache`]: the default. One JSON file holding every
//!   cached condition, read lazily on first access and rewritten whole on
//!   every save or delete.
//! - [`MemoryConditionCache`]: an in-process store. Clones share the same
//!   entries, so a test (or a host with its own persistence) can keep a
//!   handle and inspect what the gateway wrote.
//!
//! # File layout
//!
//! ```json
//! {
//!   "format_version": 1,
//!   "checksum": "<blake3 of the serialized entries, hex>",
//!   "entries": [
//!     { "condition_name": "ClickCount", "current_value": { "type": "integer", "value": 2 } }
//!   ]
//! }
//! ```
//!
//! A missing file is an empty cache. So is a file that fails to parse, has
//! an unknown format version, or fails its checksum; those cases are logged
//! and the next write replaces the file.

use crate::condition::RatingCondition;
use crate::config::GatewayConfig;
use crate::errors::{GatewayError, GatewayResult};
use crate::types::StateValue;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

/// Current cache file format.
pub const CACHE_FORMAT_VERSION: u32 = 1;

/// One persisted condition state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionCacheEntry {
    pub condition_name: String,
    pub current_value: StateValue,
}

impl ConditionCacheEntry {
    pub fn new(condition_name: impl Into<String>, current_value: StateValue) -> Self {
        Self {
            condition_name: condition_name.into(),
            current_value,
        }
    }
}

/// Storage for condition states, keyed by condition name.
pub trait ConditionCache: Send {
    /// Push a stored value for `condition_name` into `condition`.
    ///
    /// Returns whether a value was found and applied. A missing entry, an
    /// unreadable store or a value of the wrong kind all return `false`.
    fn load(&mut self, condition_name: &str, condition: &mut dyn RatingCondition) -> bool;

    /// Store the condition's current state, replacing any earlier entry.
    fn save(&mut self, condition_name: &str, condition: &dyn RatingCondition) -> GatewayResult<()>;

    /// Remove the entry for `condition_name`. No-op if there is none.
    fn delete(&mut self, condition_name: &str) -> GatewayResult<()>;
}

fn upsert(entries: &mut Vec<ConditionCacheEntry>, entry: ConditionCacheEntry) {
    match entries
        .iter_mut()
        .find(|existing| existing.condition_name == entry.condition_name)
    {
        Some(existing) => *existing = entry,
        None => entries.push(entry),
    }
}

fn apply(
    entries: &[ConditionCacheEntry],
    condition_name: &str,
    condition: &mut dyn RatingCondition,
) -> bool {
    entries
        .iter()
        .find(|entry| entry.condition_name == condition_name)
        .map(|entry| condition.manipulate_with(&entry.current_value))
        .unwrap_or(false)
}

// ═══════════════════════════════════════════════════════════════════
// IN-MEMORY CACHE
// ═══════════════════════════════════════════════════════════════════

/// In-process condition cache. Cloning shares the underlying entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryConditionCache {
    entries: Arc<Mutex<Vec<ConditionCacheEntry>>>,
}

impl MemoryConditionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the cache with existing entries
    pub fn with_entries(entries: impl IntoIterator<Item = ConditionCacheEntry>) -> Self {
        let cache = Self::new();
        {
            let mut guard = cache.lock();
            for entry in entries {
                upsert(&mut guard, entry);
            }
        }
        cache
    }

    /// Snapshot of every stored entry, in insertion order
    pub fn entries(&self) -> Vec<ConditionCacheEntry> {
        self.lock().clone()
    }

    /// Stored value for one condition
    pub fn get(&self, condition_name: &str) -> Option<StateValue> {
        self.lock()
            .iter()
            .find(|entry| entry.condition_name == condition_name)
            .map(|entry| entry.current_value.clone())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ConditionCacheEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ConditionCache for MemoryConditionCache {
    fn load(&mut self, condition_name: &str, condition: &mut dyn RatingCondition) -> bool {
        apply(&self.lock(), condition_name, condition)
    }

    fn save(&mut self, condition_name: &str, condition: &dyn RatingCondition) -> GatewayResult<()> {
        upsert(&mut self.lock(), condition.to_cache_entry(condition_name));
        Ok(())
    }

    fn delete(&mut self, condition_name: &str) -> GatewayResult<()> {
        self.lock()
            .retain(|entry| entry.condition_name != condition_name);
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════
// FILE CACHE
// ═══════════════════════════════════════════════════════════════════

/// On-disk envelope around the entries.
#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    format_version: u32,
    checksum: String,
    entries: Vec<ConditionCacheEntry>,
}

impl CacheFile {
    fn seal(entries: &[ConditionCacheEntry]) -> GatewayResult<Self> {
        Ok(Self {
            format_version: CACHE_FORMAT_VERSION,
            checksum: checksum(entries)?,
            entries: entries.to_vec(),
        })
    }

    fn verify(&self) -> GatewayResult<()> {
        if self.format_version != CACHE_FORMAT_VERSION {
            return Err(GatewayError::corrupt_store(format!(
                "Unsupported cache format version {}",
                self.format_version
            ))
            .with_context("expected", CACHE_FORMAT_VERSION));
        }
        if checksum(&self.entries)? != self.checksum {
            return Err(GatewayError::corrupt_store("Cache checksum mismatch"));
        }
        Ok(())
    }
}

fn checksum(entries: &[ConditionCacheEntry]) -> GatewayResult<String> {
    let bytes = serde_json::to_vec(entries)?;
    Ok(hex::encode(blake3::hash(&bytes).as_bytes()))
}

/// JSON-file-backed condition cache.
#[derive(Debug)]
pub struct FileConditionCache {
    path: PathBuf,
    /// `None` until first access.
    entries: Option<Vec<ConditionCacheEntry>>,
}

impl FileConditionCache {
    /// Cache stored at `path`. Nothing is read until first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: None,
        }
    }

    /// Cache stored where `config` points
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(config.cache_file_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every stored entry, loading the file if needed
    pub fn entries(&mut self) -> &[ConditionCacheEntry] {
        self.loaded()
    }

    fn loaded(&mut self) -> &mut Vec<ConditionCacheEntry> {
        let path = &self.path;
        self.entries.get_or_insert_with(|| match read_cache_file(path) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(
                    "Ignoring unreadable condition cache at {}: {}",
                    path.display(),
                    err
                );
                Vec::new()
            }
        })
    }

    fn flush(&mut self) -> GatewayResult<()> {
        let file = CacheFile::seal(self.loaded())?;
        let data = serde_json::to_vec_pretty(&file)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let staging = self.path.with_extension("json.tmp");
        std::fs::write(&staging, data)
            .and_then(|_| std::fs::rename(&staging, &self.path))
            .map_err(|e| {
                GatewayError::from(e).with_context("path", self.path.display().to_string())
            })?;

        debug!(
            "Wrote {} condition cache entries to {}",
            file.entries.len(),
            self.path.display()
        );
        Ok(())
    }
}

fn read_cache_file(path: &Path) -> GatewayResult<Vec<ConditionCacheEntry>> {
    if !path.exists() {
        debug!("No condition cache at {}, starting empty", path.display());
        return Ok(Vec::new());
    }

    let data = std::fs::read(path)?;
    let file: CacheFile = serde_json::from_slice(&data)
        .map_err(|e| GatewayError::corrupt_store(format!("Cache file does not parse: {}", e)))?;
    file.verify()?;

    debug!(
        "Loaded {} condition cache entries from {}",
        file.entries.len(),
        path.display()
    );
    Ok(file.entries)
}

impl ConditionCache for FileConditionCache {
    fn load(&mut self, condition_name: &str, condition: &mut dyn RatingCondition) -> bool {
        apply(self.loaded(), condition_name, condition)
    }

    fn save(&mut self, condition_name: &str, condition: &dyn RatingCondition) -> GatewayResult<()> {
        upsert(self.loaded(), condition.to_cache_entry(condition_name));
        self.flush()
    }

    fn delete(&mut self, condition_name: &str) -> GatewayResult<()> {
        let entries = self.loaded();
        let before = entries.len();
        entries.retain(|entry| entry.condition_name != condition_name);
        if entries.len() == before {
            return Ok(());
        }
        self.flush()
    }
}
