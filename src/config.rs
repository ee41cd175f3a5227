//! Construction-time configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Base name of the default cache file.
pub const DEFAULT_CACHE_NAME: &str = "RatingConditionCache";

/// Default broadcast capacity for gateway events.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Settings the gateway builder derives its defaults from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Directory holding the cache file. Falls back to the current
    /// directory when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_path: Option<PathBuf>,

    /// Cache file name, without extension
    pub cache_name: String,

    /// Persist to disk. When false the default cache is in-memory only
    pub persist: bool,

    /// Capacity of the event broadcast channel
    pub event_capacity: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            data_path: None,
            cache_name: DEFAULT_CACHE_NAME.to_string(),
            persist: true,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl GatewayConfig {
    /// Config persisting under `data_path`
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: Some(data_path.into()),
            ..Default::default()
        }
    }

    /// Config that never touches the file system
    pub fn in_memory() -> Self {
        Self {
            persist: false,
            ..Default::default()
        }
    }

    /// Set the cache file name (without extension)
    pub fn cache_name(mut self, name: impl Into<String>) -> Self {
        self.cache_name = name.into();
        self
    }

    /// Set the event channel capacity
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    /// Get the data directory, falling back to "." if none set
    pub fn primary_path(&self) -> PathBuf {
        self.data_path.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Full path of the cache file
    pub fn cache_file_path(&self) -> PathBuf {
        self.primary_path().join(format!("{}.json", self.cache_name))
    }
}
