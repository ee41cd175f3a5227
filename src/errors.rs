//! Error types for the rating gateway.
//!
//! Three failure classes reach callers:
//!
//! 1. **Configuration errors**: duplicate condition names, empty names.
//!    Returned immediately from the registering call.
//!
//! 2. **Storage errors**: a cache write (`save`/`delete`) that could not be
//!    completed. These propagate out of the evaluation cycle.
//!
//! 3. **Serialization errors**: a cache entry that could not be encoded.
//!
//! Unreadable or corrupt cache files are NOT errors: the cache logs them and
//! behaves as if it were empty. Type mismatches during manipulation and
//! unknown priority names are not errors either.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Error returned by registry, cache and gateway operations.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("[{code}] {message}")]
pub struct GatewayError {
    /// Error code (machine-readable)
    pub code: ErrorCode,

    /// Human-readable message
    pub message: String,

    /// Additional context (for debugging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<HashMap<String, serde_json::Value>>,

    /// Can the caller retry or correct the call?
    pub recoverable: bool,
}

impl GatewayError {
    /// Create a new error
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
            recoverable: code.is_typically_recoverable(),
        }
    }

    /// Add context to the error
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        let context = self.context.get_or_insert_with(HashMap::new);
        if let Ok(v) = serde_json::to_value(value) {
            context.insert(key.into(), v);
        }
        self
    }

    /// Set recoverable flag
    pub fn recoverable(mut self, recoverable: bool) -> Self {
        self.recoverable = recoverable;
        self
    }

    /// A condition with this name is already registered.
    pub fn duplicate_key(condition_name: &str) -> Self {
        Self::new(
            ErrorCode::DuplicateKey,
            format!("A condition named '{}' is already registered", condition_name),
        )
        .with_context("condition_name", condition_name)
    }

    /// Invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StorageError, message)
    }

    /// Persisted data could not be trusted
    pub fn corrupt_store(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::CorruptStore, message)
    }

    /// Internal error (bug)
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message).recoverable(false)
    }
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Condition name already registered
    DuplicateKey,

    /// Invalid input provided
    InvalidInput,

    /// Storage error (read/write failed)
    StorageError,

    /// Persisted store failed validation
    CorruptStore,

    /// Value could not be encoded or decoded
    SerializationError,

    /// Internal error (bug)
    Internal,
}

impl ErrorCode {
    /// Check if this error is typically recoverable
    pub fn is_typically_recoverable(&self) -> bool {
        match self {
            Self::Internal => false,
            Self::DuplicateKey | Self::InvalidInput => true, // Can fix input
            Self::StorageError => true,                      // Can retry
            Self::CorruptStore | Self::SerializationError => true,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::DuplicateKey => "DUPLICATE_KEY",
            Self::InvalidInput => "INVALID_INPUT",
            Self::StorageError => "STORAGE_ERROR",
            Self::CorruptStore => "CORRUPT_STORE",
            Self::SerializationError => "SERIALIZATION_ERROR",
            Self::Internal => "INTERNAL",
        };
        write!(f, "{}", s)
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(e: std::io::Error) -> Self {
        GatewayError::new(ErrorCode::StorageError, format!("I/O error: {}", e))
            .with_context("io_error_kind", format!("{:?}", e.kind()))
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        GatewayError::new(ErrorCode::SerializationError, format!("JSON error: {}", e))
    }
}

/// Result type alias for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;
