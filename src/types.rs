//! Shared types used across the gateway.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a condition takes part in the evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionType {
    /// No special role. Absent requirements and priorities, any met standard
    /// condition is enough to prompt.
    #[default]
    Standard,

    /// Evaluated first. Every prerequisite must be met, but prerequisites are
    /// never enough on their own: a registry holding nothing but
    /// prerequisites never prompts.
    Prerequisite,

    /// Evaluated after prerequisites. Every requirement must be met, and when
    /// nothing is prioritized the requirements alone are enough to prompt.
    Requirement,
}

impl std::fmt::Display for ConditionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Standard => write!(f, "standard"),
            Self::Prerequisite => write!(f, "prerequisite"),
            Self::Requirement => write!(f, "requirement"),
        }
    }
}

/// A condition state with its runtime kind attached.
///
/// Used both as the loosely typed manipulation parameter and as the persisted
/// cache value. Serialized as `{"type": "...", "value": ...}` so the kind
/// survives a save/load round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum StateValue {
    Bool(bool),
    Integer(i64),
    Text(String),
    Timestamp(DateTime<Utc>),
    /// Anything else that serializes to JSON.
    Custom(serde_json::Value),
}

impl StateValue {
    /// Short name of the value kind, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Text(_) => "text",
            Self::Timestamp(_) => "timestamp",
            Self::Custom(_) => "custom",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(t) => Some(*t),
            _ => None,
        }
    }
}

impl std::fmt::Display for StateValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Text(s) => write!(f, "{:?}", s),
            Self::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
            Self::Custom(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for StateValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for StateValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for StateValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<&str> for StateValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for StateValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<DateTime<Utc>> for StateValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl From<serde_json::Value> for StateValue {
    fn from(value: serde_json::Value) -> Self {
        Self::Custom(value)
    }
}

/// Unique identifier (UUID-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UniqueId(pub Uuid);

impl UniqueId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UniqueId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UniqueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_state_value_keeps_kind_through_json() {
        let stamp = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let values = vec![
            StateValue::Bool(true),
            StateValue::Integer(42),
            StateValue::Text("42".into()),
            StateValue::Timestamp(stamp),
            StateValue::Custom(serde_json::json!({"tier": "gold"})),
        ];

        let json = serde_json::to_string(&values).unwrap();
        let recovered: Vec<StateValue> = serde_json::from_str(&json).unwrap();
        assert_eq!(recovered, values);
    }

    #[test]
    fn test_integer_and_text_stay_distinct() {
        let json = serde_json::to_string(&StateValue::Text("7".into())).unwrap();
        assert_eq!(json, r#"{"type":"text","value":"7"}"#);

        let recovered: StateValue = serde_json::from_str(&json).unwrap();
        assert_eq!(recovered.as_integer(), None);
        assert_eq!(recovered.as_text(), Some("7"));
    }

    #[test]
    fn test_conversions() {
        assert_eq!(StateValue::from(3_i32), StateValue::Integer(3));
        assert_eq!(StateValue::from("done").kind(), "text");
        assert_eq!(StateValue::from(false).as_bool(), Some(false));
    }

    #[test]
    fn test_condition_type_default() {
        assert_eq!(ConditionType::default(), ConditionType::Standard);
        assert_eq!(ConditionType::Requirement.to_string(), "requirement");
    }
}
