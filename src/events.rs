//! Gateway lifecycle events.
//!
//! Every registration, manipulation, evaluation, prompt and reset is
//! published on a broadcast channel so hosts can observe the gateway
//! without hooking into its internals (analytics, debug overlays, tests).

use crate::types::{StateValue, UniqueId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tokio::sync::broadcast;

/// Unique event identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub UniqueId);

impl EventId {
    pub fn new() -> Self {
        Self(UniqueId::new())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "evt_{}", self.0)
    }
}

/// Event types the gateway emits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum EventType {
    /// Condition added to the registry.
    ConditionRegistered {
        condition_name: String,
        restored_from_cache: bool,
    },

    /// Condition removed from the registry.
    ConditionRemoved {
        condition_name: String,
        purged_from_cache: bool,
    },

    /// Condition state changed during the manipulation phase.
    ConditionManipulated {
        condition_name: String,
        /// True when a caller-supplied parameter was applied.
        explicit: bool,
        current_value: StateValue,
    },

    /// Evaluation phase finished.
    EvaluationCompleted {
        prompted: bool,
        priority_conditions: Vec<String>,
    },

    /// The rating view was asked to open.
    PromptRequested,

    /// Condition reset during the reset phase.
    ConditionReset { condition_name: String },

    /// Every condition was reset on request.
    AllConditionsReset { condition_count: usize },
}

impl EventType {
    /// Snake-case name of the event type
    pub fn name(&self) -> &'static str {
        match self {
            Self::ConditionRegistered { .. } => "condition_registered",
            Self::ConditionRemoved { .. } => "condition_removed",
            Self::ConditionManipulated { .. } => "condition_manipulated",
            Self::EvaluationCompleted { .. } => "evaluation_completed",
            Self::PromptRequested => "prompt_requested",
            Self::ConditionReset { .. } => "condition_reset",
            Self::AllConditionsReset { .. } => "all_conditions_reset",
        }
    }
}

/// Event emitted by a gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayEvent {
    pub id: EventId,

    #[serde(flatten)]
    pub event_type: EventType,

    pub timestamp: DateTime<Utc>,
}

impl GatewayEvent {
    pub fn new(event_type: EventType) -> Self {
        Self {
            id: EventId::new(),
            event_type,
            timestamp: Utc::now(),
        }
    }

    pub fn condition_registered(condition_name: impl Into<String>, restored_from_cache: bool) -> Self {
        Self::new(EventType::ConditionRegistered {
            condition_name: condition_name.into(),
            restored_from_cache,
        })
    }

    pub fn condition_removed(condition_name: impl Into<String>, purged_from_cache: bool) -> Self {
        Self::new(EventType::ConditionRemoved {
            condition_name: condition_name.into(),
            purged_from_cache,
        })
    }

    pub fn condition_manipulated(
        condition_name: impl Into<String>,
        explicit: bool,
        current_value: StateValue,
    ) -> Self {
        Self::new(EventType::ConditionManipulated {
            condition_name: condition_name.into(),
            explicit,
            current_value,
        })
    }

    pub fn evaluation_completed(prompted: bool, priority_conditions: Vec<String>) -> Self {
        Self::new(EventType::EvaluationCompleted {
            prompted,
            priority_conditions,
        })
    }

    pub fn prompt_requested() -> Self {
        Self::new(EventType::PromptRequested)
    }

    pub fn condition_reset(condition_name: impl Into<String>) -> Self {
        Self::new(EventType::ConditionReset {
            condition_name: condition_name.into(),
        })
    }

    pub fn all_conditions_reset(condition_count: usize) -> Self {
        Self::new(EventType::AllConditionsReset { condition_count })
    }
}

/// Event receiver (broadcast channel).
pub type EventReceiver = broadcast::Receiver<GatewayEvent>;

/// Event sender (broadcast channel).
pub type EventSender = broadcast::Sender<GatewayEvent>;

/// Broadcasts events and keeps the most recent ones around.
#[derive(Debug)]
pub struct EventManager {
    sender: EventSender,
    recent: Mutex<Vec<GatewayEvent>>,
    max_recent: usize,
}

impl EventManager {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            recent: Mutex::new(Vec::new()),
            max_recent: 100,
        }
    }

    pub fn emit(&self, event: GatewayEvent) {
        {
            let mut recent = self
                .recent
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            recent.push(event.clone());
            if recent.len() > self.max_recent {
                recent.remove(0);
            }
        }

        // No subscribers is fine.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Most recent events, newest first
    pub fn recent(&self, limit: usize) -> Vec<GatewayEvent> {
        let recent = self
            .recent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        recent.iter().rev().take(limit).cloned().collect()
    }
}

impl Default for EventManager {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_EVENT_CAPACITY)
    }
}
