//! The condition abstraction.
//!
//! A condition is a named unit of state plus a predicate over that state.
//! The gateway only ever talks to conditions through [`RatingCondition`], so
//! conditions of different state types live side by side in one registry.
//!
//! [`Condition<T>`] is the one concrete implementation: it holds an initial
//! and a current state of type `T`, an evaluator, and optional hooks that
//! decide what implicit manipulation and reset do. The built-in conditions in
//! [`crate::conditions`] are `Condition<T>` values with those hooks filled in.

use crate::cache::ConditionCacheEntry;
use crate::types::{ConditionType, StateValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Behaviour switches every condition carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionFlags {
    /// Reset to the initial state once the condition is met at the end of a
    /// cycle.
    pub reset_after_condition_met: bool,

    /// Only apply the reset above when the cycle actually prompted.
    pub reset_only_on_evaluation_success: bool,

    /// Skip this condition unless the action names it.
    pub explicit_manipulation_only: bool,

    /// Ignore parameterless (implicit) manipulation.
    pub disallow_parameterless_manipulation: bool,

    /// Persist the current state through the condition cache.
    pub cache_current_value: bool,
}

impl Default for ConditionFlags {
    fn default() -> Self {
        Self {
            reset_after_condition_met: true,
            reset_only_on_evaluation_success: true,
            explicit_manipulation_only: false,
            disallow_parameterless_manipulation: false,
            cache_current_value: true,
        }
    }
}

/// The capability set the registry and gateway use.
///
/// Implementors must keep `is_condition_met` free of side effects; the
/// gateway calls it several times per cycle.
pub trait RatingCondition: Send + Sync {
    /// Role of this condition in the evaluation
    fn condition_type(&self) -> ConditionType;

    fn flags(&self) -> &ConditionFlags;

    fn flags_mut(&mut self) -> &mut ConditionFlags;

    /// Run the evaluator against the current state
    fn is_condition_met(&self) -> bool;

    /// Parameterless manipulation. No-op unless the condition defines one.
    fn manipulate(&mut self);

    /// Replace the current state with `value` if it has the right kind.
    /// Returns whether the value was applied; a mismatch is not an error.
    fn manipulate_with(&mut self, value: &StateValue) -> bool;

    /// Return to the initial state (or whatever the condition defines as
    /// its reset state)
    fn reset(&mut self);

    /// Snapshot of the current state
    fn current_value(&self) -> StateValue;

    // ═══════════════════════════════════════════════════════
    // DEFAULT IMPLEMENTATIONS
    // ═══════════════════════════════════════════════════════

    /// Whether the condition participates in persistence
    fn is_cacheable(&self) -> bool {
        self.flags().cache_current_value
    }

    /// Build the persisted record for this condition
    fn to_cache_entry(&self, condition_name: &str) -> ConditionCacheEntry {
        ConditionCacheEntry::new(condition_name, self.current_value())
    }
}

/// A Rust type usable as condition state.
///
/// `from_value` returns `None` when the value is of another kind, which is
/// what makes explicit manipulation silently ignore mismatched parameters.
pub trait ConditionState: Clone + PartialEq + Send + Sync + 'static {
    fn to_value(&self) -> StateValue;

    fn from_value(value: &StateValue) -> Option<Self>;
}

impl ConditionState for bool {
    fn to_value(&self) -> StateValue {
        StateValue::Bool(*self)
    }

    fn from_value(value: &StateValue) -> Option<Self> {
        value.as_bool()
    }
}

impl ConditionState for i64 {
    fn to_value(&self) -> StateValue {
        StateValue::Integer(*self)
    }

    fn from_value(value: &StateValue) -> Option<Self> {
        value.as_integer()
    }
}

impl ConditionState for String {
    fn to_value(&self) -> StateValue {
        StateValue::Text(self.clone())
    }

    fn from_value(value: &StateValue) -> Option<Self> {
        value.as_text().map(str::to_string)
    }
}

impl ConditionState for DateTime<Utc> {
    fn to_value(&self) -> StateValue {
        StateValue::Timestamp(*self)
    }

    fn from_value(value: &StateValue) -> Option<Self> {
        value.as_timestamp()
    }
}

impl ConditionState for serde_json::Value {
    fn to_value(&self) -> StateValue {
        StateValue::Custom(self.clone())
    }

    fn from_value(value: &StateValue) -> Option<Self> {
        match value {
            StateValue::Custom(v) => Some(v.clone()),
            _ => None,
        }
    }
}

/// Predicate over a condition state.
pub type Evaluator<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

/// Computes a new state from an existing one.
pub type StateTransition<T> = Box<dyn Fn(&T) -> T + Send + Sync>;

/// A condition over state of type `T`.
pub struct Condition<T: ConditionState> {
    initial_state: T,
    current_state: T,
    evaluator: Evaluator<T>,
    condition_type: ConditionType,
    flags: ConditionFlags,
    /// Applied on parameterless manipulation; `None` means no-op.
    on_manipulate: Option<StateTransition<T>>,
    /// Computes the reset state from the initial state; `None` means the
    /// initial state itself.
    on_reset: Option<StateTransition<T>>,
}

impl<T: ConditionState> Condition<T> {
    /// Create a standard condition with a custom evaluator.
    pub fn new(initial_state: T, evaluator: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        Self {
            current_state: initial_state.clone(),
            initial_state,
            evaluator: Box::new(evaluator),
            condition_type: ConditionType::Standard,
            flags: ConditionFlags::default(),
            on_manipulate: None,
            on_reset: None,
        }
    }

    /// Set the condition type
    pub fn with_type(mut self, condition_type: ConditionType) -> Self {
        self.condition_type = condition_type;
        self
    }

    /// Define what parameterless manipulation does
    pub fn on_manipulate(mut self, transition: impl Fn(&T) -> T + Send + Sync + 'static) -> Self {
        self.on_manipulate = Some(Box::new(transition));
        self
    }

    /// Define the reset state, computed from the initial state
    pub fn on_reset(mut self, transition: impl Fn(&T) -> T + Send + Sync + 'static) -> Self {
        self.on_reset = Some(Box::new(transition));
        self
    }

    pub fn reset_after_condition_met(mut self, value: bool) -> Self {
        self.flags.reset_after_condition_met = value;
        self
    }

    pub fn reset_only_on_evaluation_success(mut self, value: bool) -> Self {
        self.flags.reset_only_on_evaluation_success = value;
        self
    }

    pub fn explicit_manipulation_only(mut self, value: bool) -> Self {
        self.flags.explicit_manipulation_only = value;
        self
    }

    pub fn disallow_parameterless_manipulation(mut self, value: bool) -> Self {
        self.flags.disallow_parameterless_manipulation = value;
        self
    }

    pub fn cache_current_value(mut self, value: bool) -> Self {
        self.flags.cache_current_value = value;
        self
    }

    pub fn initial_state(&self) -> &T {
        &self.initial_state
    }

    pub fn current_state(&self) -> &T {
        &self.current_state
    }

    /// Replace the current state with a typed value
    pub fn set_state(&mut self, state: T) {
        self.current_state = state;
    }
}

impl<T: ConditionState> RatingCondition for Condition<T> {
    fn condition_type(&self) -> ConditionType {
        self.condition_type
    }

    fn flags(&self) -> &ConditionFlags {
        &self.flags
    }

    fn flags_mut(&mut self) -> &mut ConditionFlags {
        &mut self.flags
    }

    fn is_condition_met(&self) -> bool {
        (self.evaluator)(&self.current_state)
    }

    fn manipulate(&mut self) {
        if let Some(transition) = &self.on_manipulate {
            self.current_state = transition(&self.current_state);
        }
    }

    fn manipulate_with(&mut self, value: &StateValue) -> bool {
        match T::from_value(value) {
            Some(state) => {
                self.current_state = state;
                true
            }
            None => false,
        }
    }

    fn reset(&mut self) {
        self.current_state = match &self.on_reset {
            Some(transition) => transition(&self.initial_state),
            None => self.initial_state.clone(),
        };
    }

    fn current_value(&self) -> StateValue {
        self.current_state.to_value()
    }
}

impl<T: ConditionState + std::fmt::Debug> std::fmt::Debug for Condition<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Condition")
            .field("initial_state", &self.initial_state)
            .field("current_state", &self.current_state)
            .field("condition_type", &self.condition_type)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_flags() {
        let flags = ConditionFlags::default();
        assert!(flags.reset_after_condition_met);
        assert!(flags.reset_only_on_evaluation_success);
        assert!(!flags.explicit_manipulation_only);
        assert!(!flags.disallow_parameterless_manipulation);
        assert!(flags.cache_current_value);
    }

    #[test]
    fn test_custom_condition_evaluates_current_state() {
        let mut condition = Condition::new(1_i64, |v| *v % 2 == 0);
        assert!(!condition.is_condition_met());

        assert!(condition.manipulate_with(&StateValue::Integer(4)));
        assert!(condition.is_condition_met());
        assert_eq!(condition.current_value(), StateValue::Integer(4));
    }

    #[test]
    fn test_mismatched_parameter_is_ignored() {
        let mut condition = Condition::new(String::from("start"), |s| s == "done");

        assert!(!condition.manipulate_with(&StateValue::Integer(5)));
        assert!(!condition.manipulate_with(&StateValue::Bool(true)));
        assert_eq!(condition.current_state(), "start");
    }

    #[test]
    fn test_implicit_manipulation_is_noop_by_default() {
        let mut condition = Condition::new(3_i64, |v| *v > 3);
        condition.manipulate();
        assert_eq!(*condition.current_state(), 3);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut condition = Condition::new(0_i64, |v| *v > 0).on_manipulate(|v| v + 1);
        condition.manipulate();
        condition.manipulate();

        condition.reset();
        let once = condition.current_value();
        condition.reset();
        assert_eq!(condition.current_value(), once);
        assert_eq!(once, StateValue::Integer(0));
    }

    #[test]
    fn test_custom_json_state() {
        let mut condition = Condition::new(serde_json::json!({"level": 1}), |v| v["level"] == 3);
        condition.manipulate_with(&StateValue::Custom(serde_json::json!({"level": 3})));
        assert!(condition.is_condition_met());

        let entry = condition.to_cache_entry("level");
        assert_eq!(entry.condition_name, "level");
        assert_eq!(entry.current_value, StateValue::Custom(serde_json::json!({"level": 3})));
    }

    #[test]
    fn test_flags_mutable_after_construction() {
        let mut condition = Condition::new(false, |b| *b).cache_current_value(false);
        assert!(!condition.is_cacheable());

        condition.flags_mut().cache_current_value = true;
        condition.flags_mut().explicit_manipulation_only = true;
        assert!(condition.is_cacheable());
        assert!(condition.flags().explicit_manipulation_only);
    }
}
