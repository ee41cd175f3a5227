//! Built-in conditions.
//!
//! | Factory | State | Met when | Implicit manipulation | Reset |
//! |---|---|---|---|---|
//! | [`boolean`] | `bool` (starts `false`) | state is `true` | flips | `false` |
//! | [`count`] | `i64` | state `>= goal` | `+1` | initial count |
//! | [`string_match`] | `String` (starts empty) | state `== goal` | none | initial string |
//! | [`expires_after`] | `DateTime<Utc>` | now `>` deadline | none | now `+` offset |
//!
//! Boolean conditions are not cached by default; everything else is.

use crate::condition::Condition;
use crate::types::ConditionType;
use chrono::{DateTime, TimeDelta, Utc};

/// A flag that is met while `true`. Implicit manipulation flips it.
pub fn boolean(condition_type: ConditionType) -> Condition<bool> {
    boolean_with(false, |state| *state, condition_type)
}

/// A flag with a custom initial state and evaluator.
///
/// A "never ask again" switch is `boolean_with(false, |s| !s, Prerequisite)`
/// combined with explicit-only manipulation.
pub fn boolean_with(
    initial_state: bool,
    evaluator: impl Fn(&bool) -> bool + Send + Sync + 'static,
    condition_type: ConditionType,
) -> Condition<bool> {
    Condition::new(initial_state, evaluator)
        .with_type(condition_type)
        .on_manipulate(|state| !state)
        .cache_current_value(false)
}

/// A counter that is met once it reaches `goal`. Implicit manipulation adds
/// one.
pub fn count(initial_state: i64, goal: i64, condition_type: ConditionType) -> Condition<i64> {
    count_with(initial_state, move |current| *current >= goal, condition_type)
}

/// A counter with a custom evaluator.
pub fn count_with(
    initial_state: i64,
    evaluator: impl Fn(&i64) -> bool + Send + Sync + 'static,
    condition_type: ConditionType,
) -> Condition<i64> {
    Condition::new(initial_state, evaluator)
        .with_type(condition_type)
        .on_manipulate(|current| current.saturating_add(1))
}

/// Met when the state equals `goal`. Starts empty.
pub fn string_match(goal: impl Into<String>, condition_type: ConditionType) -> Condition<String> {
    string_match_from(goal, String::new(), condition_type)
}

/// Met when the state equals `goal`, starting from `initial_state`.
pub fn string_match_from(
    goal: impl Into<String>,
    initial_state: impl Into<String>,
    condition_type: ConditionType,
) -> Condition<String> {
    let goal = goal.into();
    Condition::new(initial_state.into(), move |current: &String| *current == goal)
        .with_type(condition_type)
}

/// Met once the deadline `now + offset` has passed.
///
/// Reset moves the deadline to `now + offset` again, measured from the time
/// of the reset, so every reset starts a fresh window.
pub fn expires_after(offset: TimeDelta, condition_type: ConditionType) -> Condition<DateTime<Utc>> {
    Condition::new(deadline_from_now(offset), |deadline| Utc::now() > *deadline)
        .with_type(condition_type)
        .on_reset(move |_| deadline_from_now(offset))
}

fn deadline_from_now(offset: TimeDelta) -> DateTime<Utc> {
    Utc::now()
        .checked_add_signed(offset)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
