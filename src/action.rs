//! The parameter set of one rating action.

use crate::types::StateValue;
use serde::{Deserialize, Serialize};

/// What a caller tells the gateway when something rating-relevant happened.
///
/// An action names zero or more conditions. Each named condition may carry a
/// parameter that replaces its state; a named condition without a parameter
/// is manipulated implicitly. Naming a condition also makes it a priority for
/// this cycle unless `manipulate_only` is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RatingAction {
    /// Named conditions in the order given, with optional parameters.
    #[serde(default)]
    pub parameters: Vec<(String, Option<StateValue>)>,

    /// Manipulate the named conditions but do not prioritize them.
    #[serde(default)]
    pub manipulate_only: bool,
}

impl RatingAction {
    /// An action naming no condition
    pub fn blanket() -> Self {
        Self::default()
    }

    /// An action naming one condition, without a parameter
    pub fn for_condition(condition_name: impl Into<String>) -> Self {
        Self::blanket().touch(condition_name)
    }

    /// Name a condition and give it a parameter.
    /// Naming the same condition twice keeps the last parameter
    pub fn with(mut self, condition_name: impl Into<String>, value: impl Into<StateValue>) -> Self {
        self.insert(condition_name.into(), Some(value.into()));
        self
    }

    /// Name a condition without a parameter
    pub fn touch(mut self, condition_name: impl Into<String>) -> Self {
        self.insert(condition_name.into(), None);
        self
    }

    /// Name a condition with an optional parameter
    pub fn with_optional(
        mut self,
        condition_name: impl Into<String>,
        value: Option<StateValue>,
    ) -> Self {
        self.insert(condition_name.into(), value);
        self
    }

    /// Set manipulate-only mode
    pub fn manipulate_only(mut self, manipulate_only: bool) -> Self {
        self.manipulate_only = manipulate_only;
        self
    }

    /// Was this condition named?
    pub fn names(&self, condition_name: &str) -> bool {
        self.parameters.iter().any(|(name, _)| name == condition_name)
    }

    /// Parameter supplied for this condition, if any
    pub fn parameter(&self, condition_name: &str) -> Option<&StateValue> {
        self.parameters
            .iter()
            .find(|(name, _)| name == condition_name)
            .and_then(|(_, value)| value.as_ref())
    }

    /// Conditions that must be met for this cycle to prompt
    pub fn priority_conditions(&self) -> Vec<&str> {
        if self.manipulate_only {
            return Vec::new();
        }
        self.parameters.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn is_blanket(&self) -> bool {
        self.parameters.is_empty()
    }

    fn insert(&mut self, condition_name: String, value: Option<StateValue>) {
        match self
            .parameters
            .iter_mut()
            .find(|(name, _)| *name == condition_name)
        {
            Some(existing) => existing.1 = value,
            None => self.parameters.push((condition_name, value)),
        }
    }
}

impl<K, V> FromIterator<(K, Option<V>)> for RatingAction
where
    K: Into<String>,
    V: Into<StateValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, Option<V>)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::blanket(), |action, (name, value)| {
                action.with_optional(name, value.map(Into::into))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blanket_has_no_priorities() {
        let action = RatingAction::blanket();
        assert!(action.is_blanket());
        assert!(action.priority_conditions().is_empty());
    }

    #[test]
    fn test_named_conditions_are_priorities() {
        let action = RatingAction::for_condition("clicks").with("level", 3);
        assert_eq!(action.priority_conditions(), vec!["clicks", "level"]);
        assert!(action.names("clicks"));
        assert_eq!(action.parameter("clicks"), None);
        assert_eq!(action.parameter("level"), Some(&StateValue::Integer(3)));
    }

    #[test]
    fn test_manipulate_only_clears_priorities() {
        let action = RatingAction::for_condition("clicks").manipulate_only(true);
        assert!(action.priority_conditions().is_empty());
        assert!(action.names("clicks"));
    }

    #[test]
    fn test_last_parameter_wins() {
        let action = RatingAction::blanket().with("a", 1).with("a", "x");
        assert_eq!(action.parameters.len(), 1);
        assert_eq!(action.parameter("a"), Some(&StateValue::Text("x".into())));
    }

    #[test]
    fn test_collect_from_pairs() {
        let action: RatingAction = vec![("a", Some(true)), ("b", None)].into_iter().collect();
        assert_eq!(action.parameter("a"), Some(&StateValue::Bool(true)));
        assert!(action.names("b"));
    }
}
