//! Insertion-ordered set of named conditions, backed by a condition cache.

use crate::cache::{ConditionCache, MemoryConditionCache};
use crate::condition::RatingCondition;
use crate::errors::{GatewayError, GatewayResult};
use crate::types::ConditionType;
use tracing::debug;

/// A registered condition.
pub struct RegisteredCondition {
    name: String,
    condition: Box<dyn RatingCondition>,
}

impl RegisteredCondition {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn condition(&self) -> &dyn RatingCondition {
        self.condition.as_ref()
    }

    pub fn condition_mut(&mut self) -> &mut dyn RatingCondition {
        self.condition.as_mut()
    }
}

impl std::fmt::Debug for RegisteredCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredCondition")
            .field("name", &self.name)
            .field("condition_type", &self.condition.condition_type())
            .field("current_value", &self.condition.current_value())
            .finish()
    }
}

/// The conditions a gateway evaluates.
///
/// Registration order is kept and is the order the gateway walks conditions
/// in. Collections are expected to be small (a handful of conditions), so
/// lookups are linear.
pub struct ConditionRegistry {
    conditions: Vec<RegisteredCondition>,
    cache: Box<dyn ConditionCache>,
}

impl ConditionRegistry {
    pub fn new(cache: Box<dyn ConditionCache>) -> Self {
        Self {
            conditions: Vec::new(),
            cache,
        }
    }

    /// Registry with a fresh in-memory cache
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryConditionCache::new()))
    }

    /// Register a condition.
    ///
    /// Cacheable conditions pick up their stored state; when nothing is
    /// stored yet, the initial state is written so the cache has a baseline.
    /// Returns whether a stored state was restored.
    pub fn add_condition(
        &mut self,
        condition_name: impl Into<String>,
        condition: impl RatingCondition + 'static,
    ) -> GatewayResult<bool> {
        self.add_boxed(condition_name, Box::new(condition))
    }

    /// Register an already boxed condition
    pub fn add_boxed(
        &mut self,
        condition_name: impl Into<String>,
        mut condition: Box<dyn RatingCondition>,
    ) -> GatewayResult<bool> {
        let name = condition_name.into();
        if name.is_empty() {
            return Err(GatewayError::invalid_input("Condition name must not be empty"));
        }
        if self.contains_key(&name) {
            return Err(GatewayError::duplicate_key(&name));
        }

        let mut restored = false;
        if condition.is_cacheable() {
            restored = self.cache.load(&name, condition.as_mut());
            if !restored {
                self.cache.save(&name, condition.as_ref())?;
            }
        }

        debug!(
            "Registered {} condition '{}' (restored from cache: {})",
            condition.condition_type(),
            name,
            restored
        );
        self.conditions.push(RegisteredCondition { name, condition });
        Ok(restored)
    }

    /// Register several conditions in order. Stops at the first failure;
    /// conditions added before it stay registered.
    pub fn add_conditions<I, K>(&mut self, conditions: I) -> GatewayResult<()>
    where
        I: IntoIterator<Item = (K, Box<dyn RatingCondition>)>,
        K: Into<String>,
    {
        for (name, condition) in conditions {
            self.add_boxed(name, condition)?;
        }
        Ok(())
    }

    /// Remove a condition, optionally deleting its cached state too.
    /// Returns the removed condition, if it was registered.
    pub fn remove_condition(
        &mut self,
        condition_name: &str,
        remove_from_cache: bool,
    ) -> GatewayResult<Option<Box<dyn RatingCondition>>> {
        let removed = self
            .conditions
            .iter()
            .position(|entry| entry.name == condition_name)
            .map(|index| self.conditions.remove(index).condition);

        if remove_from_cache {
            self.cache.delete(condition_name)?;
        }
        Ok(removed)
    }

    /// Reset every condition, met or not, and persist the cacheable ones.
    pub fn reset_all_conditions(&mut self) -> GatewayResult<()> {
        for index in 0..self.conditions.len() {
            self.conditions[index].condition.reset();
            self.persist(index)?;
        }
        Ok(())
    }

    pub fn contains_key(&self, condition_name: &str) -> bool {
        self.conditions.iter().any(|entry| entry.name == condition_name)
    }

    pub fn get(&self, condition_name: &str) -> Option<&dyn RatingCondition> {
        self.conditions
            .iter()
            .find(|entry| entry.name == condition_name)
            .map(RegisteredCondition::condition)
    }

    pub fn get_mut(&mut self, condition_name: &str) -> Option<&mut dyn RatingCondition> {
        self.conditions
            .iter_mut()
            .find(|entry| entry.name == condition_name)
            .map(RegisteredCondition::condition_mut)
    }

    /// Conditions in registration order
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredCondition> {
        self.conditions.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.conditions.iter().map(|entry| entry.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn has_prerequisite_conditions(&self) -> bool {
        self.has_type(ConditionType::Prerequisite)
    }

    pub fn has_required_conditions(&self) -> bool {
        self.has_type(ConditionType::Requirement)
    }

    /// True when the registry is non-empty and holds nothing but
    /// prerequisites. Such a registry can never prompt.
    pub fn has_only_prerequisite_conditions(&self) -> bool {
        !self.conditions.is_empty()
            && self
                .conditions
                .iter()
                .all(|entry| entry.condition.condition_type() == ConditionType::Prerequisite)
    }

    /// Are all conditions of this type met? Vacuously true if there are none.
    pub fn all_met(&self, condition_type: ConditionType) -> bool {
        self.conditions
            .iter()
            .filter(|entry| entry.condition.condition_type() == condition_type)
            .all(|entry| entry.condition.is_condition_met())
    }

    /// Is at least one condition of this type met?
    pub fn any_met(&self, condition_type: ConditionType) -> bool {
        self.conditions.iter().any(|entry| {
            entry.condition.condition_type() == condition_type && entry.condition.is_condition_met()
        })
    }

    /// Is the named condition registered and met?
    pub fn is_met(&self, condition_name: &str) -> bool {
        self.get(condition_name)
            .map(|condition| condition.is_condition_met())
            .unwrap_or(false)
    }

    pub(crate) fn entries_mut(&mut self) -> &mut [RegisteredCondition] {
        &mut self.conditions
    }

    /// Save the condition at `index` if it is cacheable
    pub(crate) fn persist(&mut self, index: usize) -> GatewayResult<()> {
        let entry = &self.conditions[index];
        if entry.condition.is_cacheable() {
            self.cache.save(&entry.name, entry.condition.as_ref())?;
        }
        Ok(())
    }

    fn has_type(&self, condition_type: ConditionType) -> bool {
        self.conditions
            .iter()
            .any(|entry| entry.condition.condition_type() == condition_type)
    }
}

impl Default for ConditionRegistry {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl std::fmt::Debug for ConditionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConditionRegistry")
            .field("conditions", &self.conditions)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions;
    use crate::errors::ErrorCode;
    use crate::types::StateValue;

    fn boxed(condition: impl RatingCondition + 'static) -> Box<dyn RatingCondition> {
        Box::new(condition)
    }

    #[test]
    fn test_duplicate_name_is_rejected() {
        let mut registry = ConditionRegistry::in_memory();
        registry
            .add_condition("Tester", conditions::boolean(ConditionType::Standard))
            .unwrap();

        let err = registry
            .add_condition("Tester", conditions::boolean(ConditionType::Standard))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::DuplicateKey);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_empty_name_is_rejected() {
        let mut registry = ConditionRegistry::in_memory();
        let err = registry
            .add_condition("", conditions::boolean(ConditionType::Standard))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
    }

    #[test]
    fn test_batch_add_keeps_earlier_entries_on_failure() {
        let mut registry = ConditionRegistry::in_memory();
        registry
            .add_condition("b", conditions::boolean(ConditionType::Standard))
            .unwrap();

        let result = registry.add_conditions(vec![
            ("a", boxed(conditions::count(0, 3, ConditionType::Standard))),
            ("b", boxed(conditions::boolean(ConditionType::Standard))),
            ("c", boxed(conditions::boolean(ConditionType::Standard))),
        ]);

        assert!(result.is_err());
        assert_eq!(registry.names(), vec!["b", "a"]);
    }

    #[test]
    fn test_type_queries() {
        let mut prereq_only = ConditionRegistry::in_memory();
        prereq_only
            .add_condition("p1", conditions::boolean(ConditionType::Prerequisite))
            .unwrap();
        prereq_only
            .add_condition("p2", conditions::boolean(ConditionType::Prerequisite))
            .unwrap();
        assert!(prereq_only.has_prerequisite_conditions());
        assert!(prereq_only.has_only_prerequisite_conditions());
        assert!(!prereq_only.has_required_conditions());

        let mut mixed = ConditionRegistry::in_memory();
        mixed
            .add_condition("s", conditions::boolean(ConditionType::Standard))
            .unwrap();
        mixed
            .add_condition("r", conditions::boolean(ConditionType::Requirement))
            .unwrap();
        assert!(!mixed.has_prerequisite_conditions());
        assert!(!mixed.has_only_prerequisite_conditions());
        assert!(mixed.has_required_conditions());

        assert!(!ConditionRegistry::in_memory().has_only_prerequisite_conditions());
    }

    #[test]
    fn test_add_restores_cached_state() {
        let cache = MemoryConditionCache::with_entries([crate::cache::ConditionCacheEntry::new(
            "clicks",
            StateValue::Integer(4),
        )]);
        let mut registry = ConditionRegistry::new(Box::new(cache.clone()));

        let restored = registry
            .add_condition("clicks", conditions::count(0, 5, ConditionType::Standard))
            .unwrap();
        assert!(restored);
        assert_eq!(
            registry.get("clicks").unwrap().current_value(),
            StateValue::Integer(4)
        );
    }

    #[test]
    fn test_add_writes_baseline_when_nothing_cached() {
        let cache = MemoryConditionCache::new();
        let mut registry = ConditionRegistry::new(Box::new(cache.clone()));

        registry
            .add_condition("clicks", conditions::count(2, 5, ConditionType::Standard))
            .unwrap();
        // Booleans are not cached by default.
        registry
            .add_condition("flag", conditions::boolean(ConditionType::Standard))
            .unwrap();

        assert_eq!(cache.get("clicks"), Some(StateValue::Integer(2)));
        assert_eq!(cache.get("flag"), None);
    }

    #[test]
    fn test_remove_condition_purges_cache() {
        let cache = MemoryConditionCache::new();
        let mut registry = ConditionRegistry::new(Box::new(cache.clone()));
        registry
            .add_condition("a", conditions::count(0, 5, ConditionType::Standard))
            .unwrap();
        registry
            .add_condition("b", conditions::count(0, 5, ConditionType::Standard))
            .unwrap();

        assert!(registry.remove_condition("a", true).unwrap().is_some());
        assert!(registry.remove_condition("b", false).unwrap().is_some());
        assert!(registry.remove_condition("ghost", true).unwrap().is_none());

        assert!(registry.is_empty());
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(StateValue::Integer(0)));
    }

    #[test]
    fn test_reset_all_conditions() {
        let cache = MemoryConditionCache::new();
        let mut registry = ConditionRegistry::new(Box::new(cache.clone()));
        registry
            .add_condition("Test1", conditions::count(0, 10, ConditionType::Standard))
            .unwrap();
        registry
            .add_condition("Test2", conditions::count(1, 7, ConditionType::Standard))
            .unwrap();
        registry
            .get_mut("Test1")
            .unwrap()
            .manipulate_with(&StateValue::Integer(10));
        registry
            .get_mut("Test2")
            .unwrap()
            .manipulate_with(&StateValue::Integer(3));

        registry.reset_all_conditions().unwrap();

        assert!(!registry.is_met("Test1"));
        assert!(!registry.is_met("Test2"));
        assert_eq!(cache.get("Test1"), Some(StateValue::Integer(0)));
        assert_eq!(cache.get("Test2"), Some(StateValue::Integer(1)));
    }

    #[test]
    fn test_met_queries() {
        let mut registry = ConditionRegistry::in_memory();
        registry
            .add_condition("r1", conditions::boolean_with(true, |b| *b, ConditionType::Requirement))
            .unwrap();
        registry
            .add_condition("r2", conditions::boolean(ConditionType::Requirement))
            .unwrap();

        assert!(!registry.all_met(ConditionType::Requirement));
        assert!(registry.any_met(ConditionType::Requirement));
        assert!(registry.all_met(ConditionType::Prerequisite));
        assert!(!registry.any_met(ConditionType::Standard));
        assert!(!registry.is_met("ghost"));
    }
}
