//! The rating gateway: runs one manipulate → evaluate → prompt → reset cycle
//! per rating action.
//!
//! # Evaluation rules
//!
//! 1. A registry holding only prerequisites never prompts.
//! 2. Every prerequisite must be met.
//! 3. Every requirement must be met.
//! 4. If requirements exist and the action prioritizes nothing, prompt.
//! 5. If the action prioritizes conditions, prompt iff every one of them is
//!    registered and met.
//! 6. Otherwise prompt iff any standard condition is met.
//!
//! # Calling contract
//!
//! A gateway serves one caller at a time. Every cycle takes `&mut self` and
//! runs to completion; the async entry points only suspend while the rating
//! view is open. Applications normally keep a single gateway (see
//! [`GatewayHandle`]) and pass it through their own context.

use crate::action::RatingAction;
use crate::cache::{ConditionCache, FileConditionCache, MemoryConditionCache};
use crate::condition::RatingCondition;
use crate::config::GatewayConfig;
use crate::errors::{GatewayError, GatewayResult};
use crate::events::{EventManager, EventReceiver, GatewayEvent};
use crate::registry::ConditionRegistry;
use crate::types::{ConditionType, StateValue};
use crate::view::{RatingView, StoreRatingView};
use tracing::{debug, info};

/// Decides when to ask the user for a rating.
pub struct RatingGateway {
    registry: ConditionRegistry,
    view: Box<dyn RatingView>,
    events: EventManager,
}

impl RatingGateway {
    /// Gateway over `registry` prompting through `view`
    pub fn new(registry: ConditionRegistry, view: Box<dyn RatingView>) -> Self {
        Self {
            registry,
            view,
            events: EventManager::default(),
        }
    }

    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::new()
    }

    pub fn registry(&self) -> &ConditionRegistry {
        &self.registry
    }

    /// Direct registry access. Changes made here bypass gateway events.
    pub fn registry_mut(&mut self) -> &mut ConditionRegistry {
        &mut self.registry
    }

    /// Replace the rating view
    pub fn set_view(&mut self, view: Box<dyn RatingView>) {
        self.view = view;
    }

    pub fn events(&self) -> &EventManager {
        &self.events
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    // ═══════════════════════════════════════════════════════
    // CONDITION MANAGEMENT
    // ═══════════════════════════════════════════════════════

    /// Register a condition. See [`ConditionRegistry::add_condition`].
    pub fn add_condition(
        &mut self,
        condition_name: impl Into<String>,
        condition: impl RatingCondition + 'static,
    ) -> GatewayResult<()> {
        self.add_boxed(condition_name, Box::new(condition))
    }

    pub fn add_boxed(
        &mut self,
        condition_name: impl Into<String>,
        condition: Box<dyn RatingCondition>,
    ) -> GatewayResult<()> {
        let name = condition_name.into();
        let restored = self.registry.add_boxed(name.clone(), condition)?;
        self.events
            .emit(GatewayEvent::condition_registered(name, restored));
        Ok(())
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

    pub fn remove_condition(
        &mut self,
        condition_name: &str,
        remove_from_cache: bool,
    ) -> GatewayResult<Option<Box<dyn RatingCondition>>> {
        let removed = self
            .registry
            .remove_condition(condition_name, remove_from_cache)?;
        if removed.is_some() {
            self.events.emit(GatewayEvent::condition_removed(
                condition_name,
                remove_from_cache,
            ));
        }
        Ok(removed)
    }

    /// Reset every condition, met or not, and persist the cacheable ones.
    pub fn reset_all_conditions(&mut self) -> GatewayResult<()> {
        self.registry.reset_all_conditions()?;
        self.events
            .emit(GatewayEvent::all_conditions_reset(self.registry.len()));
        Ok(())
    }

    pub fn contains_key(&self, condition_name: &str) -> bool {
        self.registry.contains_key(condition_name)
    }

    pub fn condition(&self, condition_name: &str) -> Option<&dyn RatingCondition> {
        self.registry.get(condition_name)
    }

    pub fn has_prerequisite_conditions(&self) -> bool {
        self.registry.has_prerequisite_conditions()
    }

    pub fn has_required_conditions(&self) -> bool {
        self.registry.has_required_conditions()
    }

    pub fn has_only_prerequisite_conditions(&self) -> bool {
        self.registry.has_only_prerequisite_conditions()
    }

    // ═══════════════════════════════════════════════════════
    // EVALUATION CYCLE
    // ═══════════════════════════════════════════════════════

    /// Run a cycle naming no condition. Returns whether the view was opened.
    pub fn evaluate(&mut self) -> GatewayResult<bool> {
        self.evaluate_action(&RatingAction::blanket())
    }

    /// Run a cycle naming one condition, optionally with a parameter.
    pub fn evaluate_condition(
        &mut self,
        condition_name: &str,
        parameter: Option<StateValue>,
        manipulate_only: bool,
    ) -> GatewayResult<bool> {
        let action = RatingAction::blanket()
            .with_optional(condition_name, parameter)
            .manipulate_only(manipulate_only);
        self.evaluate_action(&action)
    }

    /// Run a cycle naming several conditions.
    pub fn evaluate_conditions<I, K>(
        &mut self,
        parameters: I,
        manipulate_only: bool,
    ) -> GatewayResult<bool>
    where
        I: IntoIterator<Item = (K, Option<StateValue>)>,
        K: Into<String>,
    {
        let action = collect_action(parameters, manipulate_only);
        self.evaluate_action(&action)
    }

    /// Run a full cycle for `action`.
    pub fn evaluate_action(&mut self, action: &RatingAction) -> GatewayResult<bool> {
        self.manipulate(action)?;
        let prompted = self.conclude(action);
        if prompted {
            self.view.try_open_rating_page();
        }
        self.reset_met_conditions(prompted)?;
        Ok(prompted)
    }

    pub async fn evaluate_async(&mut self) -> GatewayResult<bool> {
        self.evaluate_action_async(&RatingAction::blanket()).await
    }

    pub async fn evaluate_condition_async(
        &mut self,
        condition_name: &str,
        parameter: Option<StateValue>,
        manipulate_only: bool,
    ) -> GatewayResult<bool> {
        let action = RatingAction::blanket()
            .with_optional(condition_name, parameter)
            .manipulate_only(manipulate_only);
        self.evaluate_action_async(&action).await
    }

    pub async fn evaluate_conditions_async<I, K>(
        &mut self,
        parameters: I,
        manipulate_only: bool,
    ) -> GatewayResult<bool>
    where
        I: IntoIterator<Item = (K, Option<StateValue>)>,
        K: Into<String>,
    {
        let action = collect_action(parameters, manipulate_only);
        self.evaluate_action_async(&action).await
    }

    /// Run a full cycle for `action`, awaiting the view if it prompts.
    pub async fn evaluate_action_async(&mut self, action: &RatingAction) -> GatewayResult<bool> {
        self.manipulate(action)?;
        let prompted = self.conclude(action);
        if prompted {
            self.view.try_open_rating_page_async().await;
        }
        self.reset_met_conditions(prompted)?;
        Ok(prompted)
    }

    /// Would the current states prompt for `action`? Runs the evaluation
    /// rules only: nothing is manipulated, opened, reset or saved.
    pub fn should_prompt(&self, action: &RatingAction) -> bool {
        let registry = &self.registry;

        // Prerequisites gate everything and never suffice alone.
        if registry.has_only_prerequisite_conditions()
            || !registry.all_met(ConditionType::Prerequisite)
        {
            return false;
        }

        let priority_conditions = action.priority_conditions();

        if !registry.all_met(ConditionType::Requirement) {
            return false;
        }
        if registry.has_required_conditions() && priority_conditions.is_empty() {
            return true;
        }

        if !priority_conditions.is_empty() {
            return priority_conditions
                .iter()
                .all(|condition_name| registry.is_met(condition_name));
        }

        registry.any_met(ConditionType::Standard)
    }

    fn manipulate(&mut self, action: &RatingAction) -> GatewayResult<()> {
        for index in 0..self.registry.len() {
            let entry = &mut self.registry.entries_mut()[index];
            let name = entry.name().to_string();
            let condition = entry.condition_mut();
            let flags = *condition.flags();

            if flags.explicit_manipulation_only && !action.names(&name) {
                continue;
            }

            let explicit = match action.parameter(&name) {
                Some(value) => {
                    if !condition.manipulate_with(value) {
                        debug!(
                            "Ignoring {} parameter for condition '{}'",
                            value.kind(),
                            name
                        );
                    }
                    true
                }
                None if !flags.disallow_parameterless_manipulation => {
                    condition.manipulate();
                    false
                }
                None => continue,
            };

            let current_value = condition.current_value();
            self.registry.persist(index)?;

            debug!("Manipulated condition '{}' -> {}", name, current_value);
            self.events.emit(GatewayEvent::condition_manipulated(
                name,
                explicit,
                current_value,
            ));
        }
        Ok(())
    }

    fn conclude(&self, action: &RatingAction) -> bool {
        let prompted = self.should_prompt(action);
        let priority_conditions: Vec<String> = action
            .priority_conditions()
            .into_iter()
            .map(str::to_string)
            .collect();

        debug!(
            "Evaluated {} conditions (priorities: {:?}): prompt = {}",
            self.registry.len(),
            priority_conditions,
            prompted
        );
        self.events.emit(GatewayEvent::evaluation_completed(
            prompted,
            priority_conditions,
        ));

        if prompted {
            info!("Rating conditions satisfied, requesting rating prompt");
            self.events.emit(GatewayEvent::prompt_requested());
        }
        prompted
    }

    fn reset_met_conditions(&mut self, prompted: bool) -> GatewayResult<()> {
        for index in 0..self.registry.len() {
            let entry = &mut self.registry.entries_mut()[index];
            let name = entry.name().to_string();
            let condition = entry.condition_mut();
            let flags = *condition.flags();

            if !flags.reset_after_condition_met || !condition.is_condition_met() {
                continue;
            }
            if flags.reset_only_on_evaluation_success && !prompted {
                continue;
            }

            condition.reset();
            self.registry.persist(index)?;

            debug!("Reset condition '{}'", name);
            self.events.emit(GatewayEvent::condition_reset(name));
        }
        Ok(())
    }
}

fn collect_action<I, K>(parameters: I, manipulate_only: bool) -> RatingAction
where
    I: IntoIterator<Item = (K, Option<StateValue>)>,
    K: Into<String>,
{
    parameters
        .into_iter()
        .fold(RatingAction::blanket(), |action, (name, value)| {
            action.with_optional(name, value)
        })
        .manipulate_only(manipulate_only)
}

impl std::fmt::Debug for RatingGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RatingGateway")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

// ═══════════════════════════════════════════════════════════════════
// BUILDER
// ═══════════════════════════════════════════════════════════════════

/// Assembles a [`RatingGateway`].
///
/// Unless overridden, the view is a [`StoreRatingView`] and the cache is a
/// [`FileConditionCache`] at [`GatewayConfig::cache_file_path`] (or an
/// in-memory cache when the config disables persistence).
#[derive(Default)]
pub struct GatewayBuilder {
    config: GatewayConfig,
    conditions: Vec<(String, Box<dyn RatingCondition>)>,
    view: Option<Box<dyn RatingView>>,
    cache: Option<Box<dyn ConditionCache>>,
}

impl GatewayBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: GatewayConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a condition; registered in the order given
    pub fn condition(
        mut self,
        condition_name: impl Into<String>,
        condition: impl RatingCondition + 'static,
    ) -> Self {
        self.conditions
            .push((condition_name.into(), Box::new(condition)));
        self
    }

    pub fn conditions<I, K>(mut self, conditions: I) -> Self
    where
        I: IntoIterator<Item = (K, Box<dyn RatingCondition>)>,
        K: Into<String>,
    {
        self.conditions
            .extend(conditions.into_iter().map(|(name, c)| (name.into(), c)));
        self
    }

    pub fn view(mut self, view: impl RatingView + 'static) -> Self {
        self.view = Some(Box::new(view));
        self
    }

    pub fn cache(mut self, cache: impl ConditionCache + 'static) -> Self {
        self.cache = Some(Box::new(cache));
        self
    }

    /// Build the gateway and register the conditions. Fails on the first
    /// condition that cannot be registered.
    pub fn build(self) -> GatewayResult<RatingGateway> {
        let cache: Box<dyn ConditionCache> = match self.cache {
            Some(cache) => cache,
            None if self.config.persist => {
                Box::new(FileConditionCache::from_config(&self.config))
            }
            None => Box::new(MemoryConditionCache::new()),
        };
        let view = self
            .view
            .unwrap_or_else(|| Box::new(StoreRatingView::new()));

        let mut gateway = RatingGateway {
            registry: ConditionRegistry::new(cache),
            view,
            events: EventManager::new(self.config.event_capacity),
        };
        gateway.add_conditions(self.conditions)?;
        Ok(gateway)
    }
}

// ═══════════════════════════════════════════════════════════════════
// APPLICATION-WIDE INSTANCE
// ═══════════════════════════════════════════════════════════════════

/// Holds the application's gateway and builds it at most once.
///
/// The first successful [`initialize`](Self::initialize) builds and stores
/// the gateway; later calls leave it untouched and return it. A failed
/// build leaves the handle empty so initialization can be retried.
#[derive(Debug, Default)]
pub struct GatewayHandle {
    gateway: Option<RatingGateway>,
}

impl GatewayHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initialize(&mut self, builder: GatewayBuilder) -> GatewayResult<&mut RatingGateway> {
        if self.gateway.is_none() {
            self.gateway = Some(builder.build()?);
        } else {
            debug!("Rating gateway already initialized, ignoring new configuration");
        }
        self.gateway
            .as_mut()
            .ok_or_else(|| GatewayError::internal("Gateway missing after initialization"))
    }

    pub fn is_initialized(&self) -> bool {
        self.gateway.is_some()
    }

    pub fn current(&self) -> Option<&RatingGateway> {
        self.gateway.as_ref()
    }

    pub fn current_mut(&mut self) -> Option<&mut RatingGateway> {
        self.gateway.as_mut()
    }
}
