//! # Rating Gateway
//!
//! Decides when an application should ask its user for a store rating.
//!
//! The application registers named **conditions** (counters, flags, string
//! matches, deadlines) with a [`RatingGateway`]. Whenever something
//! rating-relevant happens it reports a [`RatingAction`], and the gateway
//! runs one cycle:
//!
//! - **Manipulate**: advance or overwrite condition states, persisting the
//!   cacheable ones
//! - **Evaluate**: combine prerequisite, requirement and standard conditions
//!   with the action's priorities into a yes/no decision
//! - **Prompt**: open the [`RatingView`] on yes
//! - **Reset**: return met conditions to their initial states
//!
//! Condition states survive restarts through a [`ConditionCache`], by default
//! a JSON file ([`FileConditionCache`]).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rating_gateway::prelude::*;
//! use rating_gateway::conditions;
//! use chrono::TimeDelta;
//!
//! # fn main() -> GatewayResult<()> {
//! let mut gateway = RatingGateway::builder()
//!     .config(GatewayConfig::new("/var/lib/myapp"))
//!     .condition(
//!         "NeverAskAgain",
//!         conditions::boolean_with(false, |never| !never, ConditionType::Prerequisite)
//!             .reset_after_condition_met(false)
//!             .explicit_manipulation_only(true)
//!             .disallow_parameterless_manipulation(true),
//!     )
//!     .condition(
//!         "Cooldown",
//!         conditions::expires_after(TimeDelta::days(7), ConditionType::Prerequisite)
//!             .reset_only_on_evaluation_success(false),
//!     )
//!     .condition(
//!         "ClickCount",
//!         conditions::count(0, 5, ConditionType::Standard).explicit_manipulation_only(true),
//!     )
//!     .build()?;
//!
//! // Somewhere a button was clicked
//! let prompted = gateway.evaluate_action(&RatingAction::for_condition("ClickCount"))?;
//! # let _ = prompted;
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod cache;
pub mod condition;
pub mod conditions;
pub mod config;
pub mod errors;
pub mod events;
pub mod gateway;
pub mod registry;
pub mod types;
pub mod view;

// Re-export everything in prelude for convenience
pub mod prelude {
    pub use crate::action::*;
    pub use crate::cache::*;
    pub use crate::condition::*;
    pub use crate::config::*;
    pub use crate::errors::*;
    pub use crate::events::*;
    pub use crate::gateway::*;
    pub use crate::registry::*;
    pub use crate::types::*;
    pub use crate::view::*;
}

// Also re-export at crate root
pub use prelude::*;
