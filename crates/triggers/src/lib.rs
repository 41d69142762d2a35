//! Trigger rules: which event schedules which agent.
//!
//! Each event type maps to at most one [`TriggerRule`]. A rule carries a
//! predicate over the event payload, the agent to run, a priority and an
//! optional delay. [`TriggerEvaluator::evaluate`] turns a matching event
//! into a [`Dispatch`] for the scheduler.
//!
//! # Example rule
//!
//! ```toml
//! [[triggers]]
//! event_type = "scout.completed"
//! condition = "hotCount >= 2"
//! target = "reach-3"
//! priority = "high"
//! ```

mod condition;
mod rules;

pub use condition::{Condition, parse_condition};
pub use rules::{Dispatch, Predicate, RuleTable, TriggerEvaluator, TriggerRule};

/// Errors from building a rule table.
#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
    #[error("condition parse error in trigger '{event_type}': {detail}")]
    InvalidCondition { event_type: String, detail: String },
}

impl From<TriggerError> for agentrelay_core::Error {
    fn from(err: TriggerError) -> Self {
        agentrelay_core::Error::Config {
            message: err.to_string(),
        }
    }
}
