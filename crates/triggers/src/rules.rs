//! Trigger rules and the evaluator that applies them to events.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use agentrelay_config::TriggerConfig;
use agentrelay_core::{Event, Payload, Priority};
use tracing::{debug, warn};

use crate::TriggerError;
use crate::condition::{Condition, parse_condition};

/// Predicate over an event payload.
#[derive(Clone)]
pub enum Predicate {
    /// A parsed condition expression
    Expr { source: String, condition: Condition },
    /// A predicate supplied in code
    Func(Arc<dyn Fn(&Payload) -> bool + Send + Sync>),
}

impl Predicate {
    pub fn parse(source: &str) -> Result<Self, String> {
        Ok(Predicate::Expr {
            source: source.trim().to_string(),
            condition: parse_condition(source)?,
        })
    }

    pub fn always() -> Self {
        Predicate::Expr {
            source: String::new(),
            condition: Condition::Always,
        }
    }

    pub fn func(f: impl Fn(&Payload) -> bool + Send + Sync + 'static) -> Self {
        Predicate::Func(Arc::new(f))
    }

    pub fn matches(&self, payload: &Payload) -> bool {
        match self {
            Predicate::Expr { condition, .. } => condition.evaluate(payload),
            Predicate::Func(f) => f(payload),
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Expr { source, .. } if source.is_empty() => f.write_str("always"),
            Predicate::Expr { source, .. } => write!(f, "{source}"),
            Predicate::Func(_) => f.write_str("<fn>"),
        }
    }
}

/// Maps one event type to a follow-up agent run.
#[derive(Debug, Clone)]
pub struct TriggerRule {
    pub event_type: String,
    pub predicate: Predicate,
    pub target_agent_id: String,
    pub priority: Priority,
    /// Hold-back before the invocation becomes due; ignored for urgent rules
    pub delay: Duration,
}

impl TriggerRule {
    pub fn new(
        event_type: impl Into<String>,
        predicate: Predicate,
        target_agent_id: impl Into<String>,
        priority: Priority,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            predicate,
            target_agent_id: target_agent_id.into(),
            priority,
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Build a rule from its config form, parsing the condition.
    pub fn from_config(config: &TriggerConfig) -> Result<Self, TriggerError> {
        let predicate =
            Predicate::parse(&config.condition).map_err(|detail| TriggerError::InvalidCondition {
                event_type: config.event_type.clone(),
                detail,
            })?;
        Ok(Self::new(
            config.event_type.clone(),
            predicate,
            config.target.clone(),
            config.priority,
        )
        .with_delay(Duration::from_secs(config.delay_secs)))
    }
}

/// What the scheduler should do in response to an event.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub target_agent_id: String,
    /// The triggering event's payload
    pub input: Payload,
    pub priority: Priority,
    pub delay: Duration,
}

impl Dispatch {
    pub fn is_urgent(&self) -> bool {
        self.priority == Priority::Urgent
    }
}

/// Immutable rule table, at most one rule per event type.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: HashMap<String, TriggerRule>,
}

impl RuleTable {
    /// Build a table; when two rules share an event type the first one wins.
    pub fn new(rules: impl IntoIterator<Item = TriggerRule>) -> Self {
        let mut table: HashMap<String, TriggerRule> = HashMap::new();
        for rule in rules {
            if table.contains_key(&rule.event_type) {
                warn!(event_type = %rule.event_type, target = %rule.target_agent_id, "Ignoring shadowed trigger rule");
                continue;
            }
            table.insert(rule.event_type.clone(), rule);
        }
        Self { rules: table }
    }

    pub fn from_config(configs: &[TriggerConfig]) -> Result<Self, TriggerError> {
        let rules = configs
            .iter()
            .map(TriggerRule::from_config)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(rules))
    }

    pub fn get(&self, event_type: &str) -> Option<&TriggerRule> {
        self.rules.get(event_type)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// All rules sorted by event type.
    pub fn rules(&self) -> Vec<&TriggerRule> {
        let mut rules: Vec<&TriggerRule> = self.rules.values().collect();
        rules.sort_by(|a, b| a.event_type.cmp(&b.event_type));
        rules
    }
}

/// Decides whether an event should schedule a follow-up run.
///
/// Pure over the event and its own rule table.
#[derive(Debug, Clone, Default)]
pub struct TriggerEvaluator {
    table: RuleTable,
}

impl TriggerEvaluator {
    pub fn new(table: RuleTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &RuleTable {
        &self.table
    }

    pub fn evaluate(&self, event: &Event) -> Option<Dispatch> {
        let rule = self.table.get(&event.event_type)?;
        if !rule.predicate.matches(&event.payload) {
            debug!(event_type = %event.event_type, condition = ?rule.predicate, "Trigger condition not met");
            return None;
        }
        Some(Dispatch {
            target_agent_id: rule.target_agent_id.clone(),
            input: event.payload.clone(),
            priority: rule.priority,
            delay: rule.delay,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(event_type: &str, payload: serde_json::Value) -> Event {
        let serde_json::Value::Object(map) = payload else {
            panic!("payload must be an object");
        };
        Event::new(event_type, map)
    }

    fn builtin() -> TriggerEvaluator {
        TriggerEvaluator::new(
            RuleTable::from_config(&agentrelay_config::default_triggers()).unwrap(),
        )
    }

    #[test]
    fn scout_with_hot_leads_dispatches_reach() {
        let dispatch = builtin()
            .evaluate(&event("scout.completed", json!({ "hotCount": 3 })))
            .unwrap();
        assert_eq!(dispatch.target_agent_id, "reach-3");
        assert_eq!(dispatch.priority, Priority::High);
        assert_eq!(dispatch.input["hotCount"], 3);
    }

    #[test]
    fn scout_without_hot_leads_dispatches_nothing() {
        assert!(builtin()
            .evaluate(&event("scout.completed", json!({ "hotCount": 0 })))
            .is_none());
    }

    #[test]
    fn unruled_event_type_dispatches_nothing() {
        assert!(builtin()
            .evaluate(&event("reach-3.completed", json!({ "success": true })))
            .is_none());
    }

    #[test]
    fn malformed_payload_is_no_match() {
        let eval = builtin();
        assert!(eval
            .evaluate(&event("health.at-risk", json!({ "riskScore": "very" })))
            .is_none());
        assert!(eval
            .evaluate(&event("competitor.changed", json!({ "changeType": null })))
            .is_none());
    }

    #[test]
    fn unconditional_and_urgent_rules() {
        let eval = builtin();
        let d = eval.evaluate(&event("prospect.hot", json!({}))).unwrap();
        assert!(d.is_urgent());
        assert_eq!(d.target_agent_id, "reach-3");

        let d = eval
            .evaluate(&event("competitor.changed", json!({ "changeType": "pricing" })))
            .unwrap();
        assert_eq!(d.target_agent_id, "intel-9");

        let d = eval.evaluate(&event("blog.published", json!({}))).unwrap();
        assert_eq!(d.priority, Priority::Normal);
    }

    #[test]
    fn code_predicate_rule() {
        let rule = TriggerRule::new(
            "scout.completed",
            Predicate::func(|p| p.get("hotCount").and_then(|v| v.as_u64()).unwrap_or(0) >= 2),
            "reach-3",
            Priority::Urgent,
        );
        let eval = TriggerEvaluator::new(RuleTable::new([rule]));
        let d = eval
            .evaluate(&event("scout.completed", json!({ "hotCount": 3 })))
            .unwrap();
        assert!(d.is_urgent());
        assert!(eval
            .evaluate(&event("scout.completed", json!({ "hotCount": 1 })))
            .is_none());
    }

    #[test]
    fn first_rule_for_an_event_type_wins() {
        let table = RuleTable::new([
            TriggerRule::new("blog.published", Predicate::always(), "ghost-9", Priority::Normal),
            TriggerRule::new("blog.published", Predicate::always(), "intel-9", Priority::Urgent),
        ]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("blog.published").unwrap().target_agent_id, "ghost-9");
    }

    #[test]
    fn delay_is_carried_from_config() {
        let mut config = agentrelay_config::default_triggers();
        config[1].delay_secs = 600;
        let table = RuleTable::from_config(&config).unwrap();
        let d = TriggerEvaluator::new(table)
            .evaluate(&event("blog.published", json!({})))
            .unwrap();
        assert_eq!(d.delay, Duration::from_secs(600));
    }

    #[test]
    fn bad_condition_is_a_startup_error() {
        let mut config = agentrelay_config::default_triggers();
        config[0].condition = "hotCount >=".into();
        let err = RuleTable::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("scout.completed"));
    }

    #[test]
    fn rules_are_listed_sorted() {
        let table = RuleTable::from_config(&agentrelay_config::default_triggers()).unwrap();
        let types: Vec<&str> = table.rules().iter().map(|r| r.event_type.as_str()).collect();
        assert_eq!(
            types,
            vec![
                "blog.published",
                "competitor.changed",
                "health.at-risk",
                "prospect.hot",
                "scout.completed"
            ]
        );
    }
}
