//! Step handlers: the pluggable implementations of workflow actions.
//!
//! Handlers are registered by action name at startup. The executor looks a
//! step's action up in the [`StepRegistry`] and hands it the step plus the
//! run's [`ExecutionContext`].

use async_trait::async_trait;
use std::collections::HashMap;

use crate::agent::WorkflowStep;
use crate::context::ExecutionContext;
use crate::error::StepError;

/// Structured output of one successful step.
pub type StepOutput = serde_json::Value;

/// The core StepHandler trait.
///
/// A handler may read and write any part of the context; later steps
/// consume what earlier steps wrote.
#[async_trait]
pub trait StepHandler: Send + Sync {
    /// The action name this handler serves (e.g., "search", "score").
    fn action(&self) -> &str;

    /// Execute one step against the run's context.
    async fn execute(
        &self,
        step: &WorkflowStep,
        ctx: &mut ExecutionContext,
    ) -> std::result::Result<StepOutput, StepError>;
}

/// A registry of step handlers keyed by action name.
pub struct StepRegistry {
    handlers: HashMap<String, Box<dyn StepHandler>>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler. Replaces any existing handler for the same action.
    pub fn register(&mut self, handler: Box<dyn StepHandler>) {
        let action = handler.action().to_string();
        self.handlers.insert(action, handler);
    }

    /// Get a handler by action name.
    pub fn get(&self, action: &str) -> Option<&dyn StepHandler> {
        self.handlers.get(action).map(|h| h.as_ref())
    }

    pub fn contains(&self, action: &str) -> bool {
        self.handlers.contains_key(action)
    }

    /// List all registered action names, sorted.
    pub fn actions(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl Default for StepRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::StepAction;
    use crate::event::Payload;

    /// A handler that records the input it saw.
    struct EchoHandler;

    #[async_trait]
    impl StepHandler for EchoHandler {
        fn action(&self) -> &str {
            "echo"
        }

        async fn execute(
            &self,
            _step: &WorkflowStep,
            ctx: &mut ExecutionContext,
        ) -> std::result::Result<StepOutput, StepError> {
            ctx.extensions
                .insert("echoed".into(), serde_json::Value::Bool(true));
            Ok(serde_json::json!({ "agent": ctx.agent_id }))
        }
    }

    #[test]
    fn registry_register_and_lookup() {
        let mut registry = StepRegistry::new();
        registry.register(Box::new(EchoHandler));
        assert!(registry.get("echo").is_some());
        assert!(registry.get("nonexistent").is_none());
        assert_eq!(registry.actions(), vec!["echo"]);
    }

    #[tokio::test]
    async fn handler_writes_context() {
        let mut registry = StepRegistry::new();
        registry.register(Box::new(EchoHandler));

        let step = WorkflowStep::new(StepAction::Extension {
            action: "echo".into(),
            fields: serde_json::Map::new(),
        });
        let mut ctx = ExecutionContext::new("scout-alpha", Payload::new());
        let out = registry
            .get("echo")
            .unwrap()
            .execute(&step, &mut ctx)
            .await
            .unwrap();
        assert_eq!(out["agent"], "scout-alpha");
        assert_eq!(ctx.extensions["echoed"], true);
    }
}
