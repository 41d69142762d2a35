//! Workflow execution for AgentRelay.
//!
//! [`WorkflowExecutor`] walks an agent's steps against one
//! [`ExecutionContext`](agentrelay_core::ExecutionContext). The handlers in
//! this crate implement the built-in actions; hosts can register more.

pub mod enrich;
pub mod executor;
pub mod fetch;
pub mod llm_generate;
pub mod load_skill;
pub mod report;
pub mod save;
pub mod score;
pub mod search;

pub use executor::WorkflowExecutor;
pub use search::{RedditSource, SearchSource};

use agentrelay_core::StepRegistry;
use agentrelay_core::error::StepError;
use agentrelay_skills::SkillCache;
use std::path::PathBuf;
use std::sync::Arc;

/// Create a registry with every built-in step handler.
///
/// `save_root` anchors relative `save` paths; `None` leaves them relative to
/// the working directory.
pub fn builtin_registry(skills: Arc<SkillCache>, save_root: Option<PathBuf>) -> StepRegistry {
    let mut registry = StepRegistry::new();
    registry.register(Box::new(load_skill::LoadSkillHandler::new(skills.clone())));
    registry.register(Box::new(
        search::SearchHandler::new().with_source(Arc::new(RedditSource::new("smallbusiness"))),
    ));
    registry.register(Box::new(fetch::FetchHandler::new()));
    registry.register(Box::new(score::ScoreHandler));
    registry.register(Box::new(enrich::EnrichHandler));
    registry.register(Box::new(save::SaveHandler::new(save_root)));
    registry.register(Box::new(report::ReportHandler));
    registry.register(Box::new(llm_generate::LlmGenerateHandler));
    registry
}

/// Error for a handler handed a step of another kind.
pub(crate) fn mismatched(action: &str) -> StepError {
    StepError::InvalidStep {
        action: action.to_string(),
        reason: "step does not carry this action's fields".into(),
    }
}
