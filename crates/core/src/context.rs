//! Execution context: the mutable scratch state of one workflow run.
//!
//! Steps chain through this struct: `search` fills `search_results`, `score`
//! reads them and fills `scored_results`, `enrich` narrows those into
//! `enriched_results`, and `save`/`report` consume whichever is furthest
//! along. A context is owned by exactly one run.

use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::event::Payload;
use crate::run::StepRecord;
use crate::skill::Skill;

#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    pub agent_id: String,

    /// Input handed in by the trigger or the caller
    pub input: Payload,

    /// Skills loaded during this run, by name
    pub skills: BTreeMap<String, Skill>,

    pub search_results: Option<Vec<Value>>,

    pub fetched_data: Option<Value>,

    pub scored_results: Option<Vec<Value>>,

    pub enriched_results: Option<Vec<Value>>,

    pub report: Option<Value>,

    pub llm_output: Option<Value>,

    /// Audit log, appended by the executor
    pub steps_executed: Vec<StepRecord>,

    /// Where the `save` step wrote its records
    pub saved_path: Option<PathBuf>,

    /// Scratch space for extension handlers
    pub extensions: serde_json::Map<String, Value>,
}

impl ExecutionContext {
    pub fn new(agent_id: impl Into<String>, input: Payload) -> Self {
        Self {
            agent_id: agent_id.into(),
            input,
            ..Self::default()
        }
    }

    /// The furthest-processed result set: enriched, else scored, else raw.
    pub fn best_results(&self) -> &[Value] {
        self.enriched_results
            .as_deref()
            .or(self.scored_results.as_deref())
            .or(self.search_results.as_deref())
            .unwrap_or(&[])
    }

    /// Enriched results if present, else scored results.
    pub fn ranked_results(&self) -> &[Value] {
        self.enriched_results
            .as_deref()
            .or(self.scored_results.as_deref())
            .unwrap_or(&[])
    }

    pub fn skill_names(&self) -> Vec<String> {
        self.skills.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn best_results_prefers_most_processed() {
        let mut ctx = ExecutionContext::new("scout-alpha", Payload::new());
        assert!(ctx.best_results().is_empty());

        ctx.search_results = Some(vec![json!({"title": "a"}), json!({"title": "b"})]);
        assert_eq!(ctx.best_results().len(), 2);
        assert!(ctx.ranked_results().is_empty());

        ctx.scored_results = Some(vec![json!({"title": "a", "level": "hot"})]);
        assert_eq!(ctx.best_results().len(), 1);

        ctx.enriched_results = Some(vec![]);
        assert!(ctx.best_results().is_empty());
    }
}
