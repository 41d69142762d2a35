//! `llm_generate`: placeholder text generation.
//!
//! No model is called yet. The handler builds the skill-augmented prompt and
//! records which model would have served it.

use agentrelay_core::error::StepError;
use agentrelay_core::{ExecutionContext, StepAction, StepHandler, StepOutput, WorkflowStep};
use agentrelay_skills::inject_context;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tracing::info;

pub struct LlmGenerateHandler;

#[async_trait]
impl StepHandler for LlmGenerateHandler {
    fn action(&self) -> &str {
        "llm_generate"
    }

    async fn execute(
        &self,
        step: &WorkflowStep,
        ctx: &mut ExecutionContext,
    ) -> Result<StepOutput, StepError> {
        let StepAction::LlmGenerate {
            prompt,
            model,
            max_tokens,
        } = &step.action
        else {
            return Err(crate::mismatched(self.action()));
        };

        let full_prompt = inject_context(prompt, ctx.skills.values());
        let preview: String = prompt.chars().take(50).collect();
        info!(agent_id = %ctx.agent_id, %model, max_tokens, prompt = %preview, "LLM generate");

        let output = json!({
            "generated": true,
            "model": model,
            "maxTokens": max_tokens,
            "promptChars": full_prompt.chars().count(),
            "timestamp": Utc::now(),
        });
        ctx.llm_output = Some(output.clone());
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentrelay_core::{Payload, Skill};
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn records_model_and_prompt_size() {
        let mut ctx = ExecutionContext::new("ghost-9", Payload::new());
        ctx.skills.insert(
            "writing".into(),
            Skill::loaded("writing", "Be brief.".into(), None, BTreeMap::new(), "Be brief.".into()),
        );
        let step = WorkflowStep::new(StepAction::LlmGenerate {
            prompt: "Write a post".into(),
            model: "kimi".into(),
            max_tokens: 4000,
        });

        let out = LlmGenerateHandler.execute(&step, &mut ctx).await.unwrap();
        assert_eq!(out["generated"], true);
        assert_eq!(out["model"], "kimi");
        let expected = inject_context("Write a post", ctx.skills.values()).chars().count();
        assert_eq!(out["promptChars"], expected);
        assert!(expected > "Write a post".len());
        assert_eq!(ctx.llm_output, Some(out));
    }
}
