//! `load_skill`: pull a skill document into the run's context.

use agentrelay_core::error::StepError;
use agentrelay_core::{ExecutionContext, StepAction, StepHandler, StepOutput, WorkflowStep};
use agentrelay_skills::SkillCache;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

pub struct LoadSkillHandler {
    skills: Arc<SkillCache>,
}

impl LoadSkillHandler {
    pub fn new(skills: Arc<SkillCache>) -> Self {
        Self { skills }
    }
}

#[async_trait]
impl StepHandler for LoadSkillHandler {
    fn action(&self) -> &str {
        "load_skill"
    }

    async fn execute(
        &self,
        step: &WorkflowStep,
        ctx: &mut ExecutionContext,
    ) -> Result<StepOutput, StepError> {
        let StepAction::LoadSkill { skill } = &step.action else {
            return Err(crate::mismatched(self.action()));
        };

        let loaded = self.skills.get(skill).await;
        if !loaded.loaded {
            return Err(StepError::SkillNotLoaded(skill.clone()));
        }

        ctx.skills.insert(skill.clone(), (*loaded).clone());
        info!(agent_id = %ctx.agent_id, skill = %skill, "Loaded skill");
        Ok(json!({ "skill": skill, "status": "loaded" }))
    }
}
