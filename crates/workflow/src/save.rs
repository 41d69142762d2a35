//! `save`: write the best available result set to disk.

use agentrelay_core::error::StepError;
use agentrelay_core::{
    ExecutionContext, PartitionKey, StepAction, StepHandler, StepOutput, WorkflowStep,
};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::info;

/// Writes `{date, agent, results, metadata}` to the step's `path`.
///
/// `%Y%m%d` in the path becomes today's UTC date. Relative paths resolve
/// against `root` when one is configured.
pub struct SaveHandler {
    root: Option<PathBuf>,
}

impl SaveHandler {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }

    fn resolve(&self, template: &str, today: &PartitionKey) -> PathBuf {
        let path = PathBuf::from(template.replace("%Y%m%d", &today.compact()));
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path,
        }
    }
}

#[async_trait]
impl StepHandler for SaveHandler {
    fn action(&self) -> &str {
        "save"
    }

    async fn execute(
        &self,
        step: &WorkflowStep,
        ctx: &mut ExecutionContext,
    ) -> Result<StepOutput, StepError> {
        let StepAction::Save { path } = &step.action else {
            return Err(crate::mismatched(self.action()));
        };

        let today = PartitionKey::today();
        let full_path = self.resolve(path, &today);
        let results = ctx.best_results();
        let records = results.len();

        let document = json!({
            "date": today.to_string(),
            "agent": ctx.agent_id,
            "results": results,
            "metadata": {
                "executedAt": Utc::now(),
                "steps": ctx.steps_executed,
            },
        });
        let body = serde_json::to_string_pretty(&document).map_err(|e| failed(&full_path, e))?;

        if let Some(parent) = full_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| failed(parent, e))?;
        }
        tokio::fs::write(&full_path, body)
            .await
            .map_err(|e| failed(&full_path, e))?;

        info!(agent_id = %ctx.agent_id, path = %full_path.display(), records, "Saved results");
        ctx.saved_path = Some(full_path.clone());
        Ok(json!({ "path": full_path, "records": records }))
    }
}

fn failed(path: &Path, e: impl std::fmt::Display) -> StepError {
    StepError::ExecutionFailed {
        action: "save".into(),
        reason: format!("{}: {e}", path.display()),
    }
}
