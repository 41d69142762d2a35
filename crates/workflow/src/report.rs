//! `report`: summarize ranked results into `ctx.report`.

use agentrelay_core::error::StepError;
use agentrelay_core::{ExecutionContext, StepAction, StepHandler, StepOutput, WorkflowStep};
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tracing::{info, warn};

/// Supported keys: `<level>_count` and `sample_emails`.
pub struct ReportHandler;

#[async_trait]
impl StepHandler for ReportHandler {
    fn action(&self) -> &str {
        "report"
    }

    async fn execute(
        &self,
        step: &WorkflowStep,
        ctx: &mut ExecutionContext,
    ) -> Result<StepOutput, StepError> {
        let StepAction::Report { summary } = &step.action else {
            return Err(crate::mismatched(self.action()));
        };

        let results = ctx.ranked_results();
        let mut report = Map::new();
        for key in summary {
            if let Some(level) = key.strip_suffix("_count") {
                let n = results
                    .iter()
                    .filter(|r| r["level"].as_str() == Some(level))
                    .count();
                report.insert(key.clone(), json!(n));
            } else if key == "sample_emails" {
                let samples: Vec<Value> = results
                    .iter()
                    .take(3)
                    .map(|r| r.get("email_draft").cloned().unwrap_or(Value::Null))
                    .collect();
                report.insert(key.clone(), Value::Array(samples));
            } else {
                warn!(key = %key, "Unsupported report key");
            }
        }

        let report = Value::Object(report);
        info!(agent_id = %ctx.agent_id, report = %report, "Report");
        ctx.report = Some(report.clone());
        Ok(report)
    }
}
