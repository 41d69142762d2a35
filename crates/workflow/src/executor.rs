//! The workflow executor: a strict left-to-right walk over an agent's steps.

use agentrelay_core::run::RunContextSummary;
use agentrelay_core::{
    Error, ExecutionContext, Result, RunResult, StepRecord, StepRegistry, WorkflowStep,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Runs workflows against a fixed handler table.
///
/// The executor enforces per-step failure policy only. It does not retry,
/// roll back earlier steps, or impose a deadline; callers wrap it for that.
#[derive(Clone)]
pub struct WorkflowExecutor {
    registry: Arc<StepRegistry>,
}

impl WorkflowExecutor {
    pub fn new(registry: Arc<StepRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &StepRegistry {
        &self.registry
    }

    /// Execute `steps` in order against `ctx`.
    ///
    /// On success returns the [`RunResult`]. When a step without
    /// `allow_failure` fails, the run stops there and
    /// [`Error::WorkflowAborted`] is returned; `ctx.steps_executed` still holds
    /// the audit trail up to and including the failed step.
    pub async fn run(
        &self,
        steps: &[WorkflowStep],
        ctx: &mut ExecutionContext,
    ) -> Result<RunResult> {
        ctx.steps_executed.clear();
        let total = steps.len();
        let mut results = Vec::new();

        for (i, step) in steps.iter().enumerate() {
            let step_num = i + 1;
            let action = step.action_name();
            info!(agent_id = %ctx.agent_id, step = step_num, total, %action, "Running step");

            let Some(handler) = self.registry.get(action) else {
                warn!(agent_id = %ctx.agent_id, step = step_num, %action, "Unknown action, skipping step");
                continue;
            };

            let started = Instant::now();
            let outcome = handler.execute(step, ctx).await;
            let duration_ms = started.elapsed().as_millis() as u64;

            match outcome {
                Ok(output) => {
                    ctx.steps_executed
                        .push(StepRecord::success(step_num, action, duration_ms, output.clone()));
                    results.push(output);
                }
                Err(e) => {
                    error!(agent_id = %ctx.agent_id, step = step_num, %action, error = %e, "Step failed");
                    ctx.steps_executed
                        .push(StepRecord::failed(step_num, action, duration_ms, e.to_string()));
                    if !step.allow_failure {
                        return Err(Error::WorkflowAborted {
                            step: step_num,
                            action: action.to_string(),
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }

        Ok(RunResult {
            success: true,
            steps_total: total,
            executed: ctx.steps_executed.clone(),
            results,
            context: RunContextSummary {
                skills: ctx.skill_names(),
                records: ctx.saved_path.clone(),
            },
        })
    }
}
