//! Running one agent end to end.

use agentrelay_core::{
    AgentConfig, AnalyticsRecord, Error, Event, ExecutionContext, FailureRecord, Payload, Result,
    RunResult, RunSummary, StepTiming,
};
use chrono::Utc;
use serde_json::json;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::Orchestrator;

/// How to run an agent.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Run even if the agent is disabled
    pub force: bool,

    /// Load the agent and return its workflow without executing it
    pub dry_run: bool,

    /// Emit `<agent>.completed` on success, which may trigger other agents
    pub emit_events: bool,

    /// Handed to the workflow as `ctx.input`
    pub input: Payload,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            force: false,
            dry_run: false,
            emit_events: true,
            input: Payload::new(),
        }
    }
}

impl RunOptions {
    pub fn with_input(input: Payload) -> Self {
        Self {
            input,
            ..Self::default()
        }
    }
}

/// What `run_agent` produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub agent: AgentConfig,
    pub summary: RunSummary,
    /// `None` for a dry run
    pub result: Option<RunResult>,
    /// The completion event, when one was emitted
    pub completion: Option<Event>,
}

impl RunReport {
    pub fn is_dry_run(&self) -> bool {
        self.result.is_none()
    }
}

impl Orchestrator {
    /// Load an agent, run its workflow under its deadline, and record the outcome.
    ///
    /// A successful run emits `<agent>.completed` (unless disabled) and saves
    /// an analytics record. A failed or timed-out run saves a failure record
    /// and returns the error; no completion event is emitted for it.
    pub async fn run_agent(&self, agent_id: &str, options: RunOptions) -> Result<RunReport> {
        let agent = self.agents.load(agent_id)?;
        info!(agent_id = %agent.id, name = %agent.name, model = %agent.model, "Loaded agent");

        if !agent.enabled && !options.force {
            return Err(Error::AgentDisabled(agent.id));
        }

        if options.dry_run {
            info!(agent_id = %agent.id, steps = agent.workflow.len(), "Dry run, not executing");
            return Ok(RunReport {
                summary: RunSummary {
                    agent_id: agent.id.clone(),
                    success: true,
                    steps: agent.workflow.len(),
                    duration_ms: 0,
                },
                agent,
                result: None,
                completion: None,
            });
        }

        let started = Instant::now();
        if !agent.skills.is_empty() {
            let loaded = self.skills.preload(&agent.skills).await;
            info!(agent_id = %agent.id, loaded = loaded.len(), requested = agent.skills.len(), "Preloaded skills");
        }

        let mut ctx = ExecutionContext::new(agent.id.clone(), options.input);
        let timeout_secs = agent
            .timeout
            .unwrap_or(self.config.workflow.default_timeout_secs);

        let outcome = match tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            self.executor.run(&agent.workflow, &mut ctx),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(Error::Timeout {
                agent_id: agent.id.clone(),
                timeout_secs,
            }),
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                error!(agent_id = %agent.id, error = %e, "Workflow failed");
                self.record_failure(&agent, &ctx, &e).await;
                return Err(e);
            }
        };

        info!(agent_id = %agent.id, steps = result.steps_total, duration_ms, "Workflow completed");
        let summary = RunSummary {
            agent_id: agent.id.clone(),
            success: result.success,
            steps: result.steps_total,
            duration_ms,
        };

        let completion = if options.emit_events {
            let payload = completion_payload(&summary, &result);
            match self.emit(&Event::completion_type(&agent.id), payload).await {
                Ok(emitted) => Some(emitted.event),
                Err(e) => {
                    warn!(agent_id = %agent.id, error = %e, "Failed to emit completion event");
                    None
                }
            }
        } else {
            None
        };

        self.record_success(&agent, &summary, &result).await;

        Ok(RunReport {
            agent,
            summary,
            result: Some(result),
            completion,
        })
    }

    async fn record_success(&self, agent: &AgentConfig, summary: &RunSummary, result: &RunResult) {
        let record = AnalyticsRecord {
            agent_id: agent.id.clone(),
            agent_name: agent.name.clone(),
            timestamp: Utc::now(),
            duration_ms: summary.duration_ms,
            success: result.success,
            steps: result.steps_total,
            step_results: result
                .executed
                .iter()
                .map(|s| StepTiming {
                    action: s.action.clone(),
                    status: s.status,
                    duration_ms: s.duration_ms,
                })
                .collect(),
            skills_used: result.context.skills.clone(),
            output_path: result.context.records.clone(),
        };
        if let Err(e) = self.runs.save_analytics(&record).await {
            warn!(agent_id = %agent.id, error = %e, "Failed to save analytics");
        }
    }

    async fn record_failure(&self, agent: &AgentConfig, ctx: &ExecutionContext, err: &Error) {
        let record = FailureRecord {
            agent_id: agent.id.clone(),
            timestamp: Utc::now(),
            error: err.to_string(),
            steps_executed: ctx.steps_executed.clone(),
            skills: ctx.skill_names(),
        };
        if let Err(e) = self.runs.save_failure(&record).await {
            warn!(agent_id = %agent.id, error = %e, "Failed to save failure record");
        }
    }
}

/// Payload of `<agent>.completed`.
fn completion_payload(summary: &RunSummary, result: &RunResult) -> Payload {
    let value = json!({
        "agent": summary.agent_id,
        "success": summary.success,
        "steps": summary.steps,
        "duration": summary.duration_ms,
        "records": result.context.records,
        "hotCount": result.level_count("hot"),
        "warmCount": result.level_count("warm"),
        "outputPath": result.context.records,
    });
    match value {
        serde_json::Value::Object(map) => map,
        _ => Payload::new(),
    }
}
