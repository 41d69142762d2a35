//! Run results and the audit records persisted after each run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::step::StepOutput;

/// Outcome of one attempted step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Success,
    Failed,
}

/// Audit log entry for one attempted step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// 1-based step index
    pub step: usize,

    pub action: String,

    pub status: StepStatus,

    /// Handler wall time in milliseconds
    #[serde(rename = "duration")]
    pub duration_ms: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<StepOutput>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepRecord {
    pub fn success(step: usize, action: &str, duration_ms: u64, result: StepOutput) -> Self {
        Self {
            step,
            action: action.to_string(),
            status: StepStatus::Success,
            duration_ms,
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(step: usize, action: &str, duration_ms: u64, error: String) -> Self {
        Self {
            step,
            action: action.to_string(),
            status: StepStatus::Failed,
            duration_ms,
            result: None,
            error: Some(error),
        }
    }
}

/// Context summary carried on a [`RunResult`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunContextSummary {
    /// Names of skills present in the context
    pub skills: Vec<String>,

    /// Where the `save` step wrote its records, if it ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub records: Option<PathBuf>,
}

/// The structured result of one workflow execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub success: bool,

    /// Number of steps in the workflow
    pub steps_total: usize,

    /// One entry per attempted step, in step order
    pub executed: Vec<StepRecord>,

    /// Outputs of the steps that succeeded, in step order
    pub results: Vec<StepOutput>,

    pub context: RunContextSummary,
}

impl RunResult {
    /// The first step output carrying a `counts` object.
    pub fn counts(&self) -> Option<&serde_json::Map<String, serde_json::Value>> {
        self.results
            .iter()
            .find_map(|r| r.get("counts").and_then(|c| c.as_object()))
    }

    /// Count for one level (e.g. `hot`) from [`RunResult::counts`], or 0.
    pub fn level_count(&self, level: &str) -> u64 {
        self.counts()
            .and_then(|c| c.get(level))
            .and_then(|v| v.as_u64())
            .unwrap_or(0)
    }
}

/// What a launcher reports back after running an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub agent_id: String,
    pub success: bool,
    pub steps: usize,
    pub duration_ms: u64,
}

/// Per-step timing kept in analytics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepTiming {
    pub action: String,
    pub status: StepStatus,
    #[serde(rename = "duration")]
    pub duration_ms: u64,
}

/// Persisted after every successful run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsRecord {
    #[serde(rename = "agent")]
    pub agent_id: String,
    pub agent_name: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "duration")]
    pub duration_ms: u64,
    pub success: bool,
    pub steps: usize,
    pub step_results: Vec<StepTiming>,
    pub skills_used: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
}

/// Persisted when a started workflow aborts or times out.
///
/// An agent that cannot be loaded or is disabled never starts, so its error
/// goes back to the caller without a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureRecord {
    #[serde(rename = "agent")]
    pub agent_id: String,
    pub timestamp: DateTime<Utc>,
    pub error: String,
    pub steps_executed: Vec<StepRecord>,
    pub skills: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_count_reads_first_counts_output() {
        let result = RunResult {
            success: true,
            steps_total: 2,
            executed: vec![],
            results: vec![
                serde_json::json!({ "count": 12 }),
                serde_json::json!({ "total": 12, "counts": { "hot": 3, "warm": 4 } }),
            ],
            context: RunContextSummary::default(),
        };
        assert_eq!(result.level_count("hot"), 3);
        assert_eq!(result.level_count("warm"), 4);
        assert_eq!(result.level_count("cold"), 0);
    }

    #[test]
    fn step_record_wire_names() {
        let rec = StepRecord::failed(2, "search", 15, "timeout".into());
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["duration"], 15);
        assert!(json.get("result").is_none());
    }
}
