//! Agent configuration and workflow step types.
//!
//! An agent is a named task profile whose workflow is an ordered list of
//! typed steps. Known actions deserialize into dedicated variants; anything
//! else is kept as [`StepAction::Extension`] so externally authored
//! workflows never fail to load just because they name a newer action.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An agent profile, as read from `agents/<id>/agent.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub id: String,

    pub name: String,

    pub model: String,

    #[serde(default)]
    pub enabled: bool,

    /// Cron-style schedule hint; `None` means manual
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,

    /// Skills preloaded before the workflow starts
    #[serde(default)]
    pub skills: Vec<String>,

    pub workflow: Vec<WorkflowStep>,

    /// Advisory run deadline in seconds, enforced by the caller of the executor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

/// One step of a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawStep", into = "RawStep")]
pub struct WorkflowStep {
    pub action: StepAction,

    /// Continue with the next step when this one fails
    pub allow_failure: bool,
}

impl WorkflowStep {
    pub fn new(action: StepAction) -> Self {
        Self {
            action,
            allow_failure: false,
        }
    }

    pub fn allowing_failure(mut self) -> Self {
        self.allow_failure = true;
        self
    }

    /// The action name used for handler lookup.
    pub fn action_name(&self) -> &str {
        self.action.name()
    }
}

/// Output format of a `fetch` step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchFormat {
    #[default]
    Text,
    Json,
}

/// The typed action of a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StepAction {
    /// Load a skill document into the context
    LoadSkill { skill: String },

    /// Query one or more sources and store raw results
    Search {
        #[serde(default)]
        sources: Vec<String>,
        #[serde(default)]
        queries: String,
    },

    /// HTTP GET a URL
    Fetch {
        url: String,
        #[serde(default)]
        headers: HashMap<String, String>,
        #[serde(default)]
        format: FetchFormat,
    },

    /// Score search results into levels
    Score {
        #[serde(default)]
        method: String,
        #[serde(default)]
        output: Vec<String>,
    },

    /// Add fields to hot and warm results
    Enrich {
        #[serde(default)]
        find: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        persona: Option<String>,
    },

    /// Persist the best available result set
    Save { path: String },

    /// Summarize results into the context report
    Report {
        #[serde(default)]
        summary: Vec<String>,
    },

    /// Generate text with a language model
    LlmGenerate {
        prompt: String,
        #[serde(default = "default_llm_model")]
        model: String,
        #[serde(default = "default_max_tokens", rename = "maxTokens")]
        max_tokens: u32,
    },

    /// Any action without a built-in variant
    #[serde(skip)]
    Extension {
        action: String,
        fields: serde_json::Map<String, serde_json::Value>,
    },
}

fn default_llm_model() -> String {
    "kimi".into()
}
fn default_max_tokens() -> u32 {
    4000
}

const BUILTIN_ACTIONS: &[&str] = &[
    "load_skill",
    "search",
    "fetch",
    "score",
    "enrich",
    "save",
    "report",
    "llm_generate",
];

impl StepAction {
    pub fn name(&self) -> &str {
        match self {
            StepAction::LoadSkill { .. } => "load_skill",
            StepAction::Search { .. } => "search",
            StepAction::Fetch { .. } => "fetch",
            StepAction::Score { .. } => "score",
            StepAction::Enrich { .. } => "enrich",
            StepAction::Save { .. } => "save",
            StepAction::Report { .. } => "report",
            StepAction::LlmGenerate { .. } => "llm_generate",
            StepAction::Extension { action, .. } => action,
        }
    }

    pub fn is_builtin_name(name: &str) -> bool {
        BUILTIN_ACTIONS.contains(&name)
    }
}

/// Wire form of a step: `{ "action": ..., "allowFailure": bool, ...fields }`.
#[derive(Serialize, Deserialize)]
struct RawStep {
    action: String,
    #[serde(default, rename = "allowFailure")]
    allow_failure: bool,
    #[serde(flatten)]
    fields: serde_json::Map<String, serde_json::Value>,
}

impl TryFrom<RawStep> for WorkflowStep {
    type Error = String;

    fn try_from(raw: RawStep) -> Result<Self, Self::Error> {
        let action = if StepAction::is_builtin_name(&raw.action) {
            let mut object = raw.fields;
            object.insert("action".into(), serde_json::Value::String(raw.action.clone()));
            serde_json::from_value(serde_json::Value::Object(object))
                .map_err(|e| format!("invalid '{}' step: {e}", raw.action))?
        } else {
            StepAction::Extension {
                action: raw.action,
                fields: raw.fields,
            }
        };
        Ok(WorkflowStep {
            action,
            allow_failure: raw.allow_failure,
        })
    }
}

impl From<WorkflowStep> for RawStep {
    fn from(step: WorkflowStep) -> Self {
        let allow_failure = step.allow_failure;
        match step.action {
            StepAction::Extension { action, fields } => RawStep {
                action,
                allow_failure,
                fields,
            },
            known => {
                let mut fields = match serde_json::to_value(&known) {
                    Ok(serde_json::Value::Object(map)) => map,
                    _ => serde_json::Map::new(),
                };
                let action = match fields.remove("action") {
                    Some(serde_json::Value::String(name)) => name,
                    _ => known.name().to_string(),
                };
                RawStep {
                    action,
                    allow_failure,
                    fields,
                }
            }
        }
    }
}
