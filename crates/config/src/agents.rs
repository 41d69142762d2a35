//! Agent profile loading from `<agents_dir>/<id>/agent.json`.

use agentrelay_core::AgentConfig;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::ConfigError;

const REQUIRED_FIELDS: &[&str] = &["id", "name", "model", "workflow"];

/// Listing entry for `agentrelay agents`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentSummary {
    pub id: String,
    pub name: String,
    pub enabled: bool,
    pub schedule: String,
}

/// Reads and validates agent profiles.
#[derive(Debug, Clone)]
pub struct AgentLoader {
    root: PathBuf,
}

impl AgentLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of one agent.
    pub fn agent_dir(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }

    /// Load one agent profile.
    pub fn load(&self, id: &str) -> Result<AgentConfig, ConfigError> {
        let path = self.agent_dir(id).join("agent.json");
        let content = std::fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::AgentNotFound(id.to_string())
            } else {
                ConfigError::InvalidAgent {
                    id: id.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let raw: serde_json::Value =
            serde_json::from_str(&content).map_err(|e| ConfigError::InvalidAgent {
                id: id.to_string(),
                reason: e.to_string(),
            })?;

        let missing: Vec<&str> = REQUIRED_FIELDS
            .iter()
            .copied()
            .filter(|field| is_blank(raw.get(*field)))
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::InvalidAgent {
                id: id.to_string(),
                reason: format!("missing required fields: {}", missing.join(", ")),
            });
        }

        serde_json::from_value(raw).map_err(|e| ConfigError::InvalidAgent {
            id: id.to_string(),
            reason: e.to_string(),
        })
    }

    /// All loadable agents, sorted by id. Invalid profiles are skipped.
    pub fn list(&self) -> Vec<AgentSummary> {
        let Ok(entries) = std::fs::read_dir(&self.root) else {
            return Vec::new();
        };

        let mut agents: Vec<AgentSummary> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| !name.starts_with('.'))
            .filter_map(|name| match self.load(&name) {
                Ok(agent) => Some(AgentSummary {
                    id: agent.id,
                    name: agent.name,
                    enabled: agent.enabled,
                    schedule: agent.schedule.unwrap_or_else(|| "manual".into()),
                }),
                Err(e) => {
                    tracing::debug!(agent = %name, error = %e, "Skipping invalid agent");
                    None
                }
            })
            .collect();
        agents.sort_by(|a, b| a.id.cmp(&b.id));
        agents
    }
}

fn is_blank(value: Option<&serde_json::Value>) -> bool {
    match value {
        None | Some(serde_json::Value::Null) | Some(serde_json::Value::Bool(false)) => true,
        Some(serde_json::Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}
