//! Configuration loading, validation, and management for AgentRelay.
//!
//! Loads configuration from `~/.agentrelay/config.toml` (or
//! `$AGENTRELAY_HOME/config.toml`) with environment variable overrides.
//! Validates all settings at startup.

use agentrelay_core::Priority;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub mod agents;

pub use agents::{AgentLoader, AgentSummary};

/// Longest hold a trigger may put on an invocation (30 days).
pub const MAX_TRIGGER_DELAY_SECS: u64 = 30 * 24 * 60 * 60;

/// The root configuration structure.
///
/// Maps directly to `~/.agentrelay/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Storage and lookup locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Backlog dispatch settings
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Workflow execution settings
    #[serde(default)]
    pub workflow: WorkflowConfig,

    /// Event store settings
    #[serde(default)]
    pub events: EventsConfig,

    /// Trigger rules, at most one per event type
    #[serde(default = "default_triggers")]
    pub triggers: Vec<TriggerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root of the day-partitioned event, schedule, and run-record stores
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory holding `<agent-id>/agent.json`
    #[serde(default = "default_agents_dir")]
    pub agents_dir: PathBuf,

    /// Directory holding `<skill-name>/SKILL.md`
    #[serde(default = "default_skills_dir")]
    pub skills_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    AppConfig::config_dir().join("data")
}
fn default_agents_dir() -> PathBuf {
    AppConfig::config_dir().join("agents")
}
fn default_skills_dir() -> PathBuf {
    AppConfig::config_dir().join("skills")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            agents_dir: default_agents_dir(),
            skills_dir: default_skills_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// How many pending invocations one drain dispatches
    #[serde(default = "default_drain_limit")]
    pub drain_limit: usize,
}

fn default_drain_limit() -> usize {
    5
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            drain_limit: default_drain_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Deadline for agents that don't set their own `timeout`
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,

    /// Base directory for relative `save` step paths (default: working directory)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_root: Option<PathBuf>,
}

fn default_timeout_secs() -> u64 {
    300
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: default_timeout_secs(),
            save_root: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Window used by `events` when no `--hours` is given
    #[serde(default = "default_window_hours")]
    pub default_window_hours: u64,

    /// Capacity of the in-process event broadcast channel
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,
}

fn default_window_hours() -> u64 {
    24
}
fn default_bus_capacity() -> usize {
    256
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            default_window_hours: default_window_hours(),
            bus_capacity: default_bus_capacity(),
        }
    }
}

/// One trigger rule: when `event_type` is seen and `condition` holds,
/// schedule `target` with `priority`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerConfig {
    pub event_type: String,

    /// Predicate over the payload (e.g. `hotCount >= 2`); empty = always
    #[serde(default)]
    pub condition: String,

    /// Agent to schedule
    pub target: String,

    #[serde(default)]
    pub priority: Priority,

    /// Seconds to hold the invocation back before it becomes due
    #[serde(default)]
    pub delay_secs: u64,
}

impl TriggerConfig {
    fn new(event_type: &str, condition: &str, target: &str, priority: Priority) -> Self {
        Self {
            event_type: event_type.into(),
            condition: condition.into(),
            target: target.into(),
            priority,
            delay_secs: 0,
        }
    }
}

/// The built-in rule table used when no `[[triggers]]` are configured.
pub fn default_triggers() -> Vec<TriggerConfig> {
    vec![
        TriggerConfig::new("scout.completed", "hotCount >= 2", "reach-3", Priority::High),
        TriggerConfig::new("blog.published", "", "ghost-9", Priority::Normal),
        TriggerConfig::new("prospect.hot", "", "reach-3", Priority::Urgent),
        TriggerConfig::new(
            "competitor.changed",
            r#"changeType == "pricing""#,
            "intel-9",
            Priority::Urgent,
        ),
        TriggerConfig::new("health.at-risk", "riskScore > 70", "health-5", Priority::Urgent),
    ]
}

impl AppConfig {
    /// Load configuration from the default path (`<config_dir>/config.toml`).
    ///
    /// Environment overrides (highest priority):
    /// - `AGENTRELAY_DATA_DIR`
    /// - `AGENTRELAY_DRAIN_LIMIT`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in `load`).
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(dir) = lookup("AGENTRELAY_DATA_DIR") {
            self.paths.data_dir = PathBuf::from(dir);
        }

        if let Some(limit) = lookup("AGENTRELAY_DRAIN_LIMIT") {
            self.scheduler.drain_limit = limit.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "AGENTRELAY_DRAIN_LIMIT must be a positive integer, got '{limit}'"
                ))
            })?;
        }

        self.validate()
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        std::env::var("AGENTRELAY_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| dirs_home().join(".agentrelay"))
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler.drain_limit == 0 {
            return Err(ConfigError::ValidationError(
                "scheduler.drain_limit must be greater than 0".into(),
            ));
        }

        let mut seen = HashSet::new();
        for trigger in &self.triggers {
            if trigger.event_type.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "trigger event_type cannot be empty".into(),
                ));
            }
            if trigger.target.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "trigger for '{}' has no target agent",
                    trigger.event_type
                )));
            }
            if trigger.delay_secs > MAX_TRIGGER_DELAY_SECS {
                return Err(ConfigError::ValidationError(format!(
                    "trigger for '{}' has delay_secs {} (max {MAX_TRIGGER_DELAY_SECS})",
                    trigger.event_type, trigger.delay_secs
                )));
            }
            if !seen.insert(trigger.event_type.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate trigger for event type '{}'",
                    trigger.event_type
                )));
            }
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            scheduler: SchedulerConfig::default(),
            workflow: WorkflowConfig::default(),
            events: EventsConfig::default(),
            triggers: default_triggers(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error("Failed to load agent {id}: {reason}")]
    InvalidAgent { id: String, reason: String },
}

impl From<ConfigError> for agentrelay_core::Error {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::AgentNotFound(id) => agentrelay_core::Error::AgentNotFound(id),
            other => agentrelay_core::Error::Config {
                message: other.to_string(),
            },
        }
    }
}
