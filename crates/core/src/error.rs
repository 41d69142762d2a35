//! Error types for the AgentRelay domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use crate::invocation::InvocationStatus;
use thiserror::Error;

/// The top-level error type for all AgentRelay operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Storage errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Step errors ---
    #[error("Step error: {0}")]
    Step(#[from] StepError),

    // --- Scheduler errors ---
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error("Agent is disabled: {0} (use --force to run anyway)")]
    AgentDisabled(String),

    // --- Run outcomes ---
    #[error("Workflow aborted at step {step} ({action}): {reason}")]
    WorkflowAborted {
        step: usize,
        action: String,
        reason: String,
    },

    #[error("Agent {agent_id} timed out after {timeout_secs}s")]
    Timeout { agent_id: String, timeout_secs: u64 },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O failure: {0}")]
    Io(String),

    #[error("Failed to (de)serialize record: {0}")]
    Serialization(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Invalid status transition for {id}: {from} -> {to}")]
    InvalidTransition {
        id: String,
        from: InvocationStatus,
        to: InvocationStatus,
    },
}

#[derive(Debug, Clone, Error)]
pub enum StepError {
    #[error("Invalid step definition for {action}: {reason}")]
    InvalidStep { action: String, reason: String },

    #[error("Step {action} failed: {reason}")]
    ExecutionFailed { action: String, reason: String },

    #[error("Failed to load skill: {0}")]
    SkillNotLoaded(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Failed to launch agent {agent_id}: {reason}")]
    LaunchFailed { agent_id: String, reason: String },

    #[error("Unknown priority: {0}")]
    UnknownPriority(String),

    #[error("Delay for agent {agent_id} is out of range: {reason}")]
    DelayOutOfRange { agent_id: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aborted_workflow_displays_step_and_action() {
        let err = Error::WorkflowAborted {
            step: 2,
            action: "search".into(),
            reason: "connection refused".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("step 2"));
        assert!(msg.contains("search"));
        assert!(msg.contains("connection refused"));
    }

    #[test]
    fn invalid_transition_names_both_states() {
        let err = Error::Store(StoreError::InvalidTransition {
            id: "schedule-1".into(),
            from: InvocationStatus::Done,
            to: InvocationStatus::Pending,
        });
        assert!(err.to_string().contains("done -> pending"));
    }
}
