//! Scheduled invocations: the backlog entries of the scheduler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{SchedulerError, StoreError};
use crate::event::{Payload, record_id};
use crate::partition::PartitionKey;

/// Urgency class of an invocation.
///
/// The derived ordering is the dequeue order: `Urgent < High < Normal < Low`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Urgent,
    High,
    #[default]
    Normal,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Urgent => "urgent",
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "urgent" => Ok(Priority::Urgent),
            "high" => Ok(Priority::High),
            "normal" => Ok(Priority::Normal),
            "low" => Ok(Priority::Low),
            other => Err(SchedulerError::UnknownPriority(other.to_string())),
        }
    }
}

/// Lifecycle of an invocation: `pending -> running -> {done, failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvocationStatus {
    Pending,
    Running,
    Done,
    Failed,
}

impl InvocationStatus {
    /// Whether `self -> next` is an edge of the one-way state machine.
    pub fn can_transition_to(&self, next: InvocationStatus) -> bool {
        matches!(
            (self, next),
            (InvocationStatus::Pending, InvocationStatus::Running)
                | (InvocationStatus::Running, InvocationStatus::Done)
                | (InvocationStatus::Running, InvocationStatus::Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, InvocationStatus::Done | InvocationStatus::Failed)
    }
}

impl fmt::Display for InvocationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InvocationStatus::Pending => "pending",
            InvocationStatus::Running => "running",
            InvocationStatus::Done => "done",
            InvocationStatus::Failed => "failed",
        })
    }
}

/// One pending (or past) request to run an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledInvocation {
    pub id: String,

    /// Agent to run
    #[serde(rename = "agent")]
    pub agent_id: String,

    /// Input handed to the agent's execution context
    #[serde(default)]
    pub input: Payload,

    pub priority: Priority,

    /// Earliest instant the invocation may be dispatched; fixes its partition
    pub scheduled_at: DateTime<Utc>,

    /// Instant the record was written
    pub created_at: DateTime<Utc>,

    pub status: InvocationStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScheduledInvocation {
    /// A new `pending` invocation created now and due at `scheduled_at`.
    pub fn pending(
        agent_id: impl Into<String>,
        input: Payload,
        priority: Priority,
        scheduled_at: DateTime<Utc>,
    ) -> Self {
        let created_at = Utc::now();
        Self {
            id: record_id("schedule", &created_at),
            agent_id: agent_id.into(),
            input,
            priority,
            scheduled_at,
            created_at,
            status: InvocationStatus::Pending,
            started_at: None,
            finished_at: None,
            error: None,
        }
    }

    /// The partition that owns this invocation: the day it becomes due.
    pub fn partition(&self) -> PartitionKey {
        PartitionKey::of(&self.scheduled_at)
    }

    /// Whether this invocation is pending and due at `now`.
    pub fn is_due(&self, now: &DateTime<Utc>) -> bool {
        self.status == InvocationStatus::Pending && self.scheduled_at <= *now
    }

    /// Apply a status transition, stamping the matching timestamp.
    pub fn transition(
        &mut self,
        to: InvocationStatus,
        at: DateTime<Utc>,
        error: Option<String>,
    ) -> Result<(), StoreError> {
        if !self.status.can_transition_to(to) {
            return Err(StoreError::InvalidTransition {
                id: self.id.clone(),
                from: self.status,
                to,
            });
        }
        match to {
            InvocationStatus::Running => self.started_at = Some(at),
            InvocationStatus::Done | InvocationStatus::Failed => self.finished_at = Some(at),
            InvocationStatus::Pending => {}
        }
        self.status = to;
        if error.is_some() {
            self.error = error;
        }
        Ok(())
    }
}
