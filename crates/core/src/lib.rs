//! # AgentRelay Core
//!
//! Domain types, traits, and error definitions for the AgentRelay engine.
//! Agents react to events: a finished run emits an event, trigger rules
//! decide whether another agent should run, the scheduler keeps a
//! priority-ordered backlog, and the workflow executor walks an agent's
//! steps against a shared execution context.
//!
//! Every storage seam is a trait defined here. Implementations live in
//! their respective crates and all crates depend inward on this one.

pub mod agent;
pub mod context;
pub mod error;
pub mod event;
pub mod invocation;
pub mod partition;
pub mod run;
pub mod skill;
pub mod step;
pub mod store;

// Re-export key types at crate root for ergonomics
pub use agent::{AgentConfig, FetchFormat, StepAction, WorkflowStep};
pub use context::ExecutionContext;
pub use error::{Error, Result};
pub use event::{Event, EventBus, Payload};
pub use invocation::{InvocationStatus, Priority, ScheduledInvocation};
pub use partition::PartitionKey;
pub use run::{
    AnalyticsRecord, FailureRecord, RunResult, RunSummary, StepRecord, StepStatus, StepTiming,
};
pub use skill::Skill;
pub use step::{StepHandler, StepOutput, StepRegistry};
pub use store::{EventStore, InvocationStore, RunRecordStore};
