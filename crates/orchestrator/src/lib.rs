//! The orchestrator: the one place that wires events, triggers, the backlog,
//! skills, and the workflow executor together.
//!
//! ```text
//! emit(type, payload) ─► EventStore ─► TriggerEvaluator ─► Scheduler
//!                                                            │
//!            completion event ◄── run_agent ◄── AgentLauncher┘
//! ```
//!
//! Runs started by the scheduler are detached. Their outcome shows up as a
//! `<agent>.completed` event (success only), an analytics or failure record,
//! and the invocation's terminal status.

mod run;

pub use run::{RunOptions, RunReport};

use agentrelay_config::{AgentLoader, AgentSummary, AppConfig};
use agentrelay_core::error::SchedulerError;
use agentrelay_core::{
    Event, EventBus, EventStore, InvocationStatus, InvocationStore, PartitionKey, Payload,
    Result, RunRecordStore, RunSummary, ScheduledInvocation, StepRegistry,
};
use agentrelay_scheduler::{AgentLauncher, DrainReport, Scheduler};
use agentrelay_skills::SkillCache;
use agentrelay_store::FileStores;
use agentrelay_triggers::{RuleTable, TriggerEvaluator};
use agentrelay_workflow::{WorkflowExecutor, builtin_registry};
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::sync::{Arc, Weak};
use tracing::{debug, info};

/// Ten years; keeps the query window inside chrono's range.
const MAX_WINDOW_HOURS: u64 = 24 * 365 * 10;

/// Pluggable pieces of an [`Orchestrator`].
pub struct OrchestratorParts {
    /// Should publish to `bus`
    pub events: Arc<dyn EventStore>,
    pub invocations: Arc<dyn InvocationStore>,
    pub runs: Arc<dyn RunRecordStore>,
    pub skills: Arc<SkillCache>,
    pub registry: StepRegistry,
    pub bus: Arc<EventBus>,
}

/// What an `emit` stored and scheduled.
#[derive(Debug, Clone)]
pub struct Emitted {
    pub event: Event,
    /// The invocation a matching trigger created, if any
    pub scheduled: Option<ScheduledInvocation>,
}

/// Snapshot for `agentrelay status`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusReport {
    pub agents: Vec<AgentSummary>,
    pub skills: Vec<String>,
    pub triggers: usize,
    pub pending: usize,
    pub running: usize,
    pub done: usize,
    pub failed: usize,
    pub recent_events: usize,
    pub runs_today: usize,
    pub failures_today: usize,
}

pub struct Orchestrator {
    config: AppConfig,
    agents: AgentLoader,
    skills: Arc<SkillCache>,
    executor: WorkflowExecutor,
    events: Arc<dyn EventStore>,
    runs: Arc<dyn RunRecordStore>,
    triggers: TriggerEvaluator,
    scheduler: Scheduler,
    bus: Arc<EventBus>,
}

impl Orchestrator {
    /// File-backed orchestrator using the configured paths and built-in handlers.
    pub fn open(config: AppConfig) -> Result<Arc<Self>> {
        let bus = Arc::new(EventBus::new(config.events.bus_capacity));
        let stores = FileStores::open(&config.paths.data_dir, bus.clone());
        let skills = Arc::new(SkillCache::from_dir(&config.paths.skills_dir));
        let registry = builtin_registry(skills.clone(), config.workflow.save_root.clone());

        Self::with_parts(
            config,
            OrchestratorParts {
                events: stores.events,
                invocations: stores.invocations,
                runs: stores.runs,
                skills,
                registry,
                bus,
            },
        )
    }

    /// Build from explicit parts. Fails if a trigger condition does not parse.
    pub fn with_parts(config: AppConfig, parts: OrchestratorParts) -> Result<Arc<Self>> {
        let triggers = TriggerEvaluator::new(RuleTable::from_config(&config.triggers)?);
        let agents = AgentLoader::new(config.paths.agents_dir.clone());
        let executor = WorkflowExecutor::new(Arc::new(parts.registry));
        debug!(
            triggers = triggers.table().len(),
            actions = ?executor.registry().actions(),
            "Orchestrator ready"
        );

        Ok(Arc::new_cyclic(|this: &Weak<Self>| {
            let launcher = Arc::new(Relauncher {
                orchestrator: this.clone(),
            });
            Self {
                config,
                agents,
                skills: parts.skills,
                executor,
                events: parts.events,
                runs: parts.runs,
                triggers,
                scheduler: Scheduler::new(parts.invocations, launcher),
                bus: parts.bus,
            }
        }))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn agents(&self) -> &AgentLoader {
        &self.agents
    }

    pub fn skills(&self) -> &Arc<SkillCache> {
        &self.skills
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn triggers(&self) -> &TriggerEvaluator {
        &self.triggers
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Store an event and act on the trigger rule it matches, if any.
    ///
    /// Urgent matches start immediately on a detached task; everything else
    /// lands in the backlog for the next [`Orchestrator::process_scheduled`].
    pub async fn emit(&self, event_type: &str, payload: Payload) -> Result<Emitted> {
        let event = self.events.append(event_type, payload).await?;
        info!(event_type = %event.event_type, event_id = %event.id, "Event emitted");

        let scheduled = match self.triggers.evaluate(&event) {
            None => None,
            Some(dispatch) => {
                info!(
                    event_type = %event.event_type,
                    target = %dispatch.target_agent_id,
                    priority = %dispatch.priority,
                    "Trigger matched"
                );
                let invocation = if dispatch.is_urgent() {
                    self.scheduler
                        .dispatch_urgent(&dispatch.target_agent_id, dispatch.input)
                        .await?
                } else {
                    self.scheduler
                        .enqueue_delayed(
                            &dispatch.target_agent_id,
                            dispatch.input,
                            dispatch.priority,
                            dispatch.delay,
                        )
                        .await?
                };
                Some(invocation)
            }
        };

        Ok(Emitted { event, scheduled })
    }

    /// Dispatch the top `drain_limit` due invocations of today's backlog.
    pub async fn process_scheduled(&self) -> DrainReport {
        self.scheduler
            .drain(
                PartitionKey::today(),
                self.config.scheduler.drain_limit,
                Utc::now(),
            )
            .await
    }

    /// Events of the last `hours` (configured window when `None`), newest first.
    pub async fn recent_events(&self, hours: Option<u64>) -> Vec<Event> {
        let hours = hours
            .unwrap_or(self.config.events.default_window_hours)
            .min(MAX_WINDOW_HOURS);
        self.events.query(chrono::Duration::hours(hours as i64)).await
    }

    /// Wait for every detached run to finish.
    pub async fn wait_idle(&self) {
        self.scheduler.wait_idle().await;
    }

    pub async fn status(&self) -> StatusReport {
        let today = PartitionKey::today();
        let backlog = self.scheduler.list(today).await;
        let count = |status: InvocationStatus| {
            backlog.iter().filter(|i| i.status == status).count()
        };

        StatusReport {
            agents: self.agents.list(),
            skills: self.skills.list_available().await,
            triggers: self.triggers.table().len(),
            pending: count(InvocationStatus::Pending),
            running: count(InvocationStatus::Running),
            done: count(InvocationStatus::Done),
            failed: count(InvocationStatus::Failed),
            recent_events: self.recent_events(None).await.len(),
            runs_today: self.runs.list_analytics(today).await.len(),
            failures_today: self.runs.list_failures(today).await.len(),
        }
    }
}

#[async_trait]
impl AgentLauncher for Orchestrator {
    async fn launch(&self, agent_id: &str, input: Payload) -> Result<RunSummary> {
        let report = self.run_agent(agent_id, RunOptions::with_input(input)).await?;
        Ok(report.summary)
    }
}

/// Launcher handed to the scheduler; does not keep the orchestrator alive.
struct Relauncher {
    orchestrator: Weak<Orchestrator>,
}

#[async_trait]
impl AgentLauncher for Relauncher {
    async fn launch(&self, agent_id: &str, input: Payload) -> Result<RunSummary> {
        let Some(orchestrator) = self.orchestrator.upgrade() else {
            return Err(SchedulerError::LaunchFailed {
                agent_id: agent_id.to_string(),
                reason: "orchestrator has shut down".into(),
            }
            .into());
        };
        orchestrator.launch(agent_id, input).await
    }
}
