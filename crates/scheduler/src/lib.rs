//! Scheduler: the day-partitioned backlog of agent invocations.
//!
//! - [`Scheduler::enqueue`] writes a `pending` invocation into the partition of
//!   the day it becomes due.
//! - [`Scheduler::drain_top`] dispatches the `n` most urgent due invocations,
//!   earliest first within a priority, moving each to `running`.
//! - [`Scheduler::dispatch_urgent`] skips the backlog: it records a `running`
//!   invocation and starts the agent on a detached task.
//!
//! Dispatch is fire-and-forget. The caller never learns synchronously whether
//! the agent succeeded; the spawned task moves the record to `done`/`failed`
//! and the agent's completion event is the only other signal. Nothing is
//! re-queued on failure and nothing survives a restart mid-run: delivery is
//! at most once.

use agentrelay_core::error::SchedulerError;
use agentrelay_core::{
    InvocationStatus, InvocationStore, PartitionKey, Payload, Priority, Result, RunSummary,
    ScheduledInvocation,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Starts an agent run. Implemented by the orchestrator.
#[async_trait]
pub trait AgentLauncher: Send + Sync {
    async fn launch(&self, agent_id: &str, input: Payload) -> Result<RunSummary>;
}

/// Outcome of one drain.
#[derive(Debug, Clone, Default)]
pub struct DrainReport {
    /// Invocations pending in the partition before the drain
    pub pending: usize,
    /// Invocations dispatched, in dispatch order
    pub dispatched: Vec<ScheduledInvocation>,
}

pub struct Scheduler {
    store: Arc<dyn InvocationStore>,
    launcher: Arc<dyn AgentLauncher>,
    in_flight: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(store: Arc<dyn InvocationStore>, launcher: Arc<dyn AgentLauncher>) -> Self {
        Self {
            store,
            launcher,
            in_flight: Mutex::new(Vec::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn InvocationStore> {
        &self.store
    }

    /// Add a `pending` invocation, due now.
    pub async fn enqueue(
        &self,
        agent_id: &str,
        input: Payload,
        priority: Priority,
    ) -> Result<ScheduledInvocation> {
        self.enqueue_at(agent_id, input, priority, Utc::now()).await
    }

    /// Add a `pending` invocation that becomes due after `delay`.
    pub async fn enqueue_delayed(
        &self,
        agent_id: &str,
        input: Payload,
        priority: Priority,
        delay: Duration,
    ) -> Result<ScheduledInvocation> {
        let out_of_range = |reason: String| SchedulerError::DelayOutOfRange {
            agent_id: agent_id.to_string(),
            reason,
        };
        let delay = chrono::Duration::from_std(delay).map_err(|e| out_of_range(e.to_string()))?;
        let scheduled_at = Utc::now().checked_add_signed(delay).ok_or_else(|| {
            out_of_range(format!("{}s lands past the last representable date", delay.num_seconds()))
        })?;
        self.enqueue_at(agent_id, input, priority, scheduled_at).await
    }

    /// Add a `pending` invocation due at `scheduled_at`.
    pub async fn enqueue_at(
        &self,
        agent_id: &str,
        input: Payload,
        priority: Priority,
        scheduled_at: DateTime<Utc>,
    ) -> Result<ScheduledInvocation> {
        let invocation = ScheduledInvocation::pending(agent_id, input, priority, scheduled_at);
        self.store.insert(&invocation).await?;
        info!(
            agent_id = %agent_id,
            invocation_id = %invocation.id,
            %priority,
            scheduled_at = %invocation.scheduled_at,
            "Invocation scheduled"
        );
        Ok(invocation)
    }

    /// Dispatch the top `n` due invocations of today's partition.
    ///
    /// Returns how many invocations were pending before the drain.
    pub async fn drain_top(&self, n: usize) -> usize {
        self.drain(PartitionKey::today(), n, Utc::now()).await.pending
    }

    /// Dispatch the top `n` invocations of `key` that are due at `now`.
    ///
    /// A store failure degrades to an empty drain.
    pub async fn drain(&self, key: PartitionKey, n: usize, now: DateTime<Utc>) -> DrainReport {
        let invocations = match self.store.list(key).await {
            Ok(list) => list,
            Err(e) => {
                warn!(partition = %key, error = %e, "Failed to list backlog");
                return DrainReport::default();
            }
        };

        let pending: Vec<ScheduledInvocation> = invocations
            .into_iter()
            .filter(|inv| inv.status == InvocationStatus::Pending)
            .collect();
        let pending_count = pending.len();

        let mut due: Vec<ScheduledInvocation> =
            pending.into_iter().filter(|inv| inv.is_due(&now)).collect();
        sort_for_dispatch(&mut due);

        let mut dispatched = Vec::new();
        for invocation in due {
            if dispatched.len() >= n {
                break;
            }
            // Another drain may have claimed it since we listed.
            let running = match self
                .store
                .transition(key, &invocation.id, InvocationStatus::Running, Utc::now(), None)
                .await
            {
                Ok(running) => running,
                Err(e) => {
                    debug!(invocation_id = %invocation.id, error = %e, "Skipping unclaimable invocation");
                    continue;
                }
            };
            info!(
                agent_id = %running.agent_id,
                invocation_id = %running.id,
                priority = %running.priority,
                "Dispatching scheduled agent"
            );
            self.spawn_run(running.clone());
            dispatched.push(running);
        }

        info!(
            partition = %key,
            pending = pending_count,
            dispatched = dispatched.len(),
            "Backlog drained"
        );
        DrainReport {
            pending: pending_count,
            dispatched,
        }
    }

    /// Start an agent now, bypassing the backlog.
    ///
    /// The invocation is recorded as `running` for the audit trail and the
    /// run happens on a detached task; this returns as soon as it is spawned.
    pub async fn dispatch_urgent(
        &self,
        agent_id: &str,
        input: Payload,
    ) -> Result<ScheduledInvocation> {
        let now = Utc::now();
        let mut invocation = ScheduledInvocation::pending(agent_id, input, Priority::Urgent, now);
        invocation.transition(InvocationStatus::Running, now, None)?;
        self.store.insert(&invocation).await?;

        info!(agent_id = %agent_id, invocation_id = %invocation.id, "Spawned urgent agent");
        self.spawn_run(invocation.clone());
        Ok(invocation)
    }

    /// Record the outcome of a `running` invocation.
    pub async fn complete(
        &self,
        invocation: &ScheduledInvocation,
        outcome: &Result<RunSummary>,
    ) -> Result<ScheduledInvocation> {
        let (status, error) = terminal_status(outcome);
        let updated = self
            .store
            .transition(invocation.partition(), &invocation.id, status, Utc::now(), error)
            .await?;
        Ok(updated)
    }

    /// Every invocation of a partition, in dispatch order.
    pub async fn list(&self, key: PartitionKey) -> Vec<ScheduledInvocation> {
        let mut all = self.store.list(key).await.unwrap_or_else(|e| {
            warn!(partition = %key, error = %e, "Failed to list backlog");
            Vec::new()
        });
        sort_for_dispatch(&mut all);
        all
    }

    /// Wait for every run spawned so far.
    ///
    /// Dispatch never waits; this exists so a short-lived process can let its
    /// detached runs finish before exiting.
    pub async fn wait_idle(&self) {
        loop {
            let handles: Vec<JoinHandle<()>> = match self.in_flight.lock() {
                Ok(mut guard) => guard.drain(..).collect(),
                Err(poisoned) => poisoned.into_inner().drain(..).collect(),
            };
            if handles.is_empty() {
                return;
            }
            for handle in handles {
                if let Err(e) = handle.await {
                    warn!(error = %e, "Detached agent run panicked");
                }
            }
        }
    }

    fn spawn_run(&self, invocation: ScheduledInvocation) {
        let store = self.store.clone();
        let launcher = self.launcher.clone();

        let handle = tokio::spawn(async move {
            let outcome = launcher
                .launch(&invocation.agent_id, invocation.input.clone())
                .await;
            if let Err(e) = &outcome {
                warn!(agent_id = %invocation.agent_id, error = %e, "Scheduled agent failed");
            }
            let (status, error) = terminal_status(&outcome);
            if let Err(e) = store
                .transition(invocation.partition(), &invocation.id, status, Utc::now(), error)
                .await
            {
                warn!(invocation_id = %invocation.id, error = %e, "Failed to record invocation outcome");
            }
        });

        let mut guard = match self.in_flight.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.retain(|h| !h.is_finished());
        guard.push(handle);
    }
}

/// Priority first (`urgent` before `low`), then earliest `scheduled_at`.
fn sort_for_dispatch(invocations: &mut [ScheduledInvocation]) {
    invocations.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then(a.scheduled_at.cmp(&b.scheduled_at))
            .then(a.created_at.cmp(&b.created_at))
    });
}

/// Map a launcher outcome onto the terminal invocation status.
fn terminal_status(outcome: &Result<RunSummary>) -> (InvocationStatus, Option<String>) {
    match outcome {
        Ok(summary) if summary.success => (InvocationStatus::Done, None),
        Ok(_) => (InvocationStatus::Failed, Some("run reported failure".to_string())),
        Err(e) => (InvocationStatus::Failed, Some(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentrelay_core::Error;
    use agentrelay_store::InMemoryInvocationStore;
    use chrono::Duration as ChronoDuration;
    use serde_json::json;
    use std::collections::HashSet;
    use tokio::sync::Mutex as AsyncMutex;

    /// Records every launch; agents named in `failing` return an error.
    #[derive(Default)]
    struct RecordingLauncher {
        launched: AsyncMutex<Vec<String>>,
        failing: HashSet<String>,
    }

    impl RecordingLauncher {
        fn failing(agents: &[&str]) -> Self {
            Self {
                launched: AsyncMutex::new(Vec::new()),
                failing: agents.iter().map(|a| a.to_string()).collect(),
            }
        }
    }

    #[async_trait]
    impl AgentLauncher for RecordingLauncher {
        async fn launch(&self, agent_id: &str, _input: Payload) -> Result<RunSummary> {
            self.launched.lock().await.push(agent_id.to_string());
            if self.failing.contains(agent_id) {
                return Err(Error::WorkflowAborted {
                    step: 1,
                    action: "search".into(),
                    reason: "boom".into(),
                });
            }
            Ok(RunSummary {
                agent_id: agent_id.to_string(),
                success: true,
                steps: 1,
                duration_ms: 1,
            })
        }
    }

    fn setup(launcher: RecordingLauncher) -> (Scheduler, Arc<RecordingLauncher>) {
        let launcher = Arc::new(launcher);
        let scheduler = Scheduler::new(Arc::new(InMemoryInvocationStore::new()), launcher.clone());
        (scheduler, launcher)
    }

    fn payload(value: serde_json::Value) -> Payload {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn enqueue_round_trips_through_the_store() {
        let (scheduler, _) = setup(RecordingLauncher::default());
        let input = payload(json!({ "hotCount": 3, "records": "out/leads.json" }));
        let inv = scheduler
            .enqueue("reach-3", input.clone(), Priority::High)
            .await
            .unwrap();
        assert_eq!(inv.status, InvocationStatus::Pending);

        let stored = scheduler
            .store()
            .get(inv.partition(), &inv.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            (stored.agent_id.as_str(), &stored.input, stored.priority),
            ("reach-3", &input, Priority::High)
        );
    }

    #[tokio::test]
    async fn drain_takes_urgent_first_then_earliest_normal() {
        let (scheduler, launcher) = setup(RecordingLauncher::default());
        let base = Utc::now() - ChronoDuration::minutes(10);

        for i in 0..5 {
            scheduler
                .enqueue_at(
                    &format!("normal-{i}"),
                    Payload::new(),
                    Priority::Normal,
                    base + ChronoDuration::seconds(i),
                )
                .await
                .unwrap();
        }
        for i in 0..2 {
            scheduler
                .enqueue_at(
                    &format!("urgent-{i}"),
                    Payload::new(),
                    Priority::Urgent,
                    base + ChronoDuration::seconds(30 + i),
                )
                .await
                .unwrap();
        }

        let key = PartitionKey::of(&base);
        let report = scheduler.drain(key, 5, Utc::now()).await;
        assert_eq!(report.pending, 7);
        let order: Vec<&str> = report.dispatched.iter().map(|i| i.agent_id.as_str()).collect();
        assert_eq!(
            order,
            vec!["urgent-0", "urgent-1", "normal-0", "normal-1", "normal-2"]
        );
        assert!(report.dispatched.iter().all(|i| i.started_at.is_some()));

        scheduler.wait_idle().await;
        assert_eq!(launcher.launched.lock().await.len(), 5);

        let left: Vec<String> = scheduler
            .list(key)
            .await
            .into_iter()
            .filter(|i| i.status == InvocationStatus::Pending)
            .map(|i| i.agent_id)
            .collect();
        assert_eq!(left, vec!["normal-3", "normal-4"]);
    }

    #[tokio::test]
    async fn drain_order_is_non_decreasing_priority() {
        let (scheduler, _) = setup(RecordingLauncher::default());
        let due = Utc::now() - ChronoDuration::seconds(1);
        for (agent, priority) in [
            ("a", Priority::Low),
            ("b", Priority::Normal),
            ("c", Priority::Urgent),
            ("d", Priority::High),
            ("e", Priority::Low),
            ("f", Priority::High),
        ] {
            scheduler
                .enqueue_at(agent, Payload::new(), priority, due)
                .await
                .unwrap();
        }

        let report = scheduler.drain(PartitionKey::of(&due), 10, Utc::now()).await;
        let priorities: Vec<Priority> = report.dispatched.iter().map(|i| i.priority).collect();
        assert_eq!(priorities.len(), 6);
        assert!(priorities.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(priorities[0], Priority::Urgent);
        scheduler.wait_idle().await;
    }

    #[tokio::test]
    async fn delayed_invocations_wait_until_due() {
        let (scheduler, launcher) = setup(RecordingLauncher::default());
        let inv = scheduler
            .enqueue_delayed("ghost-9", Payload::new(), Priority::Normal, Duration::from_secs(600))
            .await
            .unwrap();

        let key = inv.partition();
        let report = scheduler.drain(key, 5, Utc::now()).await;
        assert_eq!(report.pending, 1);
        assert!(report.dispatched.is_empty());

        let later = scheduler.drain(key, 5, Utc::now() + ChronoDuration::minutes(11)).await;
        assert_eq!(later.dispatched.len(), 1);
        scheduler.wait_idle().await;
        assert_eq!(*launcher.launched.lock().await, vec!["ghost-9".to_string()]);
    }

    #[tokio::test]
    async fn invocation_created_yesterday_drains_on_the_day_it_is_due() {
        let (scheduler, launcher) = setup(RecordingLauncher::default());
        let now = Utc::now();
        let mut inv = ScheduledInvocation::pending(
            "ghost-9",
            Payload::new(),
            Priority::Normal,
            now - ChronoDuration::minutes(1),
        );
        inv.created_at = now - ChronoDuration::days(1);
        scheduler.store().insert(&inv).await.unwrap();

        let report = scheduler.drain(PartitionKey::of(&inv.scheduled_at), 5, now).await;
        assert_eq!(report.pending, 1);
        assert_eq!(report.dispatched.len(), 1);
        scheduler.wait_idle().await;
        assert_eq!(*launcher.launched.lock().await, vec!["ghost-9".to_string()]);

        // Its creation day holds nothing
        let created_day = scheduler.drain(PartitionKey::of(&inv.created_at), 5, now).await;
        assert_eq!(created_day.pending, 0);
    }

    #[tokio::test]
    async fn delay_crossing_midnight_lands_in_the_due_day() {
        let (scheduler, launcher) = setup(RecordingLauncher::default());
        let tomorrow = Utc::now() + ChronoDuration::days(1);
        let inv = scheduler
            .enqueue_at("ghost-9", Payload::new(), Priority::Normal, tomorrow)
            .await
            .unwrap();
        assert_eq!(inv.partition(), PartitionKey::of(&tomorrow));
        assert_ne!(inv.partition(), PartitionKey::of(&inv.created_at));

        let report = scheduler.drain(inv.partition(), 5, tomorrow).await;
        assert_eq!(report.dispatched.len(), 1);
        scheduler.wait_idle().await;
        assert_eq!(launcher.launched.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn oversized_delay_is_an_error_not_a_panic() {
        let (scheduler, _) = setup(RecordingLauncher::default());
        let err = scheduler
            .enqueue_delayed(
                "ghost-9",
                Payload::new(),
                Priority::Normal,
                Duration::from_secs(10_000_000_000_000),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Scheduler(SchedulerError::DelayOutOfRange { .. })
        ));
        assert!(scheduler.list(PartitionKey::today()).await.is_empty());
    }

    #[tokio::test]
    async fn completed_runs_move_to_done_or_failed_and_stay_there() {
        let (scheduler, _) = setup(RecordingLauncher::failing(&["intel-9"]));
        scheduler
            .enqueue("health-5", Payload::new(), Priority::High)
            .await
            .unwrap();
        scheduler
            .enqueue("intel-9", Payload::new(), Priority::Normal)
            .await
            .unwrap();

        let key = PartitionKey::today();
        scheduler.drain(key, 5, Utc::now()).await;
        scheduler.wait_idle().await;

        let all = scheduler.list(key).await;
        let health = all.iter().find(|i| i.agent_id == "health-5").unwrap();
        let intel = all.iter().find(|i| i.agent_id == "intel-9").unwrap();
        assert_eq!(health.status, InvocationStatus::Done);
        assert_eq!(intel.status, InvocationStatus::Failed);
        assert!(intel.error.as_deref().unwrap().contains("boom"));

        // Nothing is re-queued
        let again = scheduler.drain(key, 5, Utc::now()).await;
        assert_eq!(again.pending, 0);
        assert!(again.dispatched.is_empty());
    }

    #[tokio::test]
    async fn urgent_dispatch_bypasses_the_backlog() {
        let (scheduler, launcher) = setup(RecordingLauncher::default());
        scheduler
            .enqueue("ghost-9", Payload::new(), Priority::Normal)
            .await
            .unwrap();

        let inv = scheduler
            .dispatch_urgent("reach-3", payload(json!({ "hotCount": 3 })))
            .await
            .unwrap();
        assert_eq!(inv.status, InvocationStatus::Running);
        assert_eq!(inv.priority, Priority::Urgent);
        assert!(inv.started_at.is_some());

        scheduler.wait_idle().await;
        assert_eq!(*launcher.launched.lock().await, vec!["reach-3".to_string()]);

        let stored = scheduler
            .store()
            .get(inv.partition(), &inv.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, InvocationStatus::Done);

        // The urgent record never shows up as pending work
        assert_eq!(scheduler.drain_top(5).await, 1);
        scheduler.wait_idle().await;
    }

    #[tokio::test]
    async fn concurrent_drains_never_double_dispatch() {
        let (scheduler, launcher) = setup(RecordingLauncher::default());
        let scheduler = Arc::new(scheduler);
        for i in 0..6 {
            scheduler
                .enqueue(&format!("agent-{i}"), Payload::new(), Priority::Normal)
                .await
                .unwrap();
        }

        let a = {
            let s = scheduler.clone();
            tokio::spawn(async move { s.drain(PartitionKey::today(), 6, Utc::now()).await })
        };
        let b = {
            let s = scheduler.clone();
            tokio::spawn(async move { s.drain(PartitionKey::today(), 6, Utc::now()).await })
        };
        let total = a.await.unwrap().dispatched.len() + b.await.unwrap().dispatched.len();
        assert_eq!(total, 6);

        scheduler.wait_idle().await;
        let mut launched = launcher.launched.lock().await.clone();
        launched.sort();
        launched.dedup();
        assert_eq!(launched.len(), 6);
    }

    #[tokio::test]
    async fn complete_rejects_non_running_invocations() {
        let (scheduler, _) = setup(RecordingLauncher::default());
        let inv = scheduler
            .enqueue("reach-3", Payload::new(), Priority::Low)
            .await
            .unwrap();
        let outcome: Result<RunSummary> = Ok(RunSummary {
            agent_id: "reach-3".into(),
            success: true,
            steps: 0,
            duration_ms: 0,
        });
        assert!(scheduler.complete(&inv, &outcome).await.is_err());
    }
}
