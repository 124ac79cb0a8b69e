// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbox consumer driving the mirror sink.
//!
//! One loop runs per task kind. Each poll leases a batch of due tasks,
//! pushes them through the sink under the per-booking gate, and records the
//! outcome on the outbox row. Delivery is at-least-once: a task interrupted
//! by shutdown goes back to `pending` and runs again on the next start.

use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use rentbot_booking::BookingRules;
use rentbot_config::model::SyncConfig;
use rentbot_core::{
    Clock, MirrorSink, PluginAdapter, RentError, Store, SyncJob, SyncTask, SyncTaskKind,
};

use crate::backoff::{self, RetryDecision};
use crate::gate::BookingGate;

/// How long a leased task stays invisible to other pollers.
pub const DEFAULT_LEASE: Duration = Duration::from_secs(300);

/// Tuning knobs of the worker loops.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub poll_interval: Duration,
    pub batch_size: usize,
    pub base_delay: Duration,
    pub max_retries: u32,
    pub lease: Duration,
}

impl WorkerSettings {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            batch_size: config.batch_size.max(1),
            base_delay: config.base_delay(),
            max_retries: config.max_retries,
            lease: DEFAULT_LEASE,
        }
    }
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}

/// Result of handling one leased task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    Retry { next_at: chrono::DateTime<chrono::Utc> },
    Failed,
    /// Handed back untouched because of shutdown.
    Released,
}

impl TaskOutcome {
    fn label(&self) -> &'static str {
        match self {
            TaskOutcome::Completed => "completed",
            TaskOutcome::Retry { .. } => "retry",
            TaskOutcome::Failed => "failed",
            TaskOutcome::Released => "released",
        }
    }
}

/// Consumes the outbox and keeps the mirror in step with the store.
pub struct SyncWorker {
    store: Arc<dyn Store>,
    sink: Arc<dyn MirrorSink>,
    clock: Arc<dyn Clock>,
    rules: BookingRules,
    settings: WorkerSettings,
    gate: BookingGate,
    /// Task deliveries hold it shared; a full resync holds it exclusively so
    /// no delivery lands between the resync's read and its write.
    mirror: RwLock<()>,
}

impl SyncWorker {
    pub fn new(
        store: Arc<dyn Store>,
        sink: Arc<dyn MirrorSink>,
        clock: Arc<dyn Clock>,
        rules: BookingRules,
        settings: WorkerSettings,
    ) -> Self {
        Self {
            store,
            sink,
            clock,
            rules,
            settings,
            gate: BookingGate::new(),
            mirror: RwLock::new(()),
        }
    }

    pub fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    /// Returns tasks leased by a previous run to `pending`.
    pub async fn recover(&self) -> Result<usize, RentError> {
        let released = self.store.release_all_leases().await?;
        if released > 0 {
            info!(released, "released outbox leases left by a previous run");
        }
        Ok(released)
    }

    /// Rewrites the bookings and users sheets from the store.
    ///
    /// Task deliveries wait until the rewrite is done.
    pub async fn full_resync(&self) -> Result<(), RentError> {
        let _exclusive = self.mirror.write().await;
        let bookings = self.store.list_all_bookings().await?;
        self.sink.replace_bookings(&bookings).await?;
        let users = self.store.list_all_users().await?;
        self.sink.update_users(&users).await?;
        info!(
            bookings = bookings.len(),
            users = users.len(),
            sink = self.sink.name(),
            "mirror fully resynchronised"
        );
        Ok(())
    }

    /// Recovers stale leases and spawns one loop per task kind.
    pub async fn start(
        self: &Arc<Self>,
        cancel: CancellationToken,
    ) -> Result<Vec<JoinHandle<()>>, RentError> {
        self.recover().await?;
        Ok(SyncTaskKind::ALL
            .iter()
            .map(|&kind| {
                let worker = Arc::clone(self);
                let cancel = cancel.clone();
                tokio::spawn(async move { worker.run_kind(kind, cancel).await })
            })
            .collect())
    }

    async fn run_kind(&self, kind: SyncTaskKind, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.settings.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(kind = %kind, "sync loop started");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.process_batch(kind, &cancel).await {
                        Ok(0) => {}
                        Ok(processed) => debug!(kind = %kind, processed, "sync batch done"),
                        Err(e) => warn!(kind = %kind, error = %e, "sync batch failed"),
                    }
                    self.gate.prune();
                }
                _ = cancel.cancelled() => {
                    info!(kind = %kind, "sync loop shutting down");
                    break;
                }
            }
        }
    }

    /// Leases and handles one batch of due tasks of `kind`.
    ///
    /// Returns how many tasks were leased.
    pub async fn process_batch(
        &self,
        kind: SyncTaskKind,
        cancel: &CancellationToken,
    ) -> Result<usize, RentError> {
        let tasks = self
            .store
            .lease_due_pending_tasks(
                kind,
                self.settings.batch_size,
                self.clock.now(),
                self.settings.lease,
            )
            .await?;
        let leased = tasks.len();

        for task in tasks {
            let task_id = task.id;
            let outcome = if cancel.is_cancelled() {
                self.release(task_id).await
            } else {
                self.process_task(task, cancel).await
            };
            match outcome {
                Ok(outcome) => {
                    rentbot_prometheus::record_sync_task(&kind.to_string(), outcome.label())
                }
                Err(e) => {
                    error!(task_id, kind = %kind, error = %e, "could not record outbox outcome")
                }
            }
        }

        Ok(leased)
    }

    /// Pushes one leased task through the sink and records the result.
    pub async fn process_task(
        &self,
        task: SyncTask,
        cancel: &CancellationToken,
    ) -> Result<TaskOutcome, RentError> {
        let job = match task.job() {
            Ok(job) => job,
            Err(e) => {
                error!(task_id = task.id, error = %e, "undecodable outbox task");
                self.store.mark_failed(task.id, &e, self.clock.now()).await?;
                return Ok(TaskOutcome::Failed);
            }
        };

        let _slot = match job.booking_id() {
            Some(booking_id) => tokio::select! {
                slot = self.gate.acquire(booking_id) => Some(slot),
                _ = cancel.cancelled() => return self.release(task.id).await,
            },
            None => None,
        };

        let _shared = tokio::select! {
            guard = self.mirror.read() => guard,
            _ = cancel.cancelled() => return self.release(task.id).await,
        };

        let result = tokio::select! {
            result = self.apply(&job) => result,
            _ = cancel.cancelled() => return self.release(task.id).await,
        };

        match result {
            Ok(()) => {
                self.store.mark_completed(task.id, self.clock.now()).await?;
                debug!(task_id = task.id, kind = %task.kind, "outbox task completed");
                Ok(TaskOutcome::Completed)
            }
            Err(e) => self.record_failure(&task, &e).await,
        }
    }

    async fn record_failure(
        &self,
        task: &SyncTask,
        failure: &RentError,
    ) -> Result<TaskOutcome, RentError> {
        let message = failure.to_string();
        let now = self.clock.now();
        match backoff::decide(
            task.retry_count,
            self.settings.base_delay,
            self.settings.max_retries,
        ) {
            RetryDecision::Retry(delay) => {
                let delay = TimeDelta::from_std(delay)
                    .map_err(|e| RentError::Internal(format!("retry delay out of range: {e}")))?;
                let next_at = now + delay;
                self.store.mark_retry(task.id, next_at, &message).await?;
                warn!(
                    task_id = task.id,
                    kind = %task.kind,
                    attempt = task.retry_count + 1,
                    next_at = %next_at,
                    error = %message,
                    "outbox task failed, will retry"
                );
                Ok(TaskOutcome::Retry { next_at })
            }
            RetryDecision::Fail => {
                self.store.mark_failed(task.id, &message, now).await?;
                error!(
                    task_id = task.id,
                    kind = %task.kind,
                    attempts = task.retry_count + 1,
                    error = %message,
                    "outbox task failed permanently"
                );
                Ok(TaskOutcome::Failed)
            }
        }
    }

    async fn release(&self, task_id: i64) -> Result<TaskOutcome, RentError> {
        self.store.release_task(task_id).await?;
        debug!(task_id, "outbox task released on shutdown");
        Ok(TaskOutcome::Released)
    }

    async fn apply(&self, job: &SyncJob) -> Result<(), RentError> {
        match job {
            SyncJob::Upsert { booking } => self.sink.upsert_booking(booking).await,
            SyncJob::UpdateStatus { booking_id, status } => {
                self.sink.update_booking_status(*booking_id, *status).await
            }
            // A coalesced task may have waited across days; the stored
            // window is only a hint.
            SyncJob::SyncSchedule { .. } => {
                let (start, end) = self.rules.schedule_window(self.clock.now());
                let daily = self.store.daily_bookings_in_range(start, end).await?;
                let items = self.store.list_active_items_sorted().await?;
                self.sink.update_schedule(start, end, &daily, &items).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_follow_config() {
        let config = SyncConfig {
            poll_interval_ms: 250,
            batch_size: 0,
            base_delay_secs: 3,
            max_retries: 7,
            ..SyncConfig::default()
        };
        let settings = WorkerSettings::from_config(&config);
        assert_eq!(settings.poll_interval, Duration::from_millis(250));
        assert_eq!(settings.batch_size, 1);
        assert_eq!(settings.base_delay, Duration::from_secs(3));
        assert_eq!(settings.max_retries, 7);
        assert_eq!(settings.lease, DEFAULT_LEASE);
    }

    #[test]
    fn outcome_labels() {
        assert_eq!(TaskOutcome::Completed.label(), "completed");
        assert_eq!(TaskOutcome::Released.label(), "released");
        assert_eq!(TaskOutcome::Failed.label(), "failed");
    }
}
