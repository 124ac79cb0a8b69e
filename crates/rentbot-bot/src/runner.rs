// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The update receive loop.
//!
//! Every update runs in its own task with a deadline and a panic guard, so
//! a slow or failing handler never stalls the loop. On shutdown the loop
//! stops receiving and waits a bounded time for in-flight updates.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

use rentbot_core::chat::InboundUpdate;
use rentbot_core::{ChatChannel, RentError};

use crate::orchestrator::Orchestrator;

/// How long shutdown waits for in-flight updates.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

pub struct UpdateRunner {
    channel: Arc<dyn ChatChannel>,
    orchestrator: Arc<Orchestrator>,
    update_timeout: Duration,
    tracker: TaskTracker,
}

impl UpdateRunner {
    pub fn new(
        channel: Arc<dyn ChatChannel>,
        orchestrator: Arc<Orchestrator>,
        update_timeout: Duration,
    ) -> Self {
        Self {
            channel,
            orchestrator,
            update_timeout,
            tracker: TaskTracker::new(),
        }
    }

    /// Receives updates until cancelled or until the channel closes.
    pub async fn run(&self, cancel: CancellationToken) {
        info!("update runner started");
        loop {
            tokio::select! {
                update = self.channel.receive() => {
                    match update {
                        Ok(update) => self.dispatch(update),
                        Err(e) => {
                            error!(error = %e, "channel receive error");
                            if e.to_string().contains("closed") {
                                break;
                            }
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping update runner");
                    break;
                }
            }
        }

        self.tracker.close();
        if tokio::time::timeout(DRAIN_TIMEOUT, self.tracker.wait())
            .await
            .is_err()
        {
            warn!(
                in_flight = self.tracker.len(),
                "drain timeout reached, abandoning in-flight updates"
            );
        }
        info!("update runner stopped");
    }

    fn dispatch(&self, update: InboundUpdate) {
        let kind = match &update {
            InboundUpdate::Message { .. } => "message",
            InboundUpdate::Callback { .. } => "callback",
        };
        rentbot_prometheus::record_update(kind);

        let orchestrator = self.orchestrator.clone();
        let deadline = self.update_timeout;
        let user_id = update.sender().id;
        self.tracker.spawn(async move {
            let started = Instant::now();
            let handled = AssertUnwindSafe(tokio::time::timeout(
                deadline,
                orchestrator.handle(update),
            ))
            .catch_unwind()
            .await;
            rentbot_prometheus::record_update_latency(started.elapsed().as_secs_f64());

            match handled {
                Ok(Ok(Ok(()))) => {}
                Ok(Ok(Err(e))) => {
                    rentbot_prometheus::record_update_error("handler");
                    error!(user_id, kind, error = %e, "update handler failed");
                }
                Ok(Err(_)) => {
                    rentbot_prometheus::record_update_error("timeout");
                    let e = RentError::Timeout { duration: deadline };
                    warn!(user_id, kind, error = %e, "update timed out");
                }
                Err(_) => {
                    rentbot_prometheus::record_update_error("panic");
                    error!(user_id, kind, "update handler panicked");
                }
            }
        });
    }
}
