// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric feeds: an event bus observer and the periodic gauge refresh.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use rentbot_booking::BookingService;
use rentbot_bus::{DomainEvent, EventHandler, EventType};
use rentbot_core::{BookingStatus, RentError};

/// How often the gauges are recomputed from the store.
pub const GAUGE_REFRESH_INTERVAL: Duration = Duration::from_secs(300);

/// Counts booking events by type.
pub struct MetricsObserver;

#[async_trait]
impl EventHandler for MetricsObserver {
    fn name(&self) -> &str {
        "metrics-observer"
    }

    async fn handle(&self, event: &DomainEvent) -> Result<(), RentError> {
        rentbot_prometheus::record_booking_event(&event.event_type.to_string());
        if event.event_type == EventType::BookingCreated {
            rentbot_prometheus::record_booking_created();
        }
        Ok(())
    }
}

/// Recomputes the pending, failed-outbox and active-user gauges.
pub struct GaugeRefresher {
    bookings: Arc<BookingService>,
    interval: Duration,
}

impl GaugeRefresher {
    pub fn new(bookings: Arc<BookingService>) -> Self {
        Self::with_interval(bookings, GAUGE_REFRESH_INTERVAL)
    }

    pub fn with_interval(bookings: Arc<BookingService>, interval: Duration) -> Self {
        Self { bookings, interval }
    }

    pub async fn refresh(&self) -> Result<(), RentError> {
        let stats = self.bookings.stats().await?;
        let pending = stats
            .by_status
            .get(&BookingStatus::Pending)
            .copied()
            .unwrap_or(0);
        rentbot_prometheus::set_pending_bookings(pending as f64);
        rentbot_prometheus::set_outbox_failed(stats.failed_sync_tasks as f64);
        rentbot_prometheus::set_active_users(stats.active_users as f64);
        debug!(
            pending,
            failed = stats.failed_sync_tasks,
            active_users = stats.active_users,
            "gauges refreshed"
        );
        Ok(())
    }

    /// Refreshes immediately, then on every tick until cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.refresh().await {
                        warn!(error = %e, "gauge refresh failed");
                    }
                }
                _ = cancel.cancelled() => {
                    info!("gauge refresher shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn observer_never_fails() {
        let event = DomainEvent::new(EventType::BookingCompleted, &()).unwrap();
        MetricsObserver.handle(&event).await.unwrap();
        assert_eq!(MetricsObserver.name(), "metrics-observer");
    }
}
