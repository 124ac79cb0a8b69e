// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process publish/subscribe for booking domain events.
//!
//! Delivery is fire-and-forget with no persistence. Handlers run one after
//! another in the publisher's task; a failing or panicking handler is logged
//! and does not prevent delivery to the others.

pub mod event;

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::RwLock;
use tracing::{debug, error, warn};

use rentbot_core::RentError;

pub use event::{DomainEvent, EventType};

/// A subscriber to domain events.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    /// Name used in logs when the handler fails.
    fn name(&self) -> &str;

    async fn handle(&self, event: &DomainEvent) -> Result<(), RentError>;
}

/// Outcome of a single publish call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    pub failed: usize,
}

/// The event bus. Cheap to share behind an `Arc`.
#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<HashMap<EventType, Vec<Arc<dyn EventHandler>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for one event type.
    pub async fn subscribe(&self, event_type: EventType, handler: Arc<dyn EventHandler>) {
        debug!(event_type = %event_type, handler = handler.name(), "handler subscribed");
        self.handlers
            .write()
            .await
            .entry(event_type)
            .or_default()
            .push(handler);
    }

    /// Registers `handler` for every event type.
    pub async fn subscribe_all(&self, handler: Arc<dyn EventHandler>) {
        let mut handlers = self.handlers.write().await;
        for event_type in EventType::ALL {
            handlers
                .entry(event_type)
                .or_default()
                .push(Arc::clone(&handler));
        }
    }

    pub async fn subscriber_count(&self, event_type: EventType) -> usize {
        self.handlers
            .read()
            .await
            .get(&event_type)
            .map_or(0, Vec::len)
    }

    /// Delivers `event` to a snapshot of the current subscribers.
    pub async fn publish(&self, event: &DomainEvent) -> PublishReport {
        let snapshot: Vec<Arc<dyn EventHandler>> = self
            .handlers
            .read()
            .await
            .get(&event.event_type)
            .cloned()
            .unwrap_or_default();

        let mut report = PublishReport::default();
        for handler in snapshot {
            let outcome = AssertUnwindSafe(handler.handle(event)).catch_unwind().await;
            match outcome {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(e)) => {
                    report.failed += 1;
                    warn!(
                        handler = handler.name(),
                        event_type = %event.event_type,
                        event_id = %event.id,
                        error = %e,
                        "event handler failed"
                    );
                }
                Err(_) => {
                    report.failed += 1;
                    error!(
                        handler = handler.name(),
                        event_type = %event.event_type,
                        event_id = %event.id,
                        "event handler panicked"
                    );
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct Counter {
        hits: AtomicUsize,
    }

    #[async_trait]
    impl EventHandler for Counter {
        fn name(&self) -> &str {
            "counter"
        }

        async fn handle(&self, _event: &DomainEvent) -> Result<(), RentError> {
            self.hits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl EventHandler for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        async fn handle(&self, _event: &DomainEvent) -> Result<(), RentError> {
            Err(RentError::transport("chat down"))
        }
    }

    struct Panicking;

    #[async_trait]
    impl EventHandler for Panicking {
        fn name(&self) -> &str {
            "panicking"
        }

        async fn handle(&self, _event: &DomainEvent) -> Result<(), RentError> {
            panic!("handler bug");
        }
    }

    fn counter() -> Arc<Counter> {
        Arc::new(Counter {
            hits: AtomicUsize::new(0),
        })
    }

    fn event(event_type: EventType) -> DomainEvent {
        DomainEvent::new(event_type, &serde_json::json!({ "booking_id": 1 })).unwrap()
    }

    #[tokio::test]
    async fn delivers_only_to_matching_subscribers() {
        let bus = EventBus::new();
        let created = counter();
        let confirmed = counter();
        bus.subscribe(EventType::BookingCreated, created.clone()).await;
        bus.subscribe(EventType::BookingConfirmed, confirmed.clone())
            .await;

        let report = bus.publish(&event(EventType::BookingCreated)).await;
        assert_eq!(report.delivered, 1);
        assert_eq!(created.hits.load(Ordering::SeqCst), 1);
        assert_eq!(confirmed.hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failures_do_not_stop_siblings() {
        let bus = EventBus::new();
        let after = counter();
        bus.subscribe(EventType::BookingCanceled, Arc::new(Failing))
            .await;
        bus.subscribe(EventType::BookingCanceled, Arc::new(Panicking))
            .await;
        bus.subscribe(EventType::BookingCanceled, after.clone()).await;

        let report = bus.publish(&event(EventType::BookingCanceled)).await;
        assert_eq!(report, PublishReport { delivered: 1, failed: 2 });
        assert_eq!(after.hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn subscribe_all_covers_every_type() {
        let bus = EventBus::new();
        let all = counter();
        bus.subscribe_all(all.clone()).await;
        for event_type in EventType::ALL {
            assert_eq!(bus.subscriber_count(event_type).await, 1);
            bus.publish(&event(event_type)).await;
        }
        assert_eq!(all.hits.load(Ordering::SeqCst), EventType::ALL.len());
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_a_no_op() {
        let bus = EventBus::new();
        let report = bus.publish(&event(EventType::BookingCompleted)).await;
        assert_eq!(report, PublishReport::default());
    }
}
