// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat notifications driven by booking events.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use rentbot_bus::{DomainEvent, EventHandler, EventType};
use rentbot_core::chat::{Markup, OutboundMessage};
use rentbot_core::{BookingStatus, ChatChannel, RentError};

use crate::keyboards;
use crate::texts;

/// Sends new requests to every manager and status changes to the owner.
///
/// A booking created by a manager is already confirmed, so managers are
/// only told about pending requests. Owners are not told about their own
/// actions.
pub struct NotificationHandler {
    channel: Arc<dyn ChatChannel>,
    managers: Vec<i64>,
}

impl NotificationHandler {
    pub fn new(channel: Arc<dyn ChatChannel>, managers: Vec<i64>) -> Self {
        Self { channel, managers }
    }
}

#[async_trait]
impl EventHandler for NotificationHandler {
    fn name(&self) -> &str {
        "chat-notifier"
    }

    async fn handle(&self, event: &DomainEvent) -> Result<(), RentError> {
        let payload = event
            .booking_event()
            .map_err(|e| RentError::Internal(format!("undecodable booking event: {e}")))?;
        let booking = payload.booking;

        if event.event_type == EventType::BookingCreated {
            if booking.status != BookingStatus::Pending {
                return Ok(());
            }
            let text = texts::new_booking_for_managers(&booking);
            let markup = Markup::Inline(keyboards::booking_actions(&booking));
            let mut first_error = None;
            for &manager in &self.managers {
                let msg = OutboundMessage::text(manager, text.clone()).with_markup(markup.clone());
                if let Err(e) = self.channel.send(msg).await {
                    warn!(manager_id = manager, booking_id = booking.id, error = %e, "manager notification failed");
                    first_error.get_or_insert(e);
                }
            }
            debug!(booking_id = booking.id, managers = self.managers.len(), "managers notified");
            return first_error.map_or(Ok(()), Err);
        }

        if payload.actor_id == Some(booking.user_id) {
            return Ok(());
        }
        self.channel
            .send(OutboundMessage::text(
                booking.user_id,
                texts::owner_update(&booking),
            ))
            .await?;
        debug!(booking_id = booking.id, user_id = booking.user_id, event = %event.event_type, "owner notified");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use rentbot_core::{Booking, BookingEvent};
    use rentbot_test_utils::MockChannel;

    use super::*;

    fn event(event_type: EventType, status: BookingStatus, actor: i64) -> DomainEvent {
        let now = Utc::now();
        let booking = Booking {
            id: 7,
            user_id: 500,
            user_name: "Ivan".into(),
            username: None,
            phone: "79991234567".into(),
            item_id: 1,
            item_name: "Kayak".into(),
            date: NaiveDate::from_ymd_opt(2025, 6, 5).unwrap(),
            status,
            comment: None,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        DomainEvent::booking(
            event_type,
            &BookingEvent {
                booking,
                actor_id: Some(actor),
                previous_item_id: None,
            },
        )
        .unwrap()
    }

    fn notifier(channel: &Arc<MockChannel>) -> NotificationHandler {
        NotificationHandler::new(channel.clone(), vec![1, 2])
    }

    #[tokio::test]
    async fn pending_request_reaches_every_manager_with_actions() {
        let channel = Arc::new(MockChannel::new());
        notifier(&channel)
            .handle(&event(EventType::BookingCreated, BookingStatus::Pending, 500))
            .await
            .unwrap();

        for manager in [1, 2] {
            let sent = channel.sent_to(manager).await;
            assert_eq!(sent.len(), 1);
            let markup = sent[0].markup.as_ref().unwrap();
            assert!(markup.callback_data().contains(&"confirm_7"));
        }
        assert!(channel.sent_to(500).await.is_empty());
    }

    #[tokio::test]
    async fn manager_created_booking_is_not_announced() {
        let channel = Arc::new(MockChannel::new());
        notifier(&channel)
            .handle(&event(EventType::BookingCreated, BookingStatus::Confirmed, 1))
            .await
            .unwrap();
        assert_eq!(channel.sent_count().await, 0);
    }

    #[tokio::test]
    async fn confirmation_goes_to_the_owner() {
        let channel = Arc::new(MockChannel::new());
        notifier(&channel)
            .handle(&event(EventType::BookingConfirmed, BookingStatus::Confirmed, 1))
            .await
            .unwrap();
        let text = channel.last_text(500).await.unwrap();
        assert!(text.contains("confirmed"));
    }

    #[tokio::test]
    async fn send_failures_surface_to_the_bus() {
        let channel = Arc::new(MockChannel::new());
        channel.set_fail_sends(true);
        let result = notifier(&channel)
            .handle(&event(EventType::BookingCanceled, BookingStatus::Canceled, 1))
            .await;
        assert!(result.is_err());
    }
}
