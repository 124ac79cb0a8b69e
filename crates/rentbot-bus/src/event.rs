// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event envelope carried on the bus.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use rentbot_core::BookingEvent;

/// Type tag of a domain event.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    BookingCreated,
    BookingConfirmed,
    BookingCanceled,
    BookingCompleted,
    BookingItemChanged,
}

impl EventType {
    pub const ALL: [EventType; 5] = [
        EventType::BookingCreated,
        EventType::BookingConfirmed,
        EventType::BookingCanceled,
        EventType::BookingCompleted,
        EventType::BookingItemChanged,
    ];
}

/// A published event: type tag, JSON payload, creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    pub id: String,
    pub event_type: EventType,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl DomainEvent {
    pub fn new<T: Serialize>(event_type: EventType, payload: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            event_type,
            payload: serde_json::to_value(payload)?,
            created_at: Utc::now(),
        })
    }

    /// Builds a booking event envelope.
    pub fn booking(event_type: EventType, event: &BookingEvent) -> Result<Self, serde_json::Error> {
        Self::new(event_type, event)
    }

    /// Decodes the payload into `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }

    /// Decodes the payload as a [`BookingEvent`].
    pub fn booking_event(&self) -> Result<BookingEvent, serde_json::Error> {
        self.decode()
    }
}
