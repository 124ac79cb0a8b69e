// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sink used when no mirror is configured. Accepts and discards every write.

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::trace;

use rentbot_core::types::{AdapterType, DailyBookings, HealthStatus};
use rentbot_core::{Booking, BookingStatus, Item, MirrorSink, PluginAdapter, RentError, User};

#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait]
impl PluginAdapter for NullSink {
    fn name(&self) -> &str {
        "null-mirror"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Sink
    }

    async fn health_check(&self) -> Result<HealthStatus, RentError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RentError> {
        Ok(())
    }
}

#[async_trait]
impl MirrorSink for NullSink {
    async fn upsert_booking(&self, booking: &Booking) -> Result<(), RentError> {
        trace!(booking_id = booking.id, "null mirror: upsert");
        Ok(())
    }

    async fn update_booking_status(
        &self,
        booking_id: i64,
        status: BookingStatus,
    ) -> Result<(), RentError> {
        trace!(booking_id, status = %status, "null mirror: status");
        Ok(())
    }

    async fn replace_bookings(&self, _bookings: &[Booking]) -> Result<(), RentError> {
        Ok(())
    }

    async fn update_users(&self, _users: &[User]) -> Result<(), RentError> {
        Ok(())
    }

    async fn update_schedule(
        &self,
        _start: NaiveDate,
        _end: NaiveDate,
        _daily: &DailyBookings,
        _items: &[Item],
    ) -> Result<(), RentError> {
        Ok(())
    }
}
