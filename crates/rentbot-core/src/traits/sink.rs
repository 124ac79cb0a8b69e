// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Spreadsheet mirror sink driven by the sync worker.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::RentError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Booking, BookingStatus, DailyBookings, Item, User};

/// External mirror of the authoritative booking state.
///
/// Implementations must be idempotent per booking id: the outbox delivers
/// at least once, so the same upsert may arrive more than once.
#[async_trait]
pub trait MirrorSink: PluginAdapter {
    /// Appends a booking row. Defaults to an upsert, which is append-or-update.
    async fn append_booking(&self, booking: &Booking) -> Result<(), RentError> {
        self.upsert_booking(booking).await
    }

    /// Inserts the booking row or replaces the existing row with the same id.
    async fn upsert_booking(&self, booking: &Booking) -> Result<(), RentError>;

    /// Patches only the status column of a booking row.
    async fn update_booking_status(
        &self,
        booking_id: i64,
        status: BookingStatus,
    ) -> Result<(), RentError>;

    /// Rewrites the whole bookings sheet.
    async fn replace_bookings(&self, bookings: &[Booking]) -> Result<(), RentError>;

    /// Rewrites the users sheet.
    async fn update_users(&self, users: &[User]) -> Result<(), RentError>;

    /// Rewrites the day x item occupancy grid for `[start, end]`.
    async fn update_schedule(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        daily: &DailyBookings,
        items: &[Item],
    ) -> Result<(), RentError>;
}
