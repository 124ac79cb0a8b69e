// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scriptable in-memory mirror sink.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::{Mutex, Notify, OwnedRwLockWriteGuard, RwLock};

use rentbot_core::types::{AdapterType, DailyBookings, HealthStatus};
use rentbot_core::{Booking, BookingStatus, Item, MirrorSink, PluginAdapter, RentError, User};

/// One call the sink received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCall {
    Upsert(i64),
    UpdateStatus(i64, BookingStatus),
    ReplaceBookings(usize),
    UpdateUsers(usize),
    UpdateSchedule { start: NaiveDate, end: NaiveDate },
}

/// In-memory mirror that records calls and fails on demand.
///
/// Failed calls are recorded too, so tests can count attempts.
#[derive(Default)]
pub struct MockSink {
    calls: Mutex<Vec<SinkCall>>,
    rows: Mutex<BTreeMap<i64, Booking>>,
    pending_failures: AtomicUsize,
    replace_started: Notify,
    replace_hold: Arc<RwLock<()>>,
}

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `n` calls fail with a transport error.
    pub fn fail_next(&self, n: usize) {
        self.pending_failures.store(n, Ordering::SeqCst);
    }

    /// Parks every `replace_bookings` call until the guard is dropped.
    pub async fn hold_replacements(&self) -> OwnedRwLockWriteGuard<()> {
        self.replace_hold.clone().write_owned().await
    }

    /// Resolves once a `replace_bookings` call has begun.
    pub async fn replacement_started(&self) {
        self.replace_started.notified().await;
    }

    pub async fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().await.clone()
    }

    /// Mirrored booking rows keyed by id.
    pub async fn rows(&self) -> BTreeMap<i64, Booking> {
        self.rows.lock().await.clone()
    }

    async fn record(&self, call: SinkCall) -> Result<(), RentError> {
        self.calls.lock().await.push(call);
        let failed = self
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(RentError::transport("mock sink unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for MockSink {
    fn name(&self) -> &str {
        "mock-sink"
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
impl MirrorSink for MockSink {
    async fn upsert_booking(&self, booking: &Booking) -> Result<(), RentError> {
        self.record(SinkCall::Upsert(booking.id)).await?;
        self.rows.lock().await.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn update_booking_status(
        &self,
        booking_id: i64,
        status: BookingStatus,
    ) -> Result<(), RentError> {
        self.record(SinkCall::UpdateStatus(booking_id, status)).await?;
        if let Some(row) = self.rows.lock().await.get_mut(&booking_id) {
            row.status = status;
        }
        Ok(())
    }

    async fn replace_bookings(&self, bookings: &[Booking]) -> Result<(), RentError> {
        self.replace_started.notify_one();
        let _held = self.replace_hold.read().await;
        self.record(SinkCall::ReplaceBookings(bookings.len())).await?;
        *self.rows.lock().await = bookings.iter().map(|b| (b.id, b.clone())).collect();
        Ok(())
    }

    async fn update_users(&self, users: &[User]) -> Result<(), RentError> {
        self.record(SinkCall::UpdateUsers(users.len())).await
    }

    async fn update_schedule(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        _daily: &DailyBookings,
        _items: &[Item],
    ) -> Result<(), RentError> {
        self.record(SinkCall::UpdateSchedule { start, end }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_failures_are_consumed_in_order() {
        let sink = MockSink::new();
        sink.fail_next(1);
        assert!(sink.update_users(&[]).await.is_err());
        assert!(sink.update_users(&[]).await.is_ok());
        assert_eq!(
            sink.calls().await,
            vec![SinkCall::UpdateUsers(0), SinkCall::UpdateUsers(0)]
        );
    }
}
