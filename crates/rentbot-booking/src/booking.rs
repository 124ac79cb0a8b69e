// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The booking lifecycle service.
//!
//! Every mutation goes through the store's race-free or version-checked
//! operations, then publishes a domain event and appends outbox tasks.
//! This service is the only writer of the outbox.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use tracing::{debug, error, info, warn};

use rentbot_bus::{DomainEvent, EventBus, EventType};
use rentbot_core::types::{BookingStats, NewBooking};
use rentbot_core::{Booking, BookingEvent, BookingStatus, Clock, RentError, Store, SyncJob};

use crate::rules::BookingRules;

/// Window used for the "active users" statistic.
const ACTIVE_USER_DAYS: i64 = 30;

/// Client details for bookings a manager enters on someone's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerBookingRequest {
    /// Platform id of the manager; owns the resulting bookings.
    pub manager_id: i64,
    pub client_name: String,
    pub client_phone: String,
    pub item_id: i64,
    pub comment: Option<String>,
}

/// A date that could not be booked in a manager batch.
#[derive(Debug)]
pub struct FailedDate {
    pub date: NaiveDate,
    pub error: RentError,
}

/// Result of [`BookingService::create_manager_bookings`].
#[derive(Debug, Default)]
pub struct ManagerBookingOutcome {
    pub created: Vec<Booking>,
    pub failed: Vec<FailedDate>,
}

/// Occupancy of one item on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub booked: i64,
    pub capacity: i64,
}

impl DayAvailability {
    pub fn free(&self) -> i64 {
        (self.capacity - self.booked).max(0)
    }
}

pub struct BookingService {
    store: Arc<dyn Store>,
    bus: Arc<EventBus>,
    clock: Arc<dyn Clock>,
    rules: BookingRules,
}

impl BookingService {
    pub fn new(
        store: Arc<dyn Store>,
        bus: Arc<EventBus>,
        clock: Arc<dyn Clock>,
        rules: BookingRules,
    ) -> Self {
        Self {
            store,
            bus,
            clock,
            rules,
        }
    }

    pub fn rules(&self) -> &BookingRules {
        &self.rules
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn today(&self) -> NaiveDate {
        self.rules.today(self.clock.now())
    }

    pub fn validate_date(&self, date: NaiveDate) -> Result<(), RentError> {
        self.rules.validate_date(date, self.clock.now())
    }

    /// Whether `item_id` still has a free unit on `date`.
    pub async fn check_availability(&self, item_id: i64, date: NaiveDate) -> Result<bool, RentError> {
        let item = self
            .store
            .get_item_by_id(item_id)
            .await?
            .filter(|item| item.is_active)
            .ok_or_else(|| RentError::not_found("item", item_id))?;
        let booked = self.store.booked_count(item_id, date).await?;
        Ok(booked < item.total_quantity)
    }

    /// Submits a user booking request. The booking starts `pending`.
    pub async fn create_booking(&self, mut booking: NewBooking) -> Result<Booking, RentError> {
        self.validate_date(booking.date)?;
        if !self.check_availability(booking.item_id, booking.date).await? {
            return Err(RentError::NotAvailable);
        }
        booking.status = BookingStatus::Pending;
        let actor = booking.user_id;
        let created = self
            .store
            .create_booking_with_lock(&booking, self.clock.now())
            .await?;
        info!(
            booking_id = created.id,
            user_id = created.user_id,
            item_id = created.item_id,
            date = %created.date,
            "booking created"
        );
        self.emit(EventType::BookingCreated, &created, Some(actor), None)
            .await;
        self.enqueue(SyncJob::Upsert {
            booking: created.clone(),
        })
        .await;
        self.enqueue_schedule().await;
        Ok(created)
    }

    /// Creates one confirmed booking per date. Dates that fail validation or
    /// capacity are reported in `failed`; the rest are still created.
    pub async fn create_manager_bookings(
        &self,
        request: &ManagerBookingRequest,
        dates: &[NaiveDate],
    ) -> Result<ManagerBookingOutcome, RentError> {
        let item = self
            .store
            .get_item_by_id(request.item_id)
            .await?
            .filter(|item| item.is_active)
            .ok_or_else(|| RentError::not_found("item", request.item_id))?;

        let mut outcome = ManagerBookingOutcome::default();
        for &date in dates {
            if let Err(error) = self.validate_date(date) {
                outcome.failed.push(FailedDate { date, error });
                continue;
            }
            let new = NewBooking {
                user_id: request.manager_id,
                user_name: request.client_name.clone(),
                username: None,
                phone: request.client_phone.clone(),
                item_id: item.id,
                item_name: item.name.clone(),
                date,
                status: BookingStatus::Confirmed,
                comment: request.comment.clone(),
            };
            match self
                .store
                .create_booking_with_lock(&new, self.clock.now())
                .await
            {
                Ok(created) => {
                    self.emit(
                        EventType::BookingCreated,
                        &created,
                        Some(request.manager_id),
                        None,
                    )
                    .await;
                    self.enqueue(SyncJob::Upsert {
                        booking: created.clone(),
                    })
                    .await;
                    outcome.created.push(created);
                }
                Err(error) if error.is_domain() => {
                    outcome.failed.push(FailedDate { date, error });
                }
                Err(error) => return Err(error),
            }
        }

        info!(
            manager_id = request.manager_id,
            item_id = item.id,
            created = outcome.created.len(),
            failed = outcome.failed.len(),
            "manager bookings processed"
        );
        if !outcome.created.is_empty() {
            self.enqueue_schedule().await;
        }
        Ok(outcome)
    }

    pub async fn confirm_booking(
        &self,
        id: i64,
        expected_version: i64,
        actor_id: i64,
    ) -> Result<Booking, RentError> {
        self.transition(id, expected_version, BookingStatus::Confirmed, actor_id)
            .await
    }

    pub async fn reject_booking(
        &self,
        id: i64,
        expected_version: i64,
        actor_id: i64,
    ) -> Result<Booking, RentError> {
        self.transition(id, expected_version, BookingStatus::Canceled, actor_id)
            .await
    }

    pub async fn complete_booking(
        &self,
        id: i64,
        expected_version: i64,
        actor_id: i64,
    ) -> Result<Booking, RentError> {
        self.transition(id, expected_version, BookingStatus::Completed, actor_id)
            .await
    }

    /// Moves a confirmed booking back to `pending`.
    pub async fn reopen_booking(
        &self,
        id: i64,
        expected_version: i64,
        actor_id: i64,
    ) -> Result<Booking, RentError> {
        self.transition(id, expected_version, BookingStatus::Pending, actor_id)
            .await
    }

    /// Marks the booking as waiting for a new date. The slot stays occupied.
    pub async fn reschedule_booking(
        &self,
        id: i64,
        expected_version: i64,
        actor_id: i64,
    ) -> Result<Booking, RentError> {
        self.transition(id, expected_version, BookingStatus::Rescheduled, actor_id)
            .await
    }

    /// Moves the booking to another item on the same date.
    pub async fn change_item(
        &self,
        id: i64,
        expected_version: i64,
        new_item_id: i64,
        actor_id: i64,
    ) -> Result<Booking, RentError> {
        let new_item = self
            .store
            .get_item_by_id(new_item_id)
            .await?
            .filter(|item| item.is_active)
            .ok_or_else(|| RentError::not_found("item", new_item_id))?;

        let snapshot = self
            .store
            .get_booking_with_availability(id, new_item_id)
            .await?;
        let current = snapshot.booking;
        if current.version != expected_version {
            return Err(RentError::ConcurrentModification);
        }
        if !current.status.can_transition_to(BookingStatus::Changed) {
            return Err(RentError::InvalidTransition {
                from: current.status,
                to: BookingStatus::Changed,
            });
        }
        if !snapshot.available {
            return Err(RentError::NotAvailable);
        }

        self.store
            .update_booking_item_and_status_with_version(
                id,
                expected_version,
                new_item.id,
                &new_item.name,
                BookingStatus::Changed,
                self.clock.now(),
            )
            .await?;
        let updated = self.load(id).await?;
        info!(
            booking_id = id,
            from_item = current.item_id,
            to_item = new_item.id,
            version = updated.version,
            "booking item changed"
        );
        self.emit(
            EventType::BookingItemChanged,
            &updated,
            Some(actor_id),
            Some(current.item_id),
        )
        .await;
        self.enqueue(SyncJob::Upsert {
            booking: updated.clone(),
        })
        .await;
        self.enqueue_schedule().await;
        Ok(updated)
    }

    async fn transition(
        &self,
        id: i64,
        expected_version: i64,
        to: BookingStatus,
        actor_id: i64,
    ) -> Result<Booking, RentError> {
        let current = self.load(id).await?;
        if current.version != expected_version {
            return Err(RentError::ConcurrentModification);
        }
        if !current.status.can_transition_to(to) {
            return Err(RentError::InvalidTransition {
                from: current.status,
                to,
            });
        }
        self.store
            .update_booking_status_with_version(id, expected_version, to, self.clock.now())
            .await?;
        let updated = self.load(id).await?;
        info!(
            booking_id = id,
            from = %current.status,
            to = %to,
            version = updated.version,
            actor_id,
            "booking status changed"
        );

        if let Some(event_type) = event_for(to) {
            self.emit(event_type, &updated, Some(actor_id), None).await;
        }
        self.enqueue(SyncJob::UpdateStatus {
            booking_id: id,
            status: to,
        })
        .await;
        self.enqueue_schedule().await;
        Ok(updated)
    }

    async fn load(&self, id: i64) -> Result<Booking, RentError> {
        self.store
            .get_booking(id)
            .await?
            .ok_or_else(|| RentError::not_found("booking", id))
    }

    async fn emit(
        &self,
        event_type: EventType,
        booking: &Booking,
        actor_id: Option<i64>,
        previous_item_id: Option<i64>,
    ) {
        let payload = BookingEvent {
            booking: booking.clone(),
            actor_id,
            previous_item_id,
        };
        match DomainEvent::booking(event_type, &payload) {
            Ok(event) => {
                let report = self.bus.publish(&event).await;
                debug!(
                    event_type = %event_type,
                    booking_id = booking.id,
                    delivered = report.delivered,
                    failed = report.failed,
                    "event published"
                );
            }
            Err(e) => warn!(
                event_type = %event_type,
                booking_id = booking.id,
                error = %e,
                "failed to encode event"
            ),
        }
    }

    /// The booking row is already committed, so an enqueue failure is
    /// logged rather than returned.
    async fn enqueue(&self, job: SyncJob) {
        let kind = job.kind();
        let booking_id = job.booking_id();
        if let Err(e) = self.store.enqueue_task(&job, self.clock.now()).await {
            error!(kind = %kind, booking_id = ?booking_id, error = %e, "failed to enqueue sync task");
        }
    }

    async fn enqueue_schedule(&self) {
        let (start, end) = self.rules.schedule_window(self.clock.now());
        self.enqueue(SyncJob::SyncSchedule { start, end }).await;
    }

    // --- Reads ---

    pub async fn get_booking(&self, id: i64) -> Result<Booking, RentError> {
        self.load(id).await
    }

    /// The user's bookings from today up to the booking horizon.
    pub async fn user_upcoming_bookings(&self, user_id: i64) -> Result<Vec<Booking>, RentError> {
        let now = self.clock.now();
        self.store
            .user_bookings(user_id, self.rules.today(now), self.rules.horizon(now))
            .await
    }

    pub async fn bookings_by_status(&self, status: BookingStatus) -> Result<Vec<Booking>, RentError> {
        self.store.list_bookings_by_status(status).await
    }

    pub async fn bookings_on(&self, date: NaiveDate) -> Result<Vec<Booking>, RentError> {
        self.store.list_bookings_in_range(date, date).await
    }

    pub async fn all_bookings(&self) -> Result<Vec<Booking>, RentError> {
        self.store.list_all_bookings().await
    }

    /// Bookings on `date` that should get a day-before reminder.
    pub async fn reminder_candidates(&self, date: NaiveDate) -> Result<Vec<Booking>, RentError> {
        self.store
            .bookings_on_date(date, &BookingStatus::REMINDABLE)
            .await
    }

    /// Per-day occupancy of one item for `days` days from `start`.
    pub async fn item_schedule(
        &self,
        item_id: i64,
        start: NaiveDate,
        days: u32,
    ) -> Result<Vec<DayAvailability>, RentError> {
        let item = self
            .store
            .get_item_by_id(item_id)
            .await?
            .ok_or_else(|| RentError::not_found("item", item_id))?;
        let end = start + TimeDelta::days(i64::from(days.max(1)) - 1);
        let daily = self.store.daily_bookings_in_range(start, end).await?;
        Ok(start
            .iter_days()
            .take_while(|d| *d <= end)
            .map(|date| {
                let booked = daily
                    .get(&date)
                    .map(|list| {
                        list.iter()
                            .filter(|b| b.item_id == item_id && b.status.is_active())
                            .count() as i64
                    })
                    .unwrap_or(0);
                DayAvailability {
                    date,
                    booked,
                    capacity: item.total_quantity,
                }
            })
            .collect())
    }

    pub async fn stats(&self) -> Result<BookingStats, RentError> {
        let since = self.clock.now() - TimeDelta::days(ACTIVE_USER_DAYS);
        self.store.booking_stats(since).await
    }
}

fn event_for(status: BookingStatus) -> Option<EventType> {
    match status {
        BookingStatus::Confirmed => Some(EventType::BookingConfirmed),
        BookingStatus::Canceled => Some(EventType::BookingCanceled),
        BookingStatus::Completed => Some(EventType::BookingCompleted),
        BookingStatus::Changed => Some(EventType::BookingItemChanged),
        BookingStatus::Pending | BookingStatus::Rescheduled => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reopen_and_reschedule_emit_nothing() {
        assert_eq!(event_for(BookingStatus::Pending), None);
        assert_eq!(event_for(BookingStatus::Rescheduled), None);
        assert_eq!(
            event_for(BookingStatus::Canceled),
            Some(EventType::BookingCanceled)
        );
    }

    #[test]
    fn free_units_never_negative() {
        let day = DayAvailability {
            date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            booked: 3,
            capacity: 2,
        };
        assert_eq!(day.free(), 0);
    }
}
