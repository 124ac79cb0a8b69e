// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store trait: the single owner of all persistent state.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::error::RentError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    Booking, BookingStats, BookingStatus, BookingWithAvailability, DailyBookings, Item,
    ItemUpdate, NewBooking, NewItem, SyncJob, SyncTask, SyncTaskKind, User, UserProfile,
    UserState,
};

/// Transactional persistence for items, users, bookings, conversation state,
/// rate limits, and the sync outbox.
///
/// Only the store mutates persistent state. Availability invariants are
/// enforced here so that concurrent writers cannot oversubscribe an item.
#[async_trait]
pub trait Store: PluginAdapter {
    /// Opens the backend and applies pending migrations.
    async fn initialize(&self) -> Result<(), RentError>;

    /// Flushes pending writes and releases the backend.
    async fn close(&self) -> Result<(), RentError>;

    // --- Items ---

    /// Inserts an active item with `sort_order = max(sort_order) + 1`.
    async fn create_item(&self, item: &NewItem, now: DateTime<Utc>) -> Result<Item, RentError>;

    /// Applies a partial update. A capacity decrease that would leave any day
    /// from `today` onward oversubscribed is rejected with `Validation`.
    async fn update_item(
        &self,
        id: i64,
        update: &ItemUpdate,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Item, RentError>;

    /// Clears the active flag; bookings keep referring to the item.
    async fn deactivate_item(&self, id: i64, now: DateTime<Utc>) -> Result<(), RentError>;

    /// Sets the sort position, clamped to at least 1.
    async fn reorder_item(
        &self,
        id: i64,
        new_order: i64,
        now: DateTime<Utc>,
    ) -> Result<Item, RentError>;

    async fn get_item_by_id(&self, id: i64) -> Result<Option<Item>, RentError>;

    /// Case-insensitive lookup among active items.
    async fn get_item_by_name(&self, name: &str) -> Result<Option<Item>, RentError>;

    /// Active items ordered by `(sort_order, name)`.
    async fn list_active_items_sorted(&self) -> Result<Vec<Item>, RentError>;

    // --- Users ---

    async fn upsert_user(
        &self,
        profile: &UserProfile,
        now: DateTime<Utc>,
    ) -> Result<User, RentError>;

    async fn get_user_by_platform_id(&self, telegram_id: i64) -> Result<Option<User>, RentError>;

    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>, RentError>;

    async fn list_all_users(&self) -> Result<Vec<User>, RentError>;

    /// Users whose last activity is at or after `since`.
    async fn list_active_users_since(&self, since: DateTime<Utc>) -> Result<Vec<User>, RentError>;

    async fn list_users_by_manager_flag(&self, is_manager: bool) -> Result<Vec<User>, RentError>;

    async fn update_user_phone(
        &self,
        telegram_id: i64,
        phone: &str,
        now: DateTime<Utc>,
    ) -> Result<(), RentError>;

    /// Updates only `last_activity`.
    async fn touch_user_activity(
        &self,
        telegram_id: i64,
        now: DateTime<Utc>,
    ) -> Result<(), RentError>;

    // --- Bookings ---

    async fn get_booking(&self, id: i64) -> Result<Option<Booking>, RentError>;

    /// Bookings with `start <= date <= end`, sorted by date then id.
    async fn list_bookings_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Booking>, RentError>;

    /// Bookings in `[start, end]` grouped per day.
    async fn daily_bookings_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DailyBookings, RentError>;

    /// Number of ACTIVE bookings holding `item_id` on `date`.
    async fn booked_count(&self, item_id: i64, date: NaiveDate) -> Result<i64, RentError>;

    /// Bookings owned by `user_id` with `from <= date <= to`.
    async fn user_bookings(
        &self,
        user_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Booking>, RentError>;

    /// Bookings on `date` whose status is one of `statuses`.
    async fn bookings_on_date(
        &self,
        date: NaiveDate,
        statuses: &[BookingStatus],
    ) -> Result<Vec<Booking>, RentError>;

    /// Bookings in a given status, oldest date first.
    async fn list_bookings_by_status(
        &self,
        status: BookingStatus,
    ) -> Result<Vec<Booking>, RentError>;

    /// Every booking, sorted by date then id.
    async fn list_all_bookings(&self) -> Result<Vec<Booking>, RentError>;

    /// Race-free insert: recomputes the booked count inside a serialisable
    /// transaction and inserts with `version = 1` only when capacity remains.
    async fn create_booking_with_lock(
        &self,
        booking: &NewBooking,
        now: DateTime<Utc>,
    ) -> Result<Booking, RentError>;

    /// Sets a new status when the stored version equals `expected_version`.
    async fn update_booking_status_with_version(
        &self,
        id: i64,
        expected_version: i64,
        new_status: BookingStatus,
        now: DateTime<Utc>,
    ) -> Result<(), RentError>;

    /// Moves the booking to another item and status under the version check.
    async fn update_booking_item_and_status_with_version(
        &self,
        id: i64,
        expected_version: i64,
        new_item_id: i64,
        new_item_name: &str,
        new_status: BookingStatus,
        now: DateTime<Utc>,
    ) -> Result<(), RentError>;

    /// Reads a booking and whether `new_item_id` has a free unit on its date,
    /// in a single snapshot.
    async fn get_booking_with_availability(
        &self,
        id: i64,
        new_item_id: i64,
    ) -> Result<BookingWithAvailability, RentError>;

    /// Aggregate counts for the statistics view.
    async fn booking_stats(&self, active_since: DateTime<Utc>) -> Result<BookingStats, RentError>;

    // --- Outbox ---

    /// Appends a task. Returns `None` when an identical schedule resync is
    /// already waiting and the new one was coalesced into it.
    async fn enqueue_task(&self, job: &SyncJob, now: DateTime<Utc>)
    -> Result<Option<i64>, RentError>;

    /// Leases up to `limit` due tasks of `kind`, oldest first, skipping tasks
    /// whose booking still has an earlier unfinished task.
    async fn lease_due_pending_tasks(
        &self,
        kind: SyncTaskKind,
        limit: usize,
        now: DateTime<Utc>,
        lease: Duration,
    ) -> Result<Vec<SyncTask>, RentError>;

    async fn mark_completed(&self, id: i64, now: DateTime<Utc>) -> Result<(), RentError>;

    /// Increments the retry count and schedules the next attempt.
    async fn mark_retry(
        &self,
        id: i64,
        next_at: DateTime<Utc>,
        error: &str,
    ) -> Result<(), RentError>;

    /// Increments the retry count and parks the task permanently.
    async fn mark_failed(&self, id: i64, error: &str, now: DateTime<Utc>)
    -> Result<(), RentError>;

    /// Returns a leased task to `pending` without counting an attempt.
    async fn release_task(&self, id: i64) -> Result<(), RentError>;

    /// Returns every leased task to `pending`. Used at startup.
    async fn release_all_leases(&self) -> Result<usize, RentError>;

    async fn get_task(&self, id: i64) -> Result<Option<SyncTask>, RentError>;

    async fn list_failed(&self) -> Result<Vec<SyncTask>, RentError>;

    // --- Conversation ---

    async fn get_state(&self, user_id: i64) -> Result<Option<UserState>, RentError>;

    /// Replaces the whole state row.
    async fn set_state(&self, state: &UserState) -> Result<(), RentError>;

    async fn clear_state(&self, user_id: i64) -> Result<(), RentError>;

    /// Atomically checks and advances the user's sliding-window counter.
    /// Returns `true` when the attempt is allowed.
    async fn check_rate_limit(
        &self,
        user_id: i64,
        limit: u32,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<bool, RentError>;
}
