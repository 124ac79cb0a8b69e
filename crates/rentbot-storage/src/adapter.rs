// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`Store`] trait.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use rentbot_config::model::StorageConfig;
use rentbot_core::types::{
    Booking, BookingStats, BookingStatus, BookingWithAvailability, DailyBookings, Item,
    ItemUpdate, NewBooking, NewItem, SyncJob, SyncTask, SyncTaskKind, User, UserProfile,
    UserState,
};
use rentbot_core::{AdapterType, HealthStatus, PluginAdapter, RentError, Store};

use crate::database::Database;
use crate::queries;

/// SQLite-backed store.
///
/// Wraps a [`Database`] handle and delegates to the typed query modules.
/// The database is opened on the first call to [`Store::initialize`].
pub struct SqliteStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStore {
    /// Create a store for the configured path. Nothing is opened yet.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Wrap an already opened database.
    pub fn from_database(db: Database) -> Self {
        Self {
            config: StorageConfig::default(),
            db: OnceCell::new_with(Some(db)),
        }
    }

    fn db(&self) -> Result<&Database, RentError> {
        self.db.get().ok_or_else(|| RentError::Storage {
            source: "store not initialized -- call initialize() first".into(),
        })
    }

    async fn checkpoint(&self) -> Result<(), RentError> {
        if let Some(db) = self.db.get() {
            db.connection()
                .call(|conn| -> Result<(), rusqlite::Error> {
                    conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                    Ok(())
                })
                .await
                .map_err(crate::database::map_tr_err)?;
            debug!("WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Store
    }

    async fn health_check(&self) -> Result<HealthStatus, RentError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RentError> {
        self.checkpoint().await
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn initialize(&self) -> Result<(), RentError> {
        let path = self.config.database_path.clone();
        let db = Database::open_with(&path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| RentError::Storage {
            source: "store already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite store initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), RentError> {
        self.db()?;
        self.checkpoint().await
    }

    // --- Items ---

    async fn create_item(&self, item: &NewItem, now: DateTime<Utc>) -> Result<Item, RentError> {
        queries::items::create_item(self.db()?, item, now).await
    }

    async fn update_item(
        &self,
        id: i64,
        update: &ItemUpdate,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Item, RentError> {
        queries::items::update_item(self.db()?, id, update, today, now).await
    }

    async fn deactivate_item(&self, id: i64, now: DateTime<Utc>) -> Result<(), RentError> {
        queries::items::deactivate_item(self.db()?, id, now).await
    }

    async fn reorder_item(
        &self,
        id: i64,
        new_order: i64,
        now: DateTime<Utc>,
    ) -> Result<Item, RentError> {
        queries::items::reorder_item(self.db()?, id, new_order, now).await
    }

    async fn get_item_by_id(&self, id: i64) -> Result<Option<Item>, RentError> {
        queries::items::get_item_by_id(self.db()?, id).await
    }

    async fn get_item_by_name(&self, name: &str) -> Result<Option<Item>, RentError> {
        queries::items::get_item_by_name(self.db()?, name).await
    }

    async fn list_active_items_sorted(&self) -> Result<Vec<Item>, RentError> {
        queries::items::list_active_items_sorted(self.db()?).await
    }

    // --- Users ---

    async fn upsert_user(
        &self,
        profile: &UserProfile,
        now: DateTime<Utc>,
    ) -> Result<User, RentError> {
        queries::users::upsert_user(self.db()?, profile, now).await
    }

    async fn get_user_by_platform_id(&self, telegram_id: i64) -> Result<Option<User>, RentError> {
        queries::users::get_user_by_platform_id(self.db()?, telegram_id).await
    }

    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>, RentError> {
        queries::users::get_user_by_id(self.db()?, id).await
    }

    async fn list_all_users(&self) -> Result<Vec<User>, RentError> {
        queries::users::list_all_users(self.db()?).await
    }

    async fn list_active_users_since(&self, since: DateTime<Utc>) -> Result<Vec<User>, RentError> {
        queries::users::list_active_users_since(self.db()?, since).await
    }

    async fn list_users_by_manager_flag(&self, is_manager: bool) -> Result<Vec<User>, RentError> {
        queries::users::list_users_by_manager_flag(self.db()?, is_manager).await
    }

    async fn update_user_phone(
        &self,
        telegram_id: i64,
        phone: &str,
        now: DateTime<Utc>,
    ) -> Result<(), RentError> {
        queries::users::update_user_phone(self.db()?, telegram_id, phone, now).await
    }

    async fn touch_user_activity(
        &self,
        telegram_id: i64,
        now: DateTime<Utc>,
    ) -> Result<(), RentError> {
        queries::users::touch_user_activity(self.db()?, telegram_id, now).await
    }

    // --- Bookings ---

    async fn get_booking(&self, id: i64) -> Result<Option<Booking>, RentError> {
        queries::bookings::get_booking(self.db()?, id).await
    }

    async fn list_bookings_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Booking>, RentError> {
        queries::bookings::list_bookings_in_range(self.db()?, start, end).await
    }

    async fn daily_bookings_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DailyBookings, RentError> {
        queries::bookings::daily_bookings_in_range(self.db()?, start, end).await
    }

    async fn booked_count(&self, item_id: i64, date: NaiveDate) -> Result<i64, RentError> {
        queries::bookings::booked_count(self.db()?, item_id, date).await
    }

    async fn user_bookings(
        &self,
        user_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Booking>, RentError> {
        queries::bookings::user_bookings(self.db()?, user_id, from, to).await
    }

    async fn bookings_on_date(
        &self,
        date: NaiveDate,
        statuses: &[BookingStatus],
    ) -> Result<Vec<Booking>, RentError> {
        queries::bookings::bookings_on_date(self.db()?, date, statuses).await
    }

    async fn list_bookings_by_status(
        &self,
        status: BookingStatus,
    ) -> Result<Vec<Booking>, RentError> {
        queries::bookings::list_bookings_by_status(self.db()?, status).await
    }

    async fn list_all_bookings(&self) -> Result<Vec<Booking>, RentError> {
        queries::bookings::list_all_bookings(self.db()?).await
    }

    async fn create_booking_with_lock(
        &self,
        booking: &NewBooking,
        now: DateTime<Utc>,
    ) -> Result<Booking, RentError> {
        queries::bookings::create_booking_with_lock(self.db()?, booking, now).await
    }

    async fn update_booking_status_with_version(
        &self,
        id: i64,
        expected_version: i64,
        new_status: BookingStatus,
        now: DateTime<Utc>,
    ) -> Result<(), RentError> {
        queries::bookings::update_booking_status_with_version(
            self.db()?,
            id,
            expected_version,
            new_status,
            now,
        )
        .await
    }

    async fn update_booking_item_and_status_with_version(
        &self,
        id: i64,
        expected_version: i64,
        new_item_id: i64,
        new_item_name: &str,
        new_status: BookingStatus,
        now: DateTime<Utc>,
    ) -> Result<(), RentError> {
        queries::bookings::update_booking_item_and_status_with_version(
            self.db()?,
            id,
            expected_version,
            new_item_id,
            new_item_name,
            new_status,
            now,
        )
        .await
    }

    async fn get_booking_with_availability(
        &self,
        id: i64,
        new_item_id: i64,
    ) -> Result<BookingWithAvailability, RentError> {
        queries::bookings::get_booking_with_availability(self.db()?, id, new_item_id).await
    }

    async fn booking_stats(&self, active_since: DateTime<Utc>) -> Result<BookingStats, RentError> {
        queries::bookings::booking_stats(self.db()?, active_since).await
    }

    // --- Outbox ---

    async fn enqueue_task(
        &self,
        job: &SyncJob,
        now: DateTime<Utc>,
    ) -> Result<Option<i64>, RentError> {
        queries::outbox::enqueue_task(self.db()?, job, now).await
    }

    async fn lease_due_pending_tasks(
        &self,
        kind: SyncTaskKind,
        limit: usize,
        now: DateTime<Utc>,
        lease: Duration,
    ) -> Result<Vec<SyncTask>, RentError> {
        queries::outbox::lease_due_pending_tasks(self.db()?, kind, limit, now, lease).await
    }

    async fn mark_completed(&self, id: i64, now: DateTime<Utc>) -> Result<(), RentError> {
        queries::outbox::mark_completed(self.db()?, id, now).await
    }

    async fn mark_retry(
        &self,
        id: i64,
        next_at: DateTime<Utc>,
        error: &str,
    ) -> Result<(), RentError> {
        queries::outbox::mark_retry(self.db()?, id, next_at, error).await
    }

    async fn mark_failed(
        &self,
        id: i64,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<(), RentError> {
        queries::outbox::mark_failed(self.db()?, id, error, now).await
    }

    async fn release_task(&self, id: i64) -> Result<(), RentError> {
        queries::outbox::release_task(self.db()?, id).await
    }

    async fn release_all_leases(&self) -> Result<usize, RentError> {
        queries::outbox::release_all_leases(self.db()?).await
    }

    async fn get_task(&self, id: i64) -> Result<Option<SyncTask>, RentError> {
        queries::outbox::get_task(self.db()?, id).await
    }

    async fn list_failed(&self) -> Result<Vec<SyncTask>, RentError> {
        queries::outbox::list_failed(self.db()?).await
    }

    // --- Conversation ---

    async fn get_state(&self, user_id: i64) -> Result<Option<UserState>, RentError> {
        queries::states::get_state(self.db()?, user_id).await
    }

    async fn set_state(&self, state: &UserState) -> Result<(), RentError> {
        queries::states::set_state(self.db()?, state).await
    }

    async fn clear_state(&self, user_id: i64) -> Result<(), RentError> {
        queries::states::clear_state(self.db()?, user_id).await
    }

    async fn check_rate_limit(
        &self,
        user_id: i64,
        limit: u32,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<bool, RentError> {
        queries::rate_limits::check_rate_limit(self.db()?, user_id, limit, window, now).await
    }
}
