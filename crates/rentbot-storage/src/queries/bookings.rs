// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Booking queries, including the race-free insert and optimistic updates.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use rentbot_core::types::{
    Booking, BookingStats, BookingStatus, BookingWithAvailability, DailyBookings, NewBooking,
};
use rentbot_core::RentError;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension, TransactionBehavior};
use tracing::{debug, warn};

use crate::database::{is_busy, Database};
use crate::models::{booking_from_row, fmt_date, fmt_ts, BOOKING_COLUMNS};
use crate::queries::{map_tx_err, placeholders, TxError};

/// Attempts of the locked insert before reporting a conflict.
const LOCK_ATTEMPTS: u32 = 3;
const LOCK_BACKOFF: Duration = Duration::from_millis(50);

fn load(conn: &rusqlite::Connection, id: i64) -> rusqlite::Result<Option<Booking>> {
    conn.query_row(
        &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
        params![id],
        booking_from_row,
    )
    .optional()
}

/// Active bookings of `item_id` on `date`, ignoring `exclude_id`.
fn active_count(
    conn: &rusqlite::Connection,
    item_id: i64,
    date: &str,
    exclude_id: Option<i64>,
) -> rusqlite::Result<i64> {
    conn.query_row(
        &format!(
            "SELECT COUNT(*) FROM bookings
             WHERE item_id = ?1 AND date = ?2 AND status IN ({}) AND id != ?3",
            BookingStatus::active_sql_list()
        ),
        params![item_id, date, exclude_id.unwrap_or(-1)],
        |row| row.get(0),
    )
}

/// Capacity of an active item.
fn capacity(conn: &rusqlite::Connection, item_id: i64) -> Result<i64, TxError> {
    let qty: Option<i64> = conn
        .query_row(
            "SELECT total_quantity FROM items WHERE id = ?1 AND is_active = 1",
            params![item_id],
            |row| row.get(0),
        )
        .optional()?;
    qty.ok_or_else(|| RentError::not_found("item", item_id).into())
}

async fn query_list(
    db: &Database,
    clause: String,
    args: Vec<Value>,
) -> Result<Vec<Booking>, RentError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings {clause} ORDER BY date ASC, id ASC"
            ))?;
            let rows = stmt.query_map(params_from_iter(args.iter()), booking_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn get_booking(db: &Database, id: i64) -> Result<Option<Booking>, RentError> {
    db.connection()
        .call(move |conn| load(conn, id))
        .await
        .map_err(crate::database::map_tr_err)
}

/// Bookings with `start <= date <= end`, sorted by date then id.
pub async fn list_bookings_in_range(
    db: &Database,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<Booking>, RentError> {
    query_list(
        db,
        "WHERE date >= ?1 AND date <= ?2".into(),
        vec![Value::Text(fmt_date(start)), Value::Text(fmt_date(end))],
    )
    .await
}

/// Bookings in `[start, end]` grouped per day. Days without bookings are absent.
pub async fn daily_bookings_in_range(
    db: &Database,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<DailyBookings, RentError> {
    let mut daily = DailyBookings::new();
    for booking in list_bookings_in_range(db, start, end).await? {
        daily.entry(booking.date).or_default().push(booking);
    }
    Ok(daily)
}

/// Number of ACTIVE bookings holding `item_id` on `date`.
pub async fn booked_count(db: &Database, item_id: i64, date: NaiveDate) -> Result<i64, RentError> {
    let date = fmt_date(date);
    db.connection()
        .call(move |conn| active_count(conn, item_id, &date, None))
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn user_bookings(
    db: &Database,
    user_id: i64,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<Booking>, RentError> {
    query_list(
        db,
        "WHERE user_id = ?1 AND date >= ?2 AND date <= ?3".into(),
        vec![
            Value::Integer(user_id),
            Value::Text(fmt_date(from)),
            Value::Text(fmt_date(to)),
        ],
    )
    .await
}

pub async fn bookings_on_date(
    db: &Database,
    date: NaiveDate,
    statuses: &[BookingStatus],
) -> Result<Vec<Booking>, RentError> {
    if statuses.is_empty() {
        return Ok(Vec::new());
    }
    let mut args = vec![Value::Text(fmt_date(date))];
    args.extend(statuses.iter().map(|s| Value::Text(s.to_string())));
    query_list(
        db,
        format!(
            "WHERE date = ?1 AND status IN ({})",
            placeholders(1, statuses.len())
        ),
        args,
    )
    .await
}

pub async fn list_bookings_by_status(
    db: &Database,
    status: BookingStatus,
) -> Result<Vec<Booking>, RentError> {
    query_list(
        db,
        "WHERE status = ?1".into(),
        vec![Value::Text(status.to_string())],
    )
    .await
}

pub async fn list_all_bookings(db: &Database) -> Result<Vec<Booking>, RentError> {
    query_list(db, String::new(), Vec::new()).await
}

/// Race-free insert.
///
/// Takes the write lock up front (`BEGIN IMMEDIATE`), recounts active
/// bookings for `(item, date)` and inserts with `version = 1` only while
/// capacity remains. Lock contention is retried a few times before it is
/// reported as [`RentError::ConcurrentModification`].
pub async fn create_booking_with_lock(
    db: &Database,
    booking: &NewBooking,
    now: DateTime<Utc>,
) -> Result<Booking, RentError> {
    for attempt in 1..=LOCK_ATTEMPTS {
        let new = booking.clone();
        let now = fmt_ts(now);
        let result = db
            .connection()
            .call(move |conn| -> Result<Booking, TxError> {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                let date = fmt_date(new.date);
                let total = capacity(&tx, new.item_id)?;
                let booked = active_count(&tx, new.item_id, &date, None)?;
                if booked >= total {
                    return Err(RentError::NotAvailable.into());
                }
                tx.execute(
                    "INSERT INTO bookings (user_id, user_name, username, phone, item_id, item_name,
                                           date, status, comment, version, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 1, ?10, ?10)",
                    params![
                        new.user_id,
                        new.user_name,
                        new.username,
                        new.phone,
                        new.item_id,
                        new.item_name,
                        date,
                        new.status.to_string(),
                        new.comment,
                        now,
                    ],
                )?;
                let id = tx.last_insert_rowid();
                let created = load(&tx, id)?.ok_or_else(|| RentError::not_found("booking", id))?;
                tx.commit()?;
                Ok(created)
            })
            .await;

        match result {
            Ok(created) => {
                debug!(booking_id = created.id, item_id = created.item_id, date = %created.date, "booking inserted");
                return Ok(created);
            }
            Err(tokio_rusqlite::Error::Error(TxError::Sqlite(e))) if is_busy(&e) => {
                warn!(attempt, error = %e, "booking insert hit a locked database, retrying");
                tokio::time::sleep(LOCK_BACKOFF * attempt).await;
            }
            Err(e) => return Err(map_tx_err(e)),
        }
    }
    Err(RentError::ConcurrentModification)
}

/// Distinguishes a stale version from a missing row after a zero-row update.
fn stale_or_missing(conn: &rusqlite::Connection, id: i64) -> TxError {
    match load(conn, id) {
        Ok(Some(_)) => RentError::ConcurrentModification.into(),
        Ok(None) => RentError::not_found("booking", id).into(),
        Err(e) => e.into(),
    }
}

/// Set a new status when the stored version equals `expected_version`.
pub async fn update_booking_status_with_version(
    db: &Database,
    id: i64,
    expected_version: i64,
    new_status: BookingStatus,
    now: DateTime<Utc>,
) -> Result<(), RentError> {
    let now = fmt_ts(now);
    db.connection()
        .call(move |conn| -> Result<(), TxError> {
            let changed = conn.execute(
                "UPDATE bookings SET status = ?1, version = version + 1, updated_at = ?2
                 WHERE id = ?3 AND version = ?4",
                params![new_status.to_string(), now, id, expected_version],
            )?;
            if changed == 0 {
                return Err(stale_or_missing(conn, id));
            }
            Ok(())
        })
        .await
        .map_err(map_tx_err)
}

/// Move a booking to another item under the version check.
///
/// Capacity of the target item is rechecked inside the same write
/// transaction, so the move cannot oversubscribe it.
pub async fn update_booking_item_and_status_with_version(
    db: &Database,
    id: i64,
    expected_version: i64,
    new_item_id: i64,
    new_item_name: &str,
    new_status: BookingStatus,
    now: DateTime<Utc>,
) -> Result<(), RentError> {
    let new_item_name = new_item_name.to_string();
    let now = fmt_ts(now);
    db.connection()
        .call(move |conn| -> Result<(), TxError> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let current = load(&tx, id)?.ok_or_else(|| RentError::not_found("booking", id))?;
            if current.version != expected_version {
                return Err(RentError::ConcurrentModification.into());
            }
            if new_status.is_active() {
                let total = capacity(&tx, new_item_id)?;
                let booked = active_count(&tx, new_item_id, &fmt_date(current.date), Some(id))?;
                if booked >= total {
                    return Err(RentError::NotAvailable.into());
                }
            }
            tx.execute(
                "UPDATE bookings SET item_id = ?1, item_name = ?2, status = ?3,
                     version = version + 1, updated_at = ?4
                 WHERE id = ?5 AND version = ?6",
                params![
                    new_item_id,
                    new_item_name,
                    new_status.to_string(),
                    now,
                    id,
                    expected_version
                ],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tx_err)
}

/// Read a booking and whether `new_item_id` has a free unit on its date,
/// from one snapshot.
pub async fn get_booking_with_availability(
    db: &Database,
    id: i64,
    new_item_id: i64,
) -> Result<BookingWithAvailability, RentError> {
    db.connection()
        .call(move |conn| -> Result<BookingWithAvailability, TxError> {
            let tx = conn.transaction()?;
            let booking = load(&tx, id)?.ok_or_else(|| RentError::not_found("booking", id))?;
            let total = capacity(&tx, new_item_id)?;
            let booked = active_count(&tx, new_item_id, &fmt_date(booking.date), Some(id))?;
            tx.commit()?;
            Ok(BookingWithAvailability {
                booking,
                available: booked < total,
            })
        })
        .await
        .map_err(map_tx_err)
}

/// Aggregate counts for the statistics view.
pub async fn booking_stats(
    db: &Database,
    active_since: DateTime<Utc>,
) -> Result<BookingStats, RentError> {
    let since = fmt_ts(active_since);
    db.connection()
        .call(move |conn| -> Result<BookingStats, TxError> {
            let mut stats = BookingStats::default();
            let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM bookings GROUP BY status")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            for row in rows {
                let (status, count) = row?;
                match status.parse::<BookingStatus>() {
                    Ok(status) => {
                        stats.by_status.insert(status, count);
                    }
                    Err(_) => warn!(status = %status, "unknown booking status in database"),
                }
            }
            stats.total_users = conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?;
            stats.active_users = conn.query_row(
                "SELECT COUNT(*) FROM users WHERE last_activity >= ?1",
                params![since],
                |r| r.get(0),
            )?;
            stats.failed_sync_tasks = conn.query_row(
                "SELECT COUNT(*) FROM sync_queue WHERE status = 'failed'",
                [],
                |r| r.get(0),
            )?;
            Ok(stats)
        })
        .await
        .map_err(map_tx_err)
}
