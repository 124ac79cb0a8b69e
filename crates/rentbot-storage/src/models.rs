// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row mapping between SQLite and the domain types in `rentbot-core`.
//!
//! Timestamps are stored as fixed-width UTC strings so that lexical order
//! equals chronological order; dates are stored as `YYYY-MM-DD`.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rusqlite::types::Type;
use rusqlite::Row;

pub use rentbot_core::types::{Booking, Item, SyncTask, User, UserState};
use rentbot_core::types::{BookingStatus, SyncTaskKind, SyncTaskStatus};

const TS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Column list matching [`booking_from_row`].
pub const BOOKING_COLUMNS: &str = "id, user_id, user_name, username, phone, item_id, item_name,
     date, status, comment, version, created_at, updated_at";

/// Column list matching [`item_from_row`].
pub const ITEM_COLUMNS: &str =
    "id, name, description, total_quantity, sort_order, is_active, created_at, updated_at";

/// Column list matching [`user_from_row`].
pub const USER_COLUMNS: &str = "id, telegram_id, username, first_name, last_name, phone,
     is_manager, is_blacklisted, language_code, last_activity, created_at, updated_at";

/// Column list matching [`task_from_row`].
pub const TASK_COLUMNS: &str = "id, kind, booking_id, payload, status_value, status,
     retry_count, last_error, next_retry_at, created_at, processed_at";

pub fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.format(TS_FORMAT).to_string()
}

/// Parses a stored timestamp, `None` when malformed.
pub fn parse_ts(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, TS_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

pub fn fmt_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn conversion_err(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn ts_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&raw, TS_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| conversion_err(idx, e))
}

fn opt_ts_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|raw| {
        NaiveDateTime::parse_from_str(&raw, TS_FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(|e| conversion_err(idx, e))
    })
    .transpose()
}

fn date_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT).map_err(|e| conversion_err(idx, e))
}

fn parsed_at<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>().map_err(|e| conversion_err(idx, e))
}

pub fn item_from_row(row: &Row<'_>) -> rusqlite::Result<Item> {
    Ok(Item {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        total_quantity: row.get(3)?,
        sort_order: row.get(4)?,
        is_active: row.get(5)?,
        created_at: ts_at(row, 6)?,
        updated_at: ts_at(row, 7)?,
    })
}

pub fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        telegram_id: row.get(1)?,
        username: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        phone: row.get(5)?,
        is_manager: row.get(6)?,
        is_blacklisted: row.get(7)?,
        language_code: row.get(8)?,
        last_activity: opt_ts_at(row, 9)?,
        created_at: ts_at(row, 10)?,
        updated_at: ts_at(row, 11)?,
    })
}

pub fn booking_from_row(row: &Row<'_>) -> rusqlite::Result<Booking> {
    Ok(Booking {
        id: row.get(0)?,
        user_id: row.get(1)?,
        user_name: row.get(2)?,
        username: row.get(3)?,
        phone: row.get(4)?,
        item_id: row.get(5)?,
        item_name: row.get(6)?,
        date: date_at(row, 7)?,
        status: parsed_at::<BookingStatus>(row, 8)?,
        comment: row.get(9)?,
        version: row.get(10)?,
        created_at: ts_at(row, 11)?,
        updated_at: ts_at(row, 12)?,
    })
}

pub fn task_from_row(row: &Row<'_>) -> rusqlite::Result<SyncTask> {
    Ok(SyncTask {
        id: row.get(0)?,
        kind: parsed_at::<SyncTaskKind>(row, 1)?,
        booking_id: row.get(2)?,
        payload: row.get(3)?,
        status_value: row.get(4)?,
        status: parsed_at::<SyncTaskStatus>(row, 5)?,
        retry_count: row.get(6)?,
        last_error: row.get(7)?,
        next_retry_at: opt_ts_at(row, 8)?,
        created_at: ts_at(row, 9)?,
        processed_at: opt_ts_at(row, 10)?,
    })
}

/// Maps `(user_id, step, data, updated_at)`.
pub fn state_from_row(row: &Row<'_>) -> rusqlite::Result<UserState> {
    let raw: String = row.get(2)?;
    let data = serde_json::from_str(&raw).map_err(|e| conversion_err(2, e))?;
    Ok(UserState {
        user_id: row.get(0)?,
        step: row.get(1)?,
        data,
        updated_at: ts_at(row, 3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_sort_lexically() {
        let a = DateTime::parse_from_rfc3339("2026-01-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let b = a + chrono::TimeDelta::milliseconds(1500);
        let (fa, fb) = (fmt_ts(a), fmt_ts(b));
        assert_eq!(fa, "2026-01-01T09:00:00.000Z");
        assert_eq!(fb, "2026-01-01T09:00:01.500Z");
        assert!(fa < fb);
    }

    #[test]
    fn date_format_is_iso() {
        let d = NaiveDate::from_ymd_opt(2025, 7, 3).unwrap();
        assert_eq!(fmt_date(d), "2025-07-03");
    }
}
