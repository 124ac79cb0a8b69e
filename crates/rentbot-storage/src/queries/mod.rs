// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for operations on storage entities.

pub mod bookings;
pub mod items;
pub mod outbox;
pub mod rate_limits;
pub mod states;
pub mod users;

use rentbot_core::RentError;

/// Error raised inside a connection call that may carry a domain outcome.
#[derive(Debug, thiserror::Error)]
pub(crate) enum TxError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Domain(#[from] RentError),
}

/// Convert a failed call carrying a [`TxError`] into a [`RentError`].
pub(crate) fn map_tx_err(e: tokio_rusqlite::Error<TxError>) -> RentError {
    match e {
        tokio_rusqlite::Error::Error(TxError::Domain(inner)) => inner,
        tokio_rusqlite::Error::Error(TxError::Sqlite(inner)) => RentError::Storage {
            source: Box::new(inner),
        },
        other => RentError::Storage {
            source: other.to_string().into(),
        },
    }
}

/// `?, ?, ?` with `n` placeholders starting after `offset` bound parameters.
pub(crate) fn placeholders(offset: usize, n: usize) -> String {
    (1..=n)
        .map(|i| format!("?{}", offset + i))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{DateTime, NaiveDate, Utc};
    use rentbot_core::types::{BookingStatus, NewBooking, NewItem};

    use crate::database::Database;

    pub async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    pub fn ts(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
    }

    pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub fn new_item(name: &str, qty: i64) -> NewItem {
        NewItem {
            name: name.to_string(),
            description: None,
            total_quantity: qty,
        }
    }

    pub fn new_booking(item_id: i64, item_name: &str, date: NaiveDate) -> NewBooking {
        NewBooking {
            user_id: 1001,
            user_name: "Ivan".into(),
            username: Some("ivan".into()),
            phone: "79991234567".into(),
            item_id,
            item_name: item_name.to_string(),
            date,
            status: BookingStatus::Pending,
            comment: None,
        }
    }
}
