// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user rate limit counters.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use rentbot_core::RentError;
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::models::{fmt_ts, parse_ts};
use crate::queries::{map_tx_err, TxError};

/// Check and advance the user's counter in one transaction.
///
/// The window opens on the first attempt and resets once `window` has
/// elapsed. Rejected attempts do not advance the counter.
pub async fn check_rate_limit(
    db: &Database,
    user_id: i64,
    limit: u32,
    window: Duration,
    now: DateTime<Utc>,
) -> Result<bool, RentError> {
    let window = TimeDelta::from_std(window).map_err(|e| RentError::Internal(e.to_string()))?;
    db.connection()
        .call(move |conn| -> Result<bool, TxError> {
            let tx = conn.transaction()?;
            let row: Option<(String, i64)> = tx
                .query_row(
                    "SELECT window_start, count FROM rate_limits WHERE user_id = ?1",
                    params![user_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            let window_start = row.as_ref().and_then(|(start, _)| parse_ts(start));

            let allowed = match (row, window_start) {
                (Some((_, count)), Some(start)) if now - start < window => {
                    if count < i64::from(limit) {
                        tx.execute(
                            "UPDATE rate_limits SET count = count + 1 WHERE user_id = ?1",
                            params![user_id],
                        )?;
                        true
                    } else {
                        false
                    }
                }
                _ => {
                    tx.execute(
                        "INSERT OR REPLACE INTO rate_limits (user_id, window_start, count)
                         VALUES (?1, ?2, 1)",
                        params![user_id, fmt_ts(now)],
                    )?;
                    limit >= 1
                }
            };
            tx.commit()?;
            Ok(allowed)
        })
        .await
        .map_err(map_tx_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::{setup_db, ts};

    #[tokio::test]
    async fn limit_applies_within_window_and_resets_after() {
        let (db, _dir) = setup_db().await;
        let window = Duration::from_secs(60);
        let t0 = ts("2026-05-01T10:00:00Z");

        for _ in 0..3 {
            assert!(check_rate_limit(&db, 1, 3, window, t0).await.unwrap());
        }
        assert!(!check_rate_limit(&db, 1, 3, window, t0 + TimeDelta::seconds(59))
            .await
            .unwrap());
        // Another user has an independent counter.
        assert!(check_rate_limit(&db, 2, 3, window, t0).await.unwrap());

        assert!(check_rate_limit(&db, 1, 3, window, t0 + TimeDelta::seconds(60))
            .await
            .unwrap());
        db.close().await.unwrap();
    }
}
