// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sync outbox operations for crash-safe mirror delivery.
//!
//! Rows move `pending -> processing -> completed`, with `retry` and `failed`
//! on errors. A `processing` row carries a lease (`locked_until`); once the
//! lease runs out the row is eligible again, so a crashed worker never
//! strands a task.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use rentbot_core::types::{SyncJob, SyncTask, SyncTaskKind, SyncTaskStatus};
use rentbot_core::RentError;
use rusqlite::{params, OptionalExtension, TransactionBehavior};

use crate::database::Database;
use crate::models::{fmt_ts, task_from_row, TASK_COLUMNS};
use crate::queries::{map_tx_err, TxError};

/// Enqueue a task. Returns the new row id, or `None` when a schedule resync
/// is already waiting and this one was coalesced into it.
pub async fn enqueue_task(
    db: &Database,
    job: &SyncJob,
    now: DateTime<Utc>,
) -> Result<Option<i64>, RentError> {
    let kind = job.kind();
    let booking_id = job.booking_id();
    let (payload, status_value) = job.columns().map_err(|e| RentError::Storage {
        source: Box::new(e),
    })?;
    let now = fmt_ts(now);
    db.connection()
        .call(move |conn| {
            let inserted = if kind == SyncTaskKind::SyncSchedule {
                conn.execute(
                    "INSERT INTO sync_queue (kind, booking_id, payload, status_value, created_at)
                     SELECT ?1, ?2, ?3, ?4, ?5
                     WHERE NOT EXISTS (
                         SELECT 1 FROM sync_queue
                         WHERE kind = ?1 AND status IN ('pending', 'retry'))",
                    params![kind.to_string(), booking_id, payload, status_value, now],
                )?
            } else {
                conn.execute(
                    "INSERT INTO sync_queue (kind, booking_id, payload, status_value, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![kind.to_string(), booking_id, payload, status_value, now],
                )?
            };
            Ok(if inserted == 0 {
                None
            } else {
                Some(conn.last_insert_rowid())
            })
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Lease up to `limit` due tasks of `kind`, oldest first.
///
/// A task is due when it is `pending`/`retry` with no future `next_retry_at`,
/// or `processing` with an expired lease. Tasks whose booking still has an
/// earlier unfinished task are skipped so that per-booking order holds.
pub async fn lease_due_pending_tasks(
    db: &Database,
    kind: SyncTaskKind,
    limit: usize,
    now: DateTime<Utc>,
    lease: Duration,
) -> Result<Vec<SyncTask>, RentError> {
    let lease = TimeDelta::from_std(lease).map_err(|e| RentError::Internal(e.to_string()))?;
    let locked_until = fmt_ts(now + lease);
    let now = fmt_ts(now);
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| -> Result<Vec<SyncTask>, TxError> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let tasks = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {TASK_COLUMNS} FROM sync_queue t
                     WHERE t.kind = ?1
                       AND ((t.status IN ('pending', 'retry')
                             AND (t.next_retry_at IS NULL OR t.next_retry_at <= ?2))
                            OR (t.status = 'processing' AND t.locked_until <= ?2))
                       AND (t.booking_id IS NULL OR NOT EXISTS (
                             SELECT 1 FROM sync_queue e
                             WHERE e.booking_id = t.booking_id AND e.id < t.id
                               AND e.status IN ('pending', 'retry', 'processing')))
                     ORDER BY t.id ASC
                     LIMIT ?3"
                ))?;
                let rows = stmt.query_map(params![kind.to_string(), now, limit], task_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            };
            for task in &tasks {
                tx.execute(
                    "UPDATE sync_queue SET status = 'processing', locked_until = ?1 WHERE id = ?2",
                    params![locked_until, task.id],
                )?;
            }
            tx.commit()?;
            Ok(tasks
                .into_iter()
                .map(|task| SyncTask {
                    status: SyncTaskStatus::Processing,
                    ..task
                })
                .collect())
        })
        .await
        .map_err(map_tx_err)
}

async fn update_task(
    db: &Database,
    id: i64,
    sql: &'static str,
    args: (Option<String>, Option<String>),
) -> Result<(), RentError> {
    let changed = db
        .connection()
        .call(move |conn| conn.execute(sql, params![args.0, args.1, id]))
        .await
        .map_err(crate::database::map_tr_err)?;
    if changed == 0 {
        return Err(RentError::not_found("sync task", id));
    }
    Ok(())
}

pub async fn mark_completed(db: &Database, id: i64, now: DateTime<Utc>) -> Result<(), RentError> {
    update_task(
        db,
        id,
        "UPDATE sync_queue SET status = 'completed', processed_at = ?1, locked_until = NULL,
             last_error = COALESCE(?2, last_error)
         WHERE id = ?3",
        (Some(fmt_ts(now)), None),
    )
    .await
}

/// Count an attempt and schedule the next one.
pub async fn mark_retry(
    db: &Database,
    id: i64,
    next_at: DateTime<Utc>,
    error: &str,
) -> Result<(), RentError> {
    update_task(
        db,
        id,
        "UPDATE sync_queue SET status = 'retry', retry_count = retry_count + 1,
             next_retry_at = ?1, last_error = ?2, locked_until = NULL
         WHERE id = ?3",
        (Some(fmt_ts(next_at)), Some(error.to_string())),
    )
    .await
}

/// Count an attempt and park the task for good.
pub async fn mark_failed(
    db: &Database,
    id: i64,
    error: &str,
    now: DateTime<Utc>,
) -> Result<(), RentError> {
    update_task(
        db,
        id,
        "UPDATE sync_queue SET status = 'failed', retry_count = retry_count + 1,
             processed_at = ?1, last_error = ?2, locked_until = NULL
         WHERE id = ?3",
        (Some(fmt_ts(now)), Some(error.to_string())),
    )
    .await
}

/// Hand a leased task back without counting an attempt.
pub async fn release_task(db: &Database, id: i64) -> Result<(), RentError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE sync_queue SET status = 'pending', locked_until = NULL
                 WHERE id = ?1 AND status = 'processing'",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Return every leased task to `pending`. Returns how many were released.
pub async fn release_all_leases(db: &Database) -> Result<usize, RentError> {
    db.connection()
        .call(|conn| {
            conn.execute(
                "UPDATE sync_queue SET status = 'pending', locked_until = NULL
                 WHERE status = 'processing'",
                [],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn get_task(db: &Database, id: i64) -> Result<Option<SyncTask>, RentError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {TASK_COLUMNS} FROM sync_queue WHERE id = ?1"),
                params![id],
                task_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn list_failed(db: &Database) -> Result<Vec<SyncTask>, RentError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TASK_COLUMNS} FROM sync_queue WHERE status = 'failed' ORDER BY id ASC"
            ))?;
            let rows = stmt.query_map([], task_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}
