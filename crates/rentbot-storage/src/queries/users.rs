// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User profile queries.

use chrono::{DateTime, Utc};
use rentbot_core::types::{User, UserProfile};
use rentbot_core::RentError;
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::models::{fmt_ts, user_from_row, USER_COLUMNS};

/// Insert or refresh a user row keyed by platform id.
///
/// The stored phone survives; profile fields, role flags, and activity are overwritten.
pub async fn upsert_user(
    db: &Database,
    profile: &UserProfile,
    now: DateTime<Utc>,
) -> Result<User, RentError> {
    let p = profile.clone();
    let now = fmt_ts(now);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO users (telegram_id, username, first_name, last_name, is_manager,
                                    is_blacklisted, language_code, last_activity,
                                    created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8, ?8)
                 ON CONFLICT (telegram_id) DO UPDATE SET
                     username = excluded.username,
                     first_name = excluded.first_name,
                     last_name = excluded.last_name,
                     is_manager = excluded.is_manager,
                     is_blacklisted = excluded.is_blacklisted,
                     language_code = excluded.language_code,
                     last_activity = excluded.last_activity,
                     updated_at = excluded.updated_at",
                params![
                    p.telegram_id,
                    p.username,
                    p.first_name,
                    p.last_name,
                    p.is_manager,
                    p.is_blacklisted,
                    p.language_code,
                    now,
                ],
            )?;
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE telegram_id = ?1"),
                params![p.telegram_id],
                user_from_row,
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn get_user_by_platform_id(
    db: &Database,
    telegram_id: i64,
) -> Result<Option<User>, RentError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE telegram_id = ?1"),
                params![telegram_id],
                user_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn get_user_by_id(db: &Database, id: i64) -> Result<Option<User>, RentError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id],
                user_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

async fn list_where(
    db: &Database,
    clause: &'static str,
    arg: Option<String>,
) -> Result<Vec<User>, RentError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users {clause} ORDER BY id ASC"
            ))?;
            let rows = match arg {
                Some(arg) => stmt.query_map(params![arg], user_from_row)?,
                None => stmt.query_map([], user_from_row)?,
            };
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn list_all_users(db: &Database) -> Result<Vec<User>, RentError> {
    list_where(db, "", None).await
}

/// Users seen at or after `since`.
pub async fn list_active_users_since(
    db: &Database,
    since: DateTime<Utc>,
) -> Result<Vec<User>, RentError> {
    list_where(db, "WHERE last_activity >= ?1", Some(fmt_ts(since))).await
}

pub async fn list_users_by_manager_flag(
    db: &Database,
    is_manager: bool,
) -> Result<Vec<User>, RentError> {
    let clause = if is_manager {
        "WHERE is_manager = 1"
    } else {
        "WHERE is_manager = 0"
    };
    list_where(db, clause, None).await
}

async fn update_by_platform_id(
    db: &Database,
    telegram_id: i64,
    sql: &'static str,
    values: (Option<String>, String),
) -> Result<(), RentError> {
    let changed = db
        .connection()
        .call(move |conn| match values.0 {
            Some(first) => conn.execute(sql, params![first, values.1, telegram_id]),
            None => conn.execute(sql, params![values.1, telegram_id]),
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    if changed == 0 {
        return Err(RentError::not_found("user", telegram_id));
    }
    Ok(())
}

pub async fn update_user_phone(
    db: &Database,
    telegram_id: i64,
    phone: &str,
    now: DateTime<Utc>,
) -> Result<(), RentError> {
    update_by_platform_id(
        db,
        telegram_id,
        "UPDATE users SET phone = ?1, updated_at = ?2 WHERE telegram_id = ?3",
        (Some(phone.to_string()), fmt_ts(now)),
    )
    .await
}

/// Update only `last_activity`.
pub async fn touch_user_activity(
    db: &Database,
    telegram_id: i64,
    now: DateTime<Utc>,
) -> Result<(), RentError> {
    update_by_platform_id(
        db,
        telegram_id,
        "UPDATE users SET last_activity = ?1 WHERE telegram_id = ?2",
        (None, fmt_ts(now)),
    )
    .await
}
