// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversational state rows.

use rentbot_core::types::UserState;
use rentbot_core::RentError;
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::models::{fmt_ts, state_from_row};

pub async fn get_state(db: &Database, user_id: i64) -> Result<Option<UserState>, RentError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT user_id, step, data, updated_at FROM user_states WHERE user_id = ?1",
                params![user_id],
                state_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Replace the whole row in one statement.
pub async fn set_state(db: &Database, state: &UserState) -> Result<(), RentError> {
    let data = serde_json::to_string(&state.data).map_err(|e| RentError::Storage {
        source: Box::new(e),
    })?;
    let user_id = state.user_id;
    let step = state.step.clone();
    let updated_at = fmt_ts(state.updated_at);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO user_states (user_id, step, data, updated_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![user_id, step, data, updated_at],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn clear_state(db: &Database, user_id: i64) -> Result<(), RentError> {
    db.connection()
        .call(move |conn| {
            conn.execute("DELETE FROM user_states WHERE user_id = ?1", params![user_id])?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}
