// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Item catalogue queries.

use chrono::{DateTime, NaiveDate, Utc};
use rentbot_core::types::{BookingStatus, Item, ItemUpdate, NewItem};
use rentbot_core::RentError;
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::models::{fmt_date, fmt_ts, item_from_row, ITEM_COLUMNS};
use crate::queries::{map_tx_err, TxError};

fn load(conn: &rusqlite::Connection, id: i64) -> rusqlite::Result<Option<Item>> {
    conn.query_row(
        &format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1"),
        params![id],
        item_from_row,
    )
    .optional()
}

/// Finds an active item by name, comparing case-insensitively with full
/// Unicode folding (SQLite's `lower()` only folds ASCII).
fn find_active_by_name(conn: &rusqlite::Connection, name: &str) -> rusqlite::Result<Option<Item>> {
    let wanted = name.trim().to_lowercase();
    let mut stmt = conn.prepare(&format!(
        "SELECT {ITEM_COLUMNS} FROM items WHERE is_active = 1"
    ))?;
    let rows = stmt.query_map([], item_from_row)?;
    for item in rows {
        let item = item?;
        if item.name.to_lowercase() == wanted {
            return Ok(Some(item));
        }
    }
    Ok(None)
}

/// Insert an active item at the end of the catalogue.
pub async fn create_item(db: &Database, item: &NewItem, now: DateTime<Utc>) -> Result<Item, RentError> {
    let item = item.clone();
    let now = fmt_ts(now);
    db.connection()
        .call(move |conn| -> Result<Item, TxError> {
            let tx = conn.transaction()?;
            if find_active_by_name(&tx, &item.name)?.is_some() {
                return Err(RentError::Validation(format!("item `{}` already exists", item.name)).into());
            }
            // Inactive rows count too, so a deactivated tail item never
            // shares its position with the next one created.
            let next_order: i64 = tx.query_row(
                "SELECT COALESCE(MAX(sort_order), 0) + 1 FROM items",
                [],
                |row| row.get(0),
            )?;
            tx.execute(
                "INSERT INTO items (name, description, total_quantity, sort_order, is_active,
                                    created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5)",
                params![item.name, item.description, item.total_quantity, next_order, now],
            )?;
            let id = tx.last_insert_rowid();
            let created = load(&tx, id)?.ok_or_else(|| RentError::not_found("item", id))?;
            tx.commit()?;
            Ok(created)
        })
        .await
        .map_err(map_tx_err)
}

/// Apply a partial update.
///
/// A capacity decrease is rejected when some day from `today` onward already
/// holds more active bookings than the new capacity.
pub async fn update_item(
    db: &Database,
    id: i64,
    update: &ItemUpdate,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<Item, RentError> {
    let update = update.clone();
    let today = fmt_date(today);
    let now = fmt_ts(now);
    db.connection()
        .call(move |conn| -> Result<Item, TxError> {
            let tx = conn.transaction()?;
            let current = load(&tx, id)?.ok_or_else(|| RentError::not_found("item", id))?;

            let name = match update.name {
                Some(name) => {
                    if let Some(other) = find_active_by_name(&tx, &name)?
                        .filter(|other| other.id != id)
                    {
                        return Err(RentError::Validation(format!(
                            "item `{}` already exists",
                            other.name
                        ))
                        .into());
                    }
                    name
                }
                None => current.name.clone(),
            };
            let description = update.description.unwrap_or(current.description.clone());

            let total_quantity = update.total_quantity.unwrap_or(current.total_quantity);
            if total_quantity < 1 {
                return Err(RentError::Validation("quantity must be at least 1".into()).into());
            }
            if total_quantity < current.total_quantity {
                let peak: i64 = tx.query_row(
                    &format!(
                        "SELECT COALESCE(MAX(cnt), 0) FROM (
                             SELECT COUNT(*) AS cnt FROM bookings
                             WHERE item_id = ?1 AND date >= ?2 AND status IN ({})
                             GROUP BY date)",
                        BookingStatus::active_sql_list()
                    ),
                    params![id, today],
                    |row| row.get(0),
                )?;
                if peak > total_quantity {
                    return Err(RentError::Validation(format!(
                        "{peak} units are already booked on some day; capacity cannot drop to {total_quantity}"
                    ))
                    .into());
                }
            }

            tx.execute(
                "UPDATE items SET name = ?1, description = ?2, total_quantity = ?3, updated_at = ?4
                 WHERE id = ?5",
                params![name, description, total_quantity, now, id],
            )?;
            let updated = load(&tx, id)?.ok_or_else(|| RentError::not_found("item", id))?;
            tx.commit()?;
            Ok(updated)
        })
        .await
        .map_err(map_tx_err)
}

/// Soft-delete: bookings keep pointing at the row.
pub async fn deactivate_item(db: &Database, id: i64, now: DateTime<Utc>) -> Result<(), RentError> {
    let now = fmt_ts(now);
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE items SET is_active = 0, updated_at = ?1 WHERE id = ?2",
                params![now, id],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    if changed == 0 {
        return Err(RentError::not_found("item", id));
    }
    Ok(())
}

/// Set the sort position, clamped to at least 1.
pub async fn reorder_item(
    db: &Database,
    id: i64,
    new_order: i64,
    now: DateTime<Utc>,
) -> Result<Item, RentError> {
    let order = new_order.max(1);
    let now = fmt_ts(now);
    db.connection()
        .call(move |conn| -> Result<Item, TxError> {
            let changed = conn.execute(
                "UPDATE items SET sort_order = ?1, updated_at = ?2 WHERE id = ?3",
                params![order, now, id],
            )?;
            if changed == 0 {
                return Err(RentError::not_found("item", id).into());
            }
            Ok(load(conn, id)?.ok_or_else(|| RentError::not_found("item", id))?)
        })
        .await
        .map_err(map_tx_err)
}

pub async fn get_item_by_id(db: &Database, id: i64) -> Result<Option<Item>, RentError> {
    db.connection()
        .call(move |conn| load(conn, id))
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn get_item_by_name(db: &Database, name: &str) -> Result<Option<Item>, RentError> {
    let name = name.to_string();
    db.connection()
        .call(move |conn| find_active_by_name(conn, &name))
        .await
        .map_err(crate::database::map_tr_err)
}

/// Active items ordered by `(sort_order, name)`.
pub async fn list_active_items_sorted(db: &Database) -> Result<Vec<Item>, RentError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ITEM_COLUMNS} FROM items WHERE is_active = 1
                 ORDER BY sort_order ASC, name ASC"
            ))?;
            let rows = stmt.query_map([], item_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}
