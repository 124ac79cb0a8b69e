// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Catalogue maintenance for managers.

use std::sync::Arc;

use tracing::info;

use rentbot_core::types::{ItemUpdate, NewItem};
use rentbot_core::{Clock, Item, RentError, Store};

use crate::helpers::sanitize_input;
use crate::rules::BookingRules;

const MAX_ITEM_NAME_CHARS: usize = 100;

/// Thin wrapper over the store's item operations. Items are addressed by
/// name in manager commands.
pub struct ItemService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    rules: BookingRules,
}

/// Direction for [`ItemService::move_item`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    Up,
    Down,
}

impl ItemService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, rules: BookingRules) -> Self {
        Self {
            store,
            clock,
            rules,
        }
    }

    pub async fn create_item(&self, name: &str, total_quantity: i64) -> Result<Item, RentError> {
        let name = clean_name(name)?;
        check_quantity(total_quantity)?;
        let item = self
            .store
            .create_item(
                &NewItem {
                    name,
                    description: None,
                    total_quantity,
                },
                self.clock.now(),
            )
            .await?;
        info!(item_id = item.id, name = %item.name, quantity = item.total_quantity, "item created");
        Ok(item)
    }

    /// Changes the per-day capacity of the named item.
    pub async fn update_quantity(&self, name: &str, total_quantity: i64) -> Result<Item, RentError> {
        check_quantity(total_quantity)?;
        let item = self.find(name).await?;
        let now = self.clock.now();
        let updated = self
            .store
            .update_item(
                item.id,
                &ItemUpdate {
                    total_quantity: Some(total_quantity),
                    ..ItemUpdate::default()
                },
                self.rules.today(now),
                now,
            )
            .await?;
        info!(item_id = updated.id, quantity = total_quantity, "item capacity updated");
        Ok(updated)
    }

    pub async fn deactivate_item(&self, name: &str) -> Result<Item, RentError> {
        let item = self.find(name).await?;
        self.store.deactivate_item(item.id, self.clock.now()).await?;
        info!(item_id = item.id, name = %item.name, "item deactivated");
        Ok(item)
    }

    pub async fn reorder_item(&self, name: &str, new_order: i64) -> Result<Item, RentError> {
        let item = self.find(name).await?;
        self.store
            .reorder_item(item.id, new_order, self.clock.now())
            .await
    }

    /// Swaps the item with its neighbour in display order.
    pub async fn move_item(&self, name: &str, direction: Move) -> Result<Item, RentError> {
        let item = self.find(name).await?;
        let items = self.store.list_active_items_sorted().await?;
        let idx = items
            .iter()
            .position(|i| i.id == item.id)
            .ok_or_else(|| RentError::not_found("item", &item.name))?;
        let neighbour = match direction {
            Move::Up => idx.checked_sub(1).and_then(|i| items.get(i)),
            Move::Down => items.get(idx + 1),
        };
        let Some(neighbour) = neighbour else {
            return Ok(item);
        };

        let now = self.clock.now();
        let (mine, theirs) = if neighbour.sort_order == item.sort_order {
            match direction {
                Move::Up => (item.sort_order, item.sort_order + 1),
                Move::Down => (item.sort_order + 1, item.sort_order),
            }
        } else {
            (neighbour.sort_order, item.sort_order)
        };
        self.store.reorder_item(neighbour.id, theirs, now).await?;
        self.store.reorder_item(item.id, mine, now).await
    }

    pub async fn list_items(&self) -> Result<Vec<Item>, RentError> {
        self.store.list_active_items_sorted().await
    }

    pub async fn get_item(&self, id: i64) -> Result<Item, RentError> {
        self.store
            .get_item_by_id(id)
            .await?
            .ok_or_else(|| RentError::not_found("item", id))
    }

    /// Active item by case-insensitive name.
    pub async fn find(&self, name: &str) -> Result<Item, RentError> {
        let name = clean_name(name)?;
        self.store
            .get_item_by_name(&name)
            .await?
            .ok_or_else(|| RentError::not_found("item", name))
    }
}

fn clean_name(raw: &str) -> Result<String, RentError> {
    let name = sanitize_input(raw);
    if name.is_empty() || name.chars().count() > MAX_ITEM_NAME_CHARS {
        return Err(RentError::Validation(format!(
            "item name must be 1-{MAX_ITEM_NAME_CHARS} characters"
        )));
    }
    Ok(name)
}

fn check_quantity(quantity: i64) -> Result<(), RentError> {
    if quantity < 1 {
        return Err(RentError::Validation("quantity must be at least 1".into()));
    }
    Ok(())
}
