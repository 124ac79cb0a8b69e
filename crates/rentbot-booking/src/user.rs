// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User classification and profile bookkeeping.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::TimeDelta;
use tracing::debug;

use rentbot_core::chat::Sender;
use rentbot_core::types::UserProfile;
use rentbot_core::{Clock, RentError, Store, User};

use crate::helpers::normalize_phone;

/// Resolves manager and blacklist membership from configuration and
/// persists user profiles.
///
/// The membership sets are built once at startup and never change.
pub struct UserService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    managers: HashSet<i64>,
    blacklist: HashSet<i64>,
}

impl UserService {
    pub fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        managers: &[i64],
        blacklist: &[i64],
    ) -> Self {
        Self {
            store,
            clock,
            managers: managers.iter().copied().collect(),
            blacklist: blacklist.iter().copied().collect(),
        }
    }

    pub fn is_manager(&self, telegram_id: i64) -> bool {
        self.managers.contains(&telegram_id)
    }

    pub fn is_blacklisted(&self, telegram_id: i64) -> bool {
        self.blacklist.contains(&telegram_id)
    }

    /// Configured manager ids in ascending order.
    pub fn manager_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.managers.iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Upserts the sender, overwriting the stored flags with the
    /// configured membership.
    pub async fn save_user(&self, sender: &Sender) -> Result<User, RentError> {
        let profile = UserProfile {
            telegram_id: sender.id,
            username: sender.username.clone(),
            first_name: sender.first_name.clone(),
            last_name: sender.last_name.clone(),
            language_code: sender.language_code.clone(),
            is_manager: self.is_manager(sender.id),
            is_blacklisted: self.is_blacklisted(sender.id),
        };
        let user = self.store.upsert_user(&profile, self.clock.now()).await?;
        debug!(user_id = user.telegram_id, manager = user.is_manager, "user saved");
        Ok(user)
    }

    pub async fn touch_activity(&self, telegram_id: i64) -> Result<(), RentError> {
        self.store
            .touch_user_activity(telegram_id, self.clock.now())
            .await
    }

    /// Normalises and stores the user's phone. Returns the stored form.
    pub async fn update_phone(&self, telegram_id: i64, raw: &str) -> Result<String, RentError> {
        let phone = normalize_phone(raw);
        if phone.is_empty() {
            return Err(RentError::Validation("invalid phone number".into()));
        }
        self.store
            .update_user_phone(telegram_id, &phone, self.clock.now())
            .await?;
        Ok(phone)
    }

    pub async fn get_user(&self, telegram_id: i64) -> Result<Option<User>, RentError> {
        self.store.get_user_by_platform_id(telegram_id).await
    }

    pub async fn all_users(&self) -> Result<Vec<User>, RentError> {
        self.store.list_all_users().await
    }

    /// Users seen within the last `days` days.
    pub async fn active_users(&self, days: i64) -> Result<Vec<User>, RentError> {
        let since = self.clock.now() - TimeDelta::days(days);
        self.store.list_active_users_since(since).await
    }
}
