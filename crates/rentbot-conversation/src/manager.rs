// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Loading, advancing, and clearing per-user conversation state.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use rentbot_config::model::BotConfig;
use rentbot_core::{Clock, RentError, Store};

use crate::conversation::Conversation;

/// Per-user step machine backed by the store.
///
/// Every save replaces the whole row, so two interleaved updates from the
/// same user cannot leave a half-written state behind.
pub struct ConversationManager {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    rate_limit_messages: u32,
    rate_limit_window: Duration,
}

impl ConversationManager {
    pub fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        rate_limit_messages: u32,
        rate_limit_window: Duration,
    ) -> Self {
        Self {
            store,
            clock,
            rate_limit_messages,
            rate_limit_window,
        }
    }

    pub fn from_config(store: Arc<dyn Store>, clock: Arc<dyn Clock>, bot: &BotConfig) -> Self {
        Self::new(
            store,
            clock,
            bot.rate_limit_messages,
            bot.rate_limit_window(),
        )
    }

    /// Current state; a missing or inconsistent row reads as the main menu.
    pub async fn load(&self, user_id: i64) -> Result<Conversation, RentError> {
        let Some(state) = self.store.get_state(user_id).await? else {
            return Ok(Conversation::MainMenu);
        };
        match Conversation::from_state(&state) {
            Ok(conversation) => Ok(conversation),
            Err(e) => {
                warn!(user_id, step = %state.step, error = %e, "discarding inconsistent conversation state");
                self.store.clear_state(user_id).await?;
                Ok(Conversation::MainMenu)
            }
        }
    }

    /// Replaces the stored state. The main menu carries no scratch, so it
    /// clears the row instead.
    pub async fn save(&self, user_id: i64, conversation: &Conversation) -> Result<(), RentError> {
        if *conversation == Conversation::MainMenu {
            return self.reset(user_id).await;
        }
        debug!(user_id, step = %conversation.step(), "conversation advanced");
        self.store
            .set_state(&conversation.to_state(user_id, self.clock.now()))
            .await
    }

    /// Drops all scratch and returns the user to the main menu.
    pub async fn reset(&self, user_id: i64) -> Result<(), RentError> {
        self.store.clear_state(user_id).await
    }

    /// Moves one step back and persists the result.
    pub async fn back(&self, user_id: i64) -> Result<Conversation, RentError> {
        let previous = self.load(user_id).await?.back();
        self.save(user_id, &previous).await?;
        Ok(previous)
    }

    /// Whether the user may send another update now. Managers are never limited.
    pub async fn allow(&self, user_id: i64, is_manager: bool) -> Result<bool, RentError> {
        if is_manager {
            return Ok(true);
        }
        self.store
            .check_rate_limit(
                user_id,
                self.rate_limit_messages,
                self.rate_limit_window,
                self.clock.now(),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeDelta, TimeZone, Utc};
    use rentbot_core::{FixedClock, UserState};
    use rentbot_storage::{Database, SqliteStore};

    use super::*;

    async fn setup(limit: u32) -> (ConversationManager, Arc<dyn Store>, Arc<FixedClock>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("conv.db").to_str().unwrap())
            .await
            .unwrap();
        let store: Arc<dyn Store> = Arc::new(SqliteStore::from_database(db));
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap(),
        ));
        let manager = ConversationManager::new(
            store.clone(),
            clock.clone(),
            limit,
            Duration::from_secs(60),
        );
        (manager, store, clock, dir)
    }

    #[tokio::test]
    async fn save_load_and_back() {
        let (conv, _store, _clock, _dir) = setup(10).await;
        assert_eq!(conv.load(5).await.unwrap(), Conversation::MainMenu);

        let state = Conversation::EnterName {
            item_id: 1,
            date: NaiveDate::from_ymd_opt(2025, 6, 5).unwrap(),
        };
        conv.save(5, &state).await.unwrap();
        assert_eq!(conv.load(5).await.unwrap(), state);

        let previous = conv.back(5).await.unwrap();
        assert_eq!(previous, Conversation::WaitingDate { item_id: 1 });
        assert_eq!(conv.load(5).await.unwrap(), previous);

        conv.reset(5).await.unwrap();
        assert_eq!(conv.load(5).await.unwrap(), Conversation::MainMenu);
    }

    #[tokio::test]
    async fn corrupt_state_falls_back_to_menu() {
        let (conv, store, clock, _dir) = setup(10).await;
        store
            .set_state(&UserState {
                user_id: 9,
                step: "phone_number".into(),
                data: Default::default(),
                updated_at: clock.now(),
            })
            .await
            .unwrap();
        assert_eq!(conv.load(9).await.unwrap(), Conversation::MainMenu);
        assert!(store.get_state(9).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rate_limit_bounds_non_managers() {
        let (conv, _store, clock, _dir) = setup(3).await;
        for _ in 0..3 {
            assert!(conv.allow(11, false).await.unwrap());
        }
        assert!(!conv.allow(11, false).await.unwrap());
        assert!(conv.allow(11, true).await.unwrap());

        clock.advance(TimeDelta::seconds(61));
        assert!(conv.allow(11, false).await.unwrap());
    }
}
