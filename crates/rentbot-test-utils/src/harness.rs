// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end chat flows.
//!
//! `TestHarness` assembles the full booking stack on a temp SQLite database:
//! store, event bus with the chat notifier, services, conversation manager
//! and orchestrator, all talking to a [`MockChannel`]. The clock is fixed so
//! date validation is deterministic.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use rentbot_booking::{BookingRules, BookingService, ItemService, UserService};
use rentbot_bot::{CsvExporter, NotificationHandler, Orchestrator, OrchestratorSettings};
use rentbot_bus::EventBus;
use rentbot_config::RentbotConfig;
use rentbot_conversation::{Conversation, ConversationManager};
use rentbot_core::chat::{InboundUpdate, Sender};
use rentbot_core::{Clock, FixedClock, Item, RentError, Store};
use rentbot_storage::{Database, SqliteStore};

use crate::mock_channel::MockChannel;

/// Platform id of the manager every harness is configured with.
pub const MANAGER_ID: i64 = 1000;

/// Platform id of a regular user.
pub const USER_ID: i64 = 2000;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: RentbotConfig,
    now: DateTime<Utc>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        let mut config = RentbotConfig::default();
        config.managers = vec![MANAGER_ID];
        config.managers_contacts = vec!["Anna: +7 999 000-00-00".to_string()];
        config.bot.utc_offset = "+03:00".to_string();
        Self {
            config,
            // 12:00 on 2025-06-01 in the service zone.
            now: Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).single().unwrap_or_default(),
        }
    }

    /// Add a blacklisted platform id.
    pub fn with_blacklisted(mut self, id: i64) -> Self {
        self.config.blacklist.push(id);
        self
    }

    /// Set the per-window message allowance for non-managers.
    pub fn with_rate_limit(mut self, messages: u32) -> Self {
        self.config.bot.rate_limit_messages = messages;
        self
    }

    /// Start the fixed clock at `now`.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Adjust any other configuration value.
    pub fn configure(mut self, f: impl FnOnce(&mut RentbotConfig)) -> Self {
        f(&mut self.config);
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(mut self) -> Result<TestHarness, RentError> {
        let temp_dir = tempfile::TempDir::new()
            .map_err(|e| RentError::Internal(format!("temp dir: {e}")))?;
        let db_path = temp_dir.path().join("test.db");
        self.config.storage.database_path = db_path.to_string_lossy().into_owned();
        self.config.exports.path = temp_dir
            .path()
            .join("exports")
            .to_string_lossy()
            .into_owned();

        let db = Database::open(&self.config.storage.database_path).await?;
        let store: Arc<dyn Store> = Arc::new(SqliteStore::from_database(db));
        let clock = Arc::new(FixedClock::new(self.now));
        let clock_dyn: Arc<dyn Clock> = clock.clone();
        let rules = BookingRules::from_config(&self.config)?;

        let channel = Arc::new(MockChannel::new());
        let bus = Arc::new(EventBus::new());
        bus.subscribe_all(Arc::new(NotificationHandler::new(
            channel.clone(),
            self.config.managers.clone(),
        )))
        .await;

        let bookings = Arc::new(BookingService::new(
            store.clone(),
            bus.clone(),
            clock_dyn.clone(),
            rules.clone(),
        ));
        let users = Arc::new(UserService::new(
            store.clone(),
            clock_dyn.clone(),
            &self.config.managers,
            &self.config.blacklist,
        ));
        let items = Arc::new(ItemService::new(store.clone(), clock_dyn.clone(), rules));
        let conversations = Arc::new(ConversationManager::from_config(
            store.clone(),
            clock_dyn.clone(),
            &self.config.bot,
        ));

        let orchestrator = Arc::new(Orchestrator::new(
            channel.clone(),
            bookings.clone(),
            users.clone(),
            items.clone(),
            conversations.clone(),
            CsvExporter::new(&self.config.exports.path),
            clock_dyn,
            OrchestratorSettings::from_config(&self.config),
        ));

        Ok(TestHarness {
            channel,
            store,
            clock,
            bus,
            bookings,
            users,
            items,
            conversations,
            orchestrator,
            config: self.config,
            next_callback: AtomicU64::new(1),
            _temp_dir: temp_dir,
        })
    }
}

/// A complete booking stack with a mock channel and temp storage.
pub struct TestHarness {
    pub channel: Arc<MockChannel>,
    pub store: Arc<dyn Store>,
    pub clock: Arc<FixedClock>,
    pub bus: Arc<EventBus>,
    pub bookings: Arc<BookingService>,
    pub users: Arc<UserService>,
    pub items: Arc<ItemService>,
    pub conversations: Arc<ConversationManager>,
    pub orchestrator: Arc<Orchestrator>,
    pub config: RentbotConfig,
    next_callback: AtomicU64,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// A harness with default settings.
    pub async fn new() -> Result<TestHarness, RentError> {
        Self::builder().build().await
    }

    pub fn sender(id: i64) -> Sender {
        Sender {
            id,
            username: Some(format!("user{id}")),
            first_name: format!("User{id}"),
            last_name: String::new(),
            language_code: Some("en".to_string()),
        }
    }

    /// The service-zone calendar date of the fixed clock.
    pub fn today(&self) -> NaiveDate {
        self.bookings.today()
    }

    /// Send a text message from `user_id` through the orchestrator.
    pub async fn send_text(&self, user_id: i64, text: &str) -> Result<(), RentError> {
        self.orchestrator
            .handle(InboundUpdate::Message {
                chat_id: user_id,
                sender: Self::sender(user_id),
                text: Some(text.to_string()),
                contact_phone: None,
            })
            .await
    }

    /// Share a contact card from `user_id`.
    pub async fn send_contact(&self, user_id: i64, phone: &str) -> Result<(), RentError> {
        self.orchestrator
            .handle(InboundUpdate::Message {
                chat_id: user_id,
                sender: Self::sender(user_id),
                text: None,
                contact_phone: Some(phone.to_string()),
            })
            .await
    }

    /// Press an inline button carrying `data`.
    pub async fn press(&self, user_id: i64, data: &str) -> Result<(), RentError> {
        let id = self.next_callback.fetch_add(1, Ordering::SeqCst);
        self.orchestrator
            .handle(InboundUpdate::Callback {
                callback_id: format!("cb-{id}"),
                chat_id: user_id,
                message_id: Some(1),
                sender: Self::sender(user_id),
                data: data.to_string(),
            })
            .await
    }

    pub async fn add_item(&self, name: &str, quantity: i64) -> Result<Item, RentError> {
        self.items.create_item(name, quantity).await
    }

    pub async fn state(&self, user_id: i64) -> Result<Conversation, RentError> {
        self.conversations.load(user_id).await
    }

    /// Text of the latest message sent to `user_id`, or an empty string.
    pub async fn last_reply(&self, user_id: i64) -> String {
        self.channel.last_text(user_id).await.unwrap_or_default()
    }
}
