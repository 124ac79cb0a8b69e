// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Rentbot booking engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use chrono::{FixedOffset, NaiveTime};
use serde::{Deserialize, Serialize};

/// Top-level Rentbot configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RentbotConfig {
    /// Platform identifiers treated as managers.
    #[serde(default)]
    pub managers: Vec<i64>,

    /// Platform identifiers whose updates are silently dropped.
    #[serde(default)]
    pub blacklist: Vec<i64>,

    /// Contact lines shown in the "contacts" menu.
    #[serde(default)]
    pub managers_contacts: Vec<String>,

    /// Telegram bot integration settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Conversation and booking rules.
    #[serde(default)]
    pub bot: BotConfig,

    /// Outbox worker and mirror settings.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Generated file exports.
    #[serde(default)]
    pub exports: ExportsConfig,

    /// Prometheus metrics settings.
    #[serde(default)]
    pub prometheus: PrometheusConfig,
}

/// Telegram bot integration configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Telegram Bot API token. `None` refuses to start `serve`.
    #[serde(default)]
    pub bot_token: Option<String>,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("rentbot").join("rentbot.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("rentbot.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Conversation, rate limit, and booking rule configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    /// Attempts allowed per window for non-managers.
    #[serde(default = "default_rate_limit_messages")]
    pub rate_limit_messages: u32,

    /// Rate limit window in seconds.
    #[serde(default = "default_rate_limit_window")]
    pub rate_limit_window: u64,

    /// Booking horizon in days.
    #[serde(default = "default_max_booking_days")]
    pub max_booking_days: i64,

    /// Minimum lead time before the booked day starts. 0 allows same-day bookings.
    #[serde(default)]
    pub min_booking_advance_hours: i64,

    /// Items per page in item lists.
    #[serde(default = "default_pagination_size")]
    pub pagination_size: usize,

    /// Bookings per page in booking lists.
    #[serde(default = "default_booking_pagination_size")]
    pub booking_pagination_size: usize,

    /// Local time of the daily reminder run, `HH:MM`.
    #[serde(default = "default_reminder_time")]
    pub reminder_time: String,

    /// Service time zone as a fixed UTC offset, `+HH:MM`.
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,

    /// Log level for the `rentbot` crates.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Deadline for handling one chat update.
    #[serde(default = "default_update_timeout_secs")]
    pub update_timeout_secs: u64,

    /// Capacity of the inbound update channel.
    #[serde(default = "default_update_queue_size")]
    pub update_queue_size: usize,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            rate_limit_messages: default_rate_limit_messages(),
            rate_limit_window: default_rate_limit_window(),
            max_booking_days: default_max_booking_days(),
            min_booking_advance_hours: 0,
            pagination_size: default_pagination_size(),
            booking_pagination_size: default_booking_pagination_size(),
            reminder_time: default_reminder_time(),
            utc_offset: default_utc_offset(),
            log_level: default_log_level(),
            update_timeout_secs: default_update_timeout_secs(),
            update_queue_size: default_update_queue_size(),
        }
    }
}

impl BotConfig {
    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window)
    }

    pub fn update_timeout(&self) -> Duration {
        Duration::from_secs(self.update_timeout_secs)
    }

    /// Parsed service offset. Validation guarantees this succeeds for loaded configs.
    pub fn offset(&self) -> Result<FixedOffset, String> {
        rentbot_core::time::parse_utc_offset(&self.utc_offset)
    }

    /// Parsed reminder time of day.
    pub fn reminder_time(&self) -> Result<NaiveTime, String> {
        rentbot_core::time::parse_hh_mm(&self.reminder_time)
    }
}

fn default_rate_limit_messages() -> u32 {
    30
}

fn default_rate_limit_window() -> u64 {
    60
}

fn default_max_booking_days() -> i64 {
    365
}

fn default_pagination_size() -> usize {
    8
}

fn default_booking_pagination_size() -> usize {
    5
}

fn default_reminder_time() -> String {
    "09:00".to_string()
}

fn default_utc_offset() -> String {
    "+03:00".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_update_timeout_secs() -> u64 {
    30
}

fn default_update_queue_size() -> usize {
    100
}

/// Outbox worker and mirror sink configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Run the sync worker. When disabled, tasks accumulate in the outbox.
    #[serde(default = "default_sync_enabled")]
    pub enabled: bool,

    /// Idle poll interval of each worker loop.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Tasks leased per poll.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// First retry delay; doubles per attempt.
    #[serde(default = "default_base_delay_secs")]
    pub base_delay_secs: u64,

    /// Attempts after which a task is parked as failed.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_schedule_months_back")]
    pub schedule_months_back: u32,

    #[serde(default = "default_schedule_months_ahead")]
    pub schedule_months_ahead: u32,

    /// Directory of the CSV mirror. `None` uses a sink that discards writes.
    #[serde(default)]
    pub mirror_dir: Option<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: default_sync_enabled(),
            poll_interval_ms: default_poll_interval_ms(),
            batch_size: default_batch_size(),
            base_delay_secs: default_base_delay_secs(),
            max_retries: default_max_retries(),
            schedule_months_back: default_schedule_months_back(),
            schedule_months_ahead: default_schedule_months_ahead(),
            mirror_dir: None,
        }
    }
}

impl SyncConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_secs(self.base_delay_secs)
    }
}

fn default_sync_enabled() -> bool {
    true
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_batch_size() -> usize {
    10
}

fn default_base_delay_secs() -> u64 {
    2
}

fn default_max_retries() -> u32 {
    5
}

fn default_schedule_months_back() -> u32 {
    1
}

fn default_schedule_months_ahead() -> u32 {
    2
}

/// Export file configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExportsConfig {
    /// Directory for generated CSV files.
    #[serde(default = "default_exports_path")]
    pub path: String,
}

impl Default for ExportsConfig {
    fn default() -> Self {
        Self {
            path: default_exports_path(),
        }
    }
}

fn default_exports_path() -> String {
    std::env::temp_dir()
        .join("rentbot-exports")
        .to_string_lossy()
        .into_owned()
}

/// Prometheus metrics configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PrometheusConfig {
    /// Install the Prometheus recorder.
    #[serde(default = "default_prometheus_enabled")]
    pub enabled: bool,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            enabled: default_prometheus_enabled(),
        }
    }
}

fn default_prometheus_enabled() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bot_defaults() {
        let bot = BotConfig::default();
        assert_eq!(bot.rate_limit_messages, 30);
        assert_eq!(bot.rate_limit_window(), Duration::from_secs(60));
        assert_eq!(bot.max_booking_days, 365);
        assert_eq!(bot.min_booking_advance_hours, 0);
        assert_eq!(bot.pagination_size, 8);
        assert_eq!(bot.booking_pagination_size, 5);
        assert_eq!(
            bot.reminder_time(),
            Ok(NaiveTime::from_hms_opt(9, 0, 0).unwrap())
        );
        assert_eq!(
            bot.offset(),
            Ok(FixedOffset::east_opt(3 * 3600).unwrap())
        );
    }

    #[test]
    fn sync_defaults() {
        let sync = SyncConfig::default();
        assert!(sync.enabled);
        assert_eq!(sync.base_delay(), Duration::from_secs(2));
        assert_eq!(sync.max_retries, 5);
        assert_eq!(sync.batch_size, 10);
        assert!(sync.mirror_dir.is_none());
    }

    #[test]
    fn default_database_path_ends_with_rentbot_db() {
        assert!(StorageConfig::default().database_path.ends_with("rentbot.db"));
    }
}
