// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as time formats, positive limits, and disjoint identifier sets.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::RentbotConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &RentbotConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    let bot = &config.bot;
    if bot.rate_limit_messages == 0 {
        fail("bot.rate_limit_messages must be positive".to_string());
    }
    if bot.rate_limit_window == 0 {
        fail("bot.rate_limit_window must be positive".to_string());
    }
    if bot.max_booking_days < 0 {
        fail(format!(
            "bot.max_booking_days must be non-negative, got {}",
            bot.max_booking_days
        ));
    }
    if bot.min_booking_advance_hours < 0 {
        fail(format!(
            "bot.min_booking_advance_hours must be non-negative, got {}",
            bot.min_booking_advance_hours
        ));
    }
    if bot.pagination_size == 0 {
        fail("bot.pagination_size must be positive".to_string());
    }
    if bot.booking_pagination_size == 0 {
        fail("bot.booking_pagination_size must be positive".to_string());
    }
    if let Err(e) = bot.reminder_time() {
        fail(format!("bot.reminder_time: {e}"));
    }
    if let Err(e) = bot.offset() {
        fail(format!("bot.utc_offset: {e}"));
    }
    if bot.update_timeout_secs == 0 {
        fail("bot.update_timeout_secs must be positive".to_string());
    }
    if bot.update_queue_size == 0 {
        fail("bot.update_queue_size must be positive".to_string());
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if config.sync.batch_size == 0 {
        fail("sync.batch_size must be positive".to_string());
    }
    if config.sync.poll_interval_ms == 0 {
        fail("sync.poll_interval_ms must be positive".to_string());
    }
    if config
        .sync
        .mirror_dir
        .as_deref()
        .is_some_and(|dir| dir.trim().is_empty())
    {
        fail("sync.mirror_dir must not be empty when set".to_string());
    }

    if config.exports.path.trim().is_empty() {
        fail("exports.path must not be empty".to_string());
    }

    let managers: HashSet<i64> = config.managers.iter().copied().collect();
    let mut overlap: Vec<i64> = config
        .blacklist
        .iter()
        .copied()
        .filter(|id| managers.contains(id))
        .collect();
    overlap.sort_unstable();
    overlap.dedup();
    if !overlap.is_empty() {
        fail(format!(
            "identifiers {overlap:?} appear in both managers and blacklist"
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
