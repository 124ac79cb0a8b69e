// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./rentbot.toml` > `~/.config/rentbot/rentbot.toml`
//! > `/etc/rentbot/rentbot.toml` with environment variable overrides via the
//! `RENTBOT_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::RentbotConfig;

/// Sections whose env vars map `RENTBOT_<SECTION>_<KEY>` to `<section>.<key>`.
const SECTIONS: &[&str] = &["telegram", "storage", "bot", "sync", "exports", "prometheus"];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/rentbot/rentbot.toml`
/// 3. `~/.config/rentbot/rentbot.toml`
/// 4. `./rentbot.toml`
/// 5. `RENTBOT_*` environment variables
pub fn load_config() -> Result<RentbotConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<RentbotConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RentbotConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<RentbotConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RentbotConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(RentbotConfig::default()))
        .merge(Toml::file("/etc/rentbot/rentbot.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("rentbot/rentbot.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("rentbot.toml"))
        .merge(env_provider())
}

/// Environment provider with explicit section mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because keys contain
/// underscores: `RENTBOT_BOT_RATE_LIMIT_MESSAGES` must become
/// `bot.rate_limit_messages`, not `bot.rate.limit.messages`.
fn env_provider() -> Env {
    Env::prefixed("RENTBOT_").map(|key| map_env_key(key.as_str()).into())
}

/// Maps a lowercased, prefix-stripped env key to its dotted config path.
pub fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(field) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{field}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_sections() {
        assert_eq!(
            map_env_key("bot_rate_limit_messages"),
            "bot.rate_limit_messages"
        );
        assert_eq!(map_env_key("telegram_bot_token"), "telegram.bot_token");
        assert_eq!(map_env_key("storage_database_path"), "storage.database_path");
    }

    #[test]
    fn top_level_keys_are_left_alone() {
        assert_eq!(map_env_key("managers"), "managers");
        assert_eq!(map_env_key("managers_contacts"), "managers_contacts");
    }
}
