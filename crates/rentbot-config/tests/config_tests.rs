// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Rentbot configuration system.

use figment::{
    providers::{Format, Serialized, Toml},
    Figment,
};
use rentbot_config::diagnostic::ConfigError;
use rentbot_config::model::RentbotConfig;
use rentbot_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};

#[test]
fn full_toml_deserializes() {
    let toml = r#"
managers = [100, 200]
blacklist = [666]
managers_contacts = ["+7 (999) 123-45-67 Anna"]

[telegram]
bot_token = "123:ABC"

[storage]
database_path = "/tmp/rent.db"
wal_mode = false

[bot]
rate_limit_messages = 10
rate_limit_window = 30
max_booking_days = 90
min_booking_advance_hours = 12
pagination_size = 6
reminder_time = "08:30"
utc_offset = "+05:00"

[sync]
enabled = false
batch_size = 3
mirror_dir = "/tmp/mirror"

[exports]
path = "/tmp/exports"

[prometheus]
enabled = false
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.managers, vec![100, 200]);
    assert_eq!(config.blacklist, vec![666]);
    assert_eq!(config.managers_contacts.len(), 1);
    assert_eq!(config.telegram.bot_token.as_deref(), Some("123:ABC"));
    assert_eq!(config.storage.database_path, "/tmp/rent.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.bot.rate_limit_messages, 10);
    assert_eq!(config.bot.min_booking_advance_hours, 12);
    assert_eq!(config.bot.reminder_time, "08:30");
    assert_eq!(config.bot.booking_pagination_size, 5);
    assert!(!config.sync.enabled);
    assert_eq!(config.sync.batch_size, 3);
    assert_eq!(config.sync.max_retries, 5);
    assert_eq!(config.sync.mirror_dir.as_deref(), Some("/tmp/mirror"));
    assert_eq!(config.exports.path, "/tmp/exports");
    assert!(!config.prometheus.enabled);
}

#[test]
fn empty_toml_uses_defaults() {
    let config = load_config_from_str("").expect("empty config is fine");
    assert!(config.managers.is_empty());
    assert!(config.telegram.bot_token.is_none());
    assert_eq!(config.bot.max_booking_days, 365);
    assert_eq!(config.bot.utc_offset, "+03:00");
    assert!(config.sync.enabled);
    assert!(config.prometheus.enabled);
}

#[test]
fn unknown_top_level_key_is_rejected() {
    let err = load_config_from_str("managres = [1]\n").expect_err("typo must fail");
    let msg = format!("{err}");
    assert!(
        msg.contains("unknown field") || msg.contains("managres"),
        "got: {msg}"
    );
}

#[test]
fn dotted_override_sets_section_key() {
    // Same shape the RENTBOT_ env provider produces after key mapping.
    let config: RentbotConfig = Figment::new()
        .merge(Serialized::defaults(RentbotConfig::default()))
        .merge(Toml::string("[bot]\nrate_limit_messages = 5\n"))
        .merge(("bot.rate_limit_messages", 50))
        .merge(("telegram.bot_token", "from-env"))
        .extract()
        .expect("override should merge");
    assert_eq!(config.bot.rate_limit_messages, 50);
    assert_eq!(config.telegram.bot_token.as_deref(), Some("from-env"));
}

#[test]
fn missing_config_files_silently_skipped() {
    let config: RentbotConfig = Figment::new()
        .merge(Serialized::defaults(RentbotConfig::default()))
        .merge(Toml::file("/nonexistent/path/rentbot.toml"))
        .extract()
        .expect("missing file should be skipped");
    assert_eq!(config.bot.pagination_size, 8);
}

#[test]
fn unknown_key_carries_suggestion_and_valid_keys() {
    let toml = r#"
[bot]
rate_limit_mesages = 3
"#;
    let errors = load_and_validate_str(toml).expect_err("should produce errors");
    let found = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion, valid_keys, .. } if {
            key == "rate_limit_mesages"
                && suggestion.as_deref() == Some("rate_limit_messages")
                && valid_keys.contains("reminder_time")
        })
    });
    assert!(found, "got: {errors:?}");
}

#[test]
fn invalid_type_is_reported() {
    let toml = r#"
[bot]
max_booking_days = "a year"
"#;
    let errors = load_and_validate_str(toml).expect_err("should reject type");
    assert!(
        errors.iter().any(|e| matches!(e, ConfigError::InvalidType { .. })
            || e.to_string().contains("max_booking_days")),
        "got: {errors:?}"
    );
}

#[test]
fn validation_errors_are_collected() {
    let toml = r#"
managers = [1]
blacklist = [1]

[bot]
reminder_time = "9am"
utc_offset = "+3"
"#;
    let errors = load_and_validate_str(toml).expect_err("should fail validation");
    let validation: Vec<_> = errors
        .iter()
        .filter(|e| matches!(e, ConfigError::Validation { .. }))
        .collect();
    assert_eq!(validation.len(), 3, "got: {errors:?}");
}

#[test]
fn error_renders_with_miette() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let error = ConfigError::UnknownKey {
        key: "miror_dir".to_string(),
        suggestion: Some("mirror_dir".to_string()),
        valid_keys: "enabled, mirror_dir".to_string(),
        span: None,
        src: None,
    };
    assert!(error.code().is_some());
    let help = error.help().map(|h| h.to_string()).unwrap_or_default();
    assert!(help.contains("did you mean `mirror_dir`"), "got: {help}");

    let mut buf = String::new();
    GraphicalReportHandler::new()
        .render_report(&mut buf, &error)
        .expect("should render");
    assert!(buf.contains("miror_dir"));
}

#[test]
fn unknown_key_in_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rentbot.toml");
    std::fs::write(&path, "[sync]\nmiror_dir = \"/x\"\n").unwrap();

    let errors = load_and_validate_path(&path).expect_err("typo must fail");
    let found = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion, .. }
            if key == "miror_dir" && suggestion.as_deref() == Some("mirror_dir"))
    });
    assert!(found, "got: {errors:?}");
}
