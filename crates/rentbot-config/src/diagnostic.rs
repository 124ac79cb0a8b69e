// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration diagnostics.
//!
//! Figment extraction failures are turned into [`ConfigError`] values that
//! miette renders with the offending line of `rentbot.toml` highlighted and,
//! for misspelled keys, the closest valid key.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use figment::error::Kind;
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Jaro-Winkler score below which no correction is offered.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// A configuration problem, ready for rendering.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(rentbot::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        /// Closest valid key, if any is close enough.
        suggestion: Option<String>,
        /// Comma-separated keys accepted in the same table.
        valid_keys: String,
        #[label("not a rentbot setting")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("`{key}` has the wrong type: {detail}")]
    #[diagnostic(code(rentbot::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        /// Dotted path, e.g. `bot.max_booking_days`.
        key: String,
        detail: String,
        expected: String,
        #[label("this value")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(rentbot::config::missing_key),
        help("add `{key} = <value>` to rentbot.toml")
    )]
    MissingKey { key: String },

    /// A value that parsed but makes no sense (bad time, overlapping lists).
    #[error("invalid configuration: {message}")]
    #[diagnostic(
        code(rentbot::config::validation),
        help("see rentbot.toml.example for accepted values")
    )]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(rentbot::config::other))]
    Other(String),
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

/// Converts every error inside a figment failure.
///
/// `toml_sources` pairs a file name with its content; it is used to attach
/// source spans when figment knows which file a value came from.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| convert(&error, toml_sources))
        .collect()
}

fn convert(error: &figment::Error, toml_sources: &[(String, String)]) -> ConfigError {
    let table: Vec<String> = error.path.iter().map(|s| s.to_string()).collect();
    match &error.kind {
        Kind::UnknownField(field, expected) => {
            let (span, src) = locate(error, &table, field, toml_sources);
            ConfigError::UnknownKey {
                key: field.clone(),
                suggestion: suggest_key(field, expected),
                valid_keys: expected.join(", "),
                span,
                src,
            }
        }
        Kind::MissingField(field) => ConfigError::MissingKey {
            key: dotted(&table, field),
        },
        Kind::InvalidType(actual, expected) => {
            // For type errors figment's path ends with the key itself.
            let (span, src) = match table.split_last() {
                Some((field, parent)) => locate(error, parent, field, toml_sources),
                None => (None, None),
            };
            ConfigError::InvalidType {
                key: table.join("."),
                detail: format!("found {actual}"),
                expected: expected.to_string(),
                span,
                src,
            }
        }
        _ => ConfigError::Other(error.to_string()),
    }
}

fn dotted(table: &[String], field: &str) -> String {
    if table.is_empty() {
        field.to_string()
    } else {
        format!("{}.{field}", table.join("."))
    }
}

/// Finds the file the failing value came from and the key's span in it.
fn locate(
    error: &figment::Error,
    table: &[String],
    field: &str,
    toml_sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let origin = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });

    // Inline strings have no file origin; fall back to a single source.
    let source = match origin {
        Some(path) => toml_sources.iter().find(|(p, _)| *p == path),
        None if toml_sources.len() == 1 => toml_sources.first(),
        None => None,
    };

    let Some((name, content)) = source else {
        return (None, None);
    };
    match find_key_offset(content, table, field) {
        Some(offset) => (
            Some(SourceSpan::new(offset.into(), field.len())),
            Some(NamedSource::new(name, content.clone())),
        ),
        None => (None, None),
    }
}

/// Byte offset of `field` inside the `[table]` it belongs to.
///
/// Lines are scanned while tracking the current table header, so a key
/// with the same name in another table is never matched. An empty `table`
/// means the top level, before any header.
pub fn find_key_offset(content: &str, table: &[String], field: &str) -> Option<usize> {
    let wanted = table.join(".");
    let mut current = String::new();
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if let Some(header) = trimmed.strip_prefix('[') {
            current = header
                .split(']')
                .next()
                .unwrap_or_default()
                .trim()
                .to_string();
        } else if current == wanted {
            if let Some(rest) = trimmed.strip_prefix(field) {
                if rest.trim_start().starts_with('=') {
                    return Some(offset + (line.len() - trimmed.len()));
                }
            }
        }
        offset += line.len();
    }

    None
}

/// The valid key closest to `unknown`, if it clears the threshold.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|&key| (key, strsim::jaro_winkler(unknown, key)))
        .filter(|&(_, score)| score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(key, _)| key.to_string())
}

/// Prints each error to stderr with miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        match handler.render_report(&mut buf, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{buf}"),
            Err(_) => eprintln!("error: {error}"),
        }
    }
    eprintln!("rentbot: {} configuration error(s)", errors.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggests_rate_limit_key() {
        let valid = &["rate_limit_messages", "rate_limit_window", "max_booking_days"];
        assert_eq!(
            suggest_key("rate_limit_mesages", valid),
            Some("rate_limit_messages".to_string())
        );
    }

    #[test]
    fn no_suggestion_for_distant_typo() {
        assert_eq!(suggest_key("zzzzzz", &["bot_token"]), None);
    }

    #[test]
    fn key_offset_is_scoped_to_its_table() {
        let content = "[storage]\nwal_mode = true\n[bot]\npagnation_size = 3\n";
        let bot = vec!["bot".to_string()];
        let o = find_key_offset(content, &bot, "pagnation_size").unwrap();
        assert_eq!(&content[o..o + 14], "pagnation_size");
        assert!(find_key_offset(content, &bot, "wal_mode").is_none());
    }

    #[test]
    fn top_level_key_stops_at_first_table() {
        let content = "managres = [1]\n[bot]\nmanagres = 2\n";
        assert_eq!(find_key_offset(content, &[], "managres"), Some(0));

        let late = "[bot]\nlog_level = \"info\"\n";
        assert_eq!(find_key_offset(late, &[], "log_level"), None);
    }

    #[test]
    fn key_prefix_is_not_a_match() {
        let content = "[sync]\nenabled_extra = 1\nenabled = true\n";
        let o = find_key_offset(content, &["sync".to_string()], "enabled").unwrap();
        assert_eq!(&content[o..o + 14], "enabled = true");
    }

    #[test]
    fn missing_key_uses_dotted_path() {
        assert_eq!(dotted(&["bot".to_string()], "log_level"), "bot.log_level");
        assert_eq!(dotted(&[], "managers"), "managers");
    }
}
