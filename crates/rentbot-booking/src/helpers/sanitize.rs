// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Free-text input cleanup.

use rentbot_core::RentError;

/// Longest sanitised output, in characters, entities included.
pub const MAX_INPUT_CHARS: usize = 500;

pub const MIN_NAME_CHARS: usize = 2;
pub const MAX_NAME_CHARS: usize = 150;

/// Drops control characters, collapses whitespace, HTML-escapes `<`, `>`,
/// `"` and `'`, then truncates. An entity that would cross the limit is
/// dropped whole.
pub fn sanitize_input(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter_map(|c| {
            if c.is_whitespace() {
                Some(' ')
            } else if c.is_control() {
                None
            } else {
                Some(c)
            }
        })
        .collect();
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    escape_html(&collapsed, MAX_INPUT_CHARS)
}

fn escape_html(s: &str, limit: usize) -> String {
    let mut out = String::with_capacity(s.len().min(limit * 4));
    let mut used = 0;
    let mut buf = [0u8; 4];
    for c in s.chars() {
        let (piece, width): (&str, usize) = match c {
            '<' => ("&lt;", 4),
            '>' => ("&gt;", 4),
            '"' => ("&quot;", 6),
            '\'' => ("&#39;", 5),
            _ => (c.encode_utf8(&mut buf), 1),
        };
        if used + width > limit {
            break;
        }
        out.push_str(piece);
        used += width;
    }
    out
}

/// Sanitises a person's name and checks its length.
pub fn validate_name(raw: &str) -> Result<String, RentError> {
    let name = sanitize_input(raw);
    let len = name.chars().count();
    if !(MIN_NAME_CHARS..=MAX_NAME_CHARS).contains(&len) {
        return Err(RentError::Validation(format!(
            "name must be {MIN_NAME_CHARS}-{MAX_NAME_CHARS} characters"
        )));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_controls_and_collapses_whitespace() {
        assert_eq!(sanitize_input("  Ivan\u{0007}\n\t Petrov  "), "Ivan Petrov");
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(
            sanitize_input("<b>\"Bob's\"</b>"),
            "&lt;b&gt;&quot;Bob&#39;s&quot;&lt;/b&gt;"
        );
    }

    #[test]
    fn truncates_long_input() {
        let long = "я".repeat(MAX_INPUT_CHARS + 20);
        assert_eq!(sanitize_input(&long).chars().count(), MAX_INPUT_CHARS);
    }

    #[test]
    fn escaped_output_respects_the_cap() {
        let angles = "<".repeat(MAX_INPUT_CHARS);
        let out = sanitize_input(&angles);
        assert_eq!(out.chars().count(), MAX_INPUT_CHARS);
        assert_eq!(out, "&lt;".repeat(MAX_INPUT_CHARS / 4));

        // An entity that does not fit is dropped rather than cut.
        let mixed = format!("{}\"", "a".repeat(MAX_INPUT_CHARS - 3));
        let out = sanitize_input(&mixed);
        assert_eq!(out, "a".repeat(MAX_INPUT_CHARS - 3));
    }

    #[test]
    fn name_length_bounds() {
        assert_eq!(validate_name(" Иван ").unwrap(), "Иван");
        assert!(validate_name("A").is_err());
        assert!(validate_name(&"a".repeat(151)).is_err());
        assert!(validate_name(&"a".repeat(150)).is_ok());
    }
}
