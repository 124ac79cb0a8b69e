// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Phone number normalisation and display.

/// Extracts digits and normalises to the 11-digit `7XXXXXXXXXX` form.
///
/// A leading trunk `8` is replaced with `7` and a 10-digit number gets a `7`
/// prefix. Any other length yields an empty string.
pub fn normalize_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    match digits.len() {
        11 if digits.starts_with('8') => format!("7{}", &digits[1..]),
        11 => digits,
        10 => format!("7{digits}"),
        _ => String::new(),
    }
}

pub fn is_valid_phone(raw: &str) -> bool {
    !normalize_phone(raw).is_empty()
}

/// Renders `7DDDDDDDDDD` as `+7 (DDD) DDD-DD-DD`; anything else is returned as is.
pub fn format_phone(normalized: &str) -> String {
    if normalized.len() != 11
        || !normalized.starts_with('7')
        || !normalized.bytes().all(|b| b.is_ascii_digit())
    {
        return normalized.to_string();
    }
    format!(
        "+7 ({}) {}-{}-{}",
        &normalized[1..4],
        &normalized[4..7],
        &normalized[7..9],
        &normalized[9..11]
    )
}
