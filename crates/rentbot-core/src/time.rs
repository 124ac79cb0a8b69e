// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Service time zone helpers.
//!
//! Booking dates have day granularity in the service's local zone, which is
//! configured as a fixed UTC offset.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeDelta, Utc};

/// Calendar date of `now` in the service zone.
pub fn local_date(now: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    now.with_timezone(&offset).date_naive()
}

/// The UTC instant at which `date` starts in the service zone.
pub fn day_start_utc(date: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    let local_midnight = date.and_time(NaiveTime::MIN);
    (local_midnight - TimeDelta::seconds(i64::from(offset.local_minus_utc()))).and_utc()
}

/// The UTC instant of `time` on `date` in the service zone.
pub fn local_instant_utc(date: NaiveDate, time: NaiveTime, offset: FixedOffset) -> DateTime<Utc> {
    (date.and_time(time) - TimeDelta::seconds(i64::from(offset.local_minus_utc()))).and_utc()
}

/// Parses `+HH:MM`, `-HH:MM`, or `Z` into a fixed offset.
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset, String> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw == "+00:00" || raw == "-00:00" {
        return FixedOffset::east_opt(0).ok_or_else(|| "invalid offset".to_string());
    }
    let (sign, rest) = match raw.chars().next() {
        Some('+') => (1, &raw[1..]),
        Some('-') => (-1, &raw[1..]),
        _ => return Err(format!("offset `{raw}` must start with + or -")),
    };
    let (hours, minutes) = rest
        .split_once(':')
        .ok_or_else(|| format!("offset `{raw}` must look like +HH:MM"))?;
    let hours: i32 = hours
        .parse()
        .map_err(|_| format!("offset `{raw}` has invalid hours"))?;
    let minutes: i32 = minutes
        .parse()
        .map_err(|_| format!("offset `{raw}` has invalid minutes"))?;
    if !(0..=14).contains(&hours) || !(0..60).contains(&minutes) {
        return Err(format!("offset `{raw}` is out of range"));
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .ok_or_else(|| format!("offset `{raw}` is out of range"))
}

/// Parses a `HH:MM` wall-clock time.
pub fn parse_hh_mm(raw: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| format!("time `{raw}` must look like HH:MM"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn local_date_crosses_midnight_with_offset() {
        let msk = parse_utc_offset("+03:00").unwrap();
        // 22:30 UTC is already the next day in UTC+3.
        let now = utc("2026-05-31T22:30:00Z");
        assert_eq!(
            local_date(now, msk),
            NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
        );
    }

    #[test]
    fn day_start_is_shifted_by_offset() {
        let msk = parse_utc_offset("+03:00").unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        assert_eq!(day_start_utc(date, msk), utc("2026-05-31T21:00:00Z"));
    }

    #[test]
    fn negative_offsets_parse() {
        let ny = parse_utc_offset("-05:00").unwrap();
        assert_eq!(ny.local_minus_utc(), -5 * 3600);
        assert!(parse_utc_offset("03:00").is_err());
        assert!(parse_utc_offset("+25:00").is_err());
        assert_eq!(parse_utc_offset("Z").unwrap().local_minus_utc(), 0);
    }

    #[test]
    fn hh_mm_parses() {
        assert_eq!(
            parse_hh_mm("09:00").unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap()
        );
        assert!(parse_hh_mm("9am").is_err());
    }
}
