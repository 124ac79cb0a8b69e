// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `DD.MM.YYYY` parsing and date ranges.

use chrono::NaiveDate;

use rentbot_core::RentError;

const INPUT_FORMAT: &str = "%d.%m.%Y";

/// Most dates a single range booking may cover.
pub const MAX_RANGE_DATES: usize = 31;

pub fn parse_date(raw: &str) -> Result<NaiveDate, RentError> {
    NaiveDate::parse_from_str(raw.trim(), INPUT_FORMAT)
        .map_err(|_| RentError::Validation("date must look like DD.MM.YYYY".into()))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(INPUT_FORMAT).to_string()
}

/// Every date from `start` to `end` inclusive, at most [`MAX_RANGE_DATES`].
pub fn date_range(start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>, RentError> {
    if end < start {
        return Err(RentError::Validation(
            "end date must not be before start date".into(),
        ));
    }
    let days = (end - start).num_days() as usize + 1;
    if days > MAX_RANGE_DATES {
        return Err(RentError::Validation(format!(
            "a range may cover at most {MAX_RANGE_DATES} days"
        )));
    }
    Ok(start.iter_days().take(days).collect())
}
