// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Date rules applied to every booking request.

use chrono::{DateTime, FixedOffset, Months, NaiveDate, Offset, TimeDelta, Utc};

use rentbot_config::RentbotConfig;
use rentbot_core::time::{day_start_utc, local_date};
use rentbot_core::RentError;

/// Booking horizon, advance notice, and service time zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingRules {
    pub max_booking_days: i64,
    pub min_booking_advance_hours: i64,
    pub offset: FixedOffset,
    /// Months before today covered by a schedule resync.
    pub schedule_months_back: u32,
    /// Months after today covered by a schedule resync.
    pub schedule_months_ahead: u32,
}

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            max_booking_days: 365,
            min_booking_advance_hours: 0,
            offset: Utc.fix(),
            schedule_months_back: 1,
            schedule_months_ahead: 2,
        }
    }
}

impl BookingRules {
    pub fn from_config(config: &RentbotConfig) -> Result<Self, RentError> {
        Ok(Self {
            max_booking_days: config.bot.max_booking_days,
            min_booking_advance_hours: config.bot.min_booking_advance_hours,
            offset: config.bot.offset().map_err(RentError::Config)?,
            schedule_months_back: config.sync.schedule_months_back,
            schedule_months_ahead: config.sync.schedule_months_ahead,
        })
    }

    /// Calendar date of `now` in the service zone.
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        local_date(now, self.offset)
    }

    /// Last date that may still be booked.
    pub fn horizon(&self, now: DateTime<Utc>) -> NaiveDate {
        self.today(now) + TimeDelta::days(self.max_booking_days)
    }

    /// Checks `date` against the advance-notice and horizon rules.
    ///
    /// With no advance notice configured any date from today on is accepted.
    /// Otherwise the day must start no earlier than `now + advance`.
    pub fn validate_date(&self, date: NaiveDate, now: DateTime<Utc>) -> Result<(), RentError> {
        if self.min_booking_advance_hours == 0 {
            if date < self.today(now) {
                return Err(RentError::PastDate);
            }
        } else {
            let earliest = now + TimeDelta::hours(self.min_booking_advance_hours);
            if day_start_utc(date, self.offset) < earliest {
                return Err(RentError::PastDate);
            }
        }
        if date > self.horizon(now) {
            return Err(RentError::DateTooFar);
        }
        Ok(())
    }

    /// The `[start, end]` window rewritten by a schedule resync.
    pub fn schedule_window(&self, now: DateTime<Utc>) -> (NaiveDate, NaiveDate) {
        let today = self.today(now);
        let start = today
            .checked_sub_months(Months::new(self.schedule_months_back))
            .unwrap_or(today);
        let end = today
            .checked_add_months(Months::new(self.schedule_months_ahead))
            .unwrap_or(today);
        (start, end)
    }
}
