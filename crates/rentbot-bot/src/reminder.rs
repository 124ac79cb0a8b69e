// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Daily day-before reminders.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeDelta, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use rentbot_booking::BookingService;
use rentbot_config::model::BotConfig;
use rentbot_core::chat::OutboundMessage;
use rentbot_core::time::{local_date, local_instant_utc};
use rentbot_core::{ChatChannel, Clock, RentError};

use crate::texts;

/// First instant strictly after `after` at which the zone's wall clock shows `at`.
pub fn next_occurrence(after: DateTime<Utc>, at: NaiveTime, offset: FixedOffset) -> DateTime<Utc> {
    let today = local_date(after, offset);
    let candidate = local_instant_utc(today, at, offset);
    if candidate > after {
        candidate
    } else {
        local_instant_utc(today + TimeDelta::days(1), at, offset)
    }
}

/// Once a day at `reminder_time` (service zone), reminds owners of
/// confirmed or changed bookings for the following day.
pub struct ReminderScheduler {
    bookings: Arc<BookingService>,
    channel: Arc<dyn ChatChannel>,
    clock: Arc<dyn Clock>,
    at: NaiveTime,
    offset: FixedOffset,
}

impl ReminderScheduler {
    pub fn new(
        bookings: Arc<BookingService>,
        channel: Arc<dyn ChatChannel>,
        clock: Arc<dyn Clock>,
        at: NaiveTime,
        offset: FixedOffset,
    ) -> Self {
        Self {
            bookings,
            channel,
            clock,
            at,
            offset,
        }
    }

    pub fn from_config(
        bookings: Arc<BookingService>,
        channel: Arc<dyn ChatChannel>,
        clock: Arc<dyn Clock>,
        config: &BotConfig,
    ) -> Result<Self, RentError> {
        let at = config.reminder_time().map_err(RentError::Config)?;
        let offset = config.offset().map_err(RentError::Config)?;
        Ok(Self::new(bookings, channel, clock, at, offset))
    }

    pub fn next_run(&self, after: DateTime<Utc>) -> DateTime<Utc> {
        next_occurrence(after, self.at, self.offset)
    }

    /// Sends one reminder per booking on `date`. Returns how many were delivered.
    pub async fn send_reminders(&self, date: NaiveDate) -> Result<usize, RentError> {
        let bookings = self.bookings.reminder_candidates(date).await?;
        let mut delivered = 0;
        for booking in &bookings {
            let msg = OutboundMessage::text(booking.user_id, texts::reminder(booking));
            match self.channel.send(msg).await {
                Ok(_) => delivered += 1,
                Err(e) => warn!(
                    booking_id = booking.id,
                    user_id = booking.user_id,
                    error = %e,
                    "reminder not delivered"
                ),
            }
        }
        info!(%date, candidates = bookings.len(), delivered, "reminders sent");
        Ok(delivered)
    }

    pub async fn run(&self, cancel: CancellationToken) {
        let mut after = self.clock.now();
        loop {
            let next = self.next_run(after);
            let wait = (next - self.clock.now()).to_std().unwrap_or(Duration::ZERO);
            debug!(next = %next, "next reminder run scheduled");
            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    let tomorrow = local_date(next, self.offset) + TimeDelta::days(1);
                    if let Err(e) = self.send_reminders(tomorrow).await {
                        warn!(error = %e, "reminder run failed");
                    }
                    after = next;
                }
                _ = cancel.cancelled() => {
                    info!("reminder scheduler shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn nine() -> NaiveTime {
        NaiveTime::from_hms_opt(9, 0, 0).unwrap()
    }

    fn msk() -> FixedOffset {
        FixedOffset::east_opt(3 * 3600).unwrap()
    }

    #[test]
    fn later_today_when_not_yet_passed() {
        // 05:00 UTC is 08:00 in +03:00.
        let now = Utc.with_ymd_and_hms(2025, 6, 4, 5, 0, 0).unwrap();
        assert_eq!(
            next_occurrence(now, nine(), msk()),
            Utc.with_ymd_and_hms(2025, 6, 4, 6, 0, 0).unwrap()
        );
    }

    #[test]
    fn tomorrow_once_passed_or_exactly_now() {
        let exactly = Utc.with_ymd_and_hms(2025, 6, 4, 6, 0, 0).unwrap();
        assert_eq!(
            next_occurrence(exactly, nine(), msk()),
            Utc.with_ymd_and_hms(2025, 6, 5, 6, 0, 0).unwrap()
        );
    }

    #[test]
    fn local_day_differs_from_utc_day() {
        // 22:30 UTC on the 4th is already 01:30 on the 5th in +03:00.
        let now = Utc.with_ymd_and_hms(2025, 6, 4, 22, 30, 0).unwrap();
        assert_eq!(
            next_occurrence(now, nine(), msk()),
            Utc.with_ymd_and_hms(2025, 6, 5, 6, 0, 0).unwrap()
        );
    }
}
