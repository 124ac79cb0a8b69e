// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Exponential backoff for failed outbox tasks.

use std::time::Duration;

/// Shift cap so the multiplier cannot overflow.
const MAX_SHIFT: u32 = 16;

/// What to do with a task whose attempt just failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try again after the delay.
    Retry(Duration),
    /// Out of attempts; park the task as failed.
    Fail,
}

/// `base * 2^attempt`, saturating.
pub fn retry_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(1u32 << attempt.min(MAX_SHIFT))
}

/// Decide the fate of a task that has already failed `retry_count` times
/// before the attempt that just failed.
///
/// The attempt that brings the total to `max_retries` parks the task, so a
/// task never records more than `max_retries` attempts.
pub fn decide(retry_count: i64, base: Duration, max_retries: u32) -> RetryDecision {
    let attempt = u32::try_from(retry_count.max(0)).unwrap_or(u32::MAX);
    if attempt.saturating_add(1) >= max_retries.max(1) {
        RetryDecision::Fail
    } else {
        RetryDecision::Retry(retry_delay(base, attempt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: Duration = Duration::from_secs(2);

    #[test]
    fn delay_doubles_per_attempt() {
        assert_eq!(retry_delay(BASE, 0), Duration::from_secs(2));
        assert_eq!(retry_delay(BASE, 1), Duration::from_secs(4));
        assert_eq!(retry_delay(BASE, 4), Duration::from_secs(32));
    }

    #[test]
    fn huge_attempts_saturate() {
        assert_eq!(
            retry_delay(BASE, 200),
            Duration::from_secs(2 * (1 << MAX_SHIFT))
        );
        assert_eq!(
            retry_delay(Duration::MAX, 3),
            Duration::MAX
        );
    }

    #[test]
    fn fifth_failure_parks_the_task() {
        assert_eq!(decide(0, BASE, 5), RetryDecision::Retry(Duration::from_secs(2)));
        assert_eq!(decide(3, BASE, 5), RetryDecision::Retry(Duration::from_secs(16)));
        assert_eq!(decide(4, BASE, 5), RetryDecision::Fail);
        assert_eq!(decide(9, BASE, 5), RetryDecision::Fail);
    }

    #[test]
    fn zero_max_retries_fails_first_attempt() {
        assert_eq!(decide(0, BASE, 0), RetryDecision::Fail);
        assert_eq!(decide(0, BASE, 1), RetryDecision::Fail);
    }
}
