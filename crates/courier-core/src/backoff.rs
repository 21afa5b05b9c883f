// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retry backoff schedule.

use chrono::Duration;

/// Delay to wait before the next attempt, given the 1-based number of the
/// attempt that just failed.
///
/// Schedule: 1m, 5m, 15m, 1h, 6h, then a flat 24h from the sixth attempt on.
pub fn retry_delay(attempt: u32) -> Duration {
    match attempt {
        1 => Duration::minutes(1),
        2 => Duration::minutes(5),
        3 => Duration::minutes(15),
        4 => Duration::hours(1),
        5 => Duration::hours(6),
        _ => Duration::hours(24),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_matches_fixed_table() {
        assert_eq!(retry_delay(1), Duration::minutes(1));
        assert_eq!(retry_delay(2), Duration::minutes(5));
        assert_eq!(retry_delay(3), Duration::minutes(15));
        assert_eq!(retry_delay(4), Duration::hours(1));
        assert_eq!(retry_delay(5), Duration::hours(6));
    }

    #[test]
    fn schedule_is_flat_after_fifth_attempt() {
        for attempt in 6..=64 {
            assert_eq!(retry_delay(attempt), Duration::hours(24), "attempt {attempt}");
        }
    }
}
