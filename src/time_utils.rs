// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, Datelike, FixedOffset, SecondsFormat, Timelike, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Describe how long ago `then` was, relative to `now`.
///
/// Four buckets: seconds (< 60s), minutes (< 60m), clock time (< 24h) and
/// date plus hour (>= 24h). Clock values are rendered in `offset`.
pub fn elapsed_expression(now: DateTime<Utc>, then: DateTime<Utc>, offset: FixedOffset) -> String {
    let elapsed = (now - then).max(chrono::Duration::zero());

    if elapsed.num_seconds() < 60 {
        return format!("{} seconds ago", elapsed.num_seconds());
    }
    if elapsed.num_minutes() < 60 {
        return format!("{} minutes ago", elapsed.num_minutes());
    }

    let local = then.with_timezone(&offset);
    if elapsed.num_hours() < 24 {
        format!("around {}:{:02}", local.hour(), local.minute())
    } else {
        format!(
            "around {}:00 on {}/{}",
            local.hour(),
            local.month(),
            local.day()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn jst() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 6, 30, 0).unwrap()
    }

    #[test]
    fn test_seconds_bucket() {
        let then = now() - Duration::seconds(42);
        assert_eq!(elapsed_expression(now(), then, jst()), "42 seconds ago");
    }

    #[test]
    fn test_minutes_bucket_starts_at_sixty_seconds() {
        let then = now() - Duration::seconds(60);
        assert_eq!(elapsed_expression(now(), then, jst()), "1 minutes ago");

        let then = now() - Duration::minutes(59) - Duration::seconds(59);
        assert_eq!(elapsed_expression(now(), then, jst()), "59 minutes ago");
    }

    #[test]
    fn test_clock_time_bucket_uses_local_offset() {
        // 06:30Z - 3h05m = 03:25Z = 12:25 JST
        let then = now() - Duration::hours(3) - Duration::minutes(5);
        assert_eq!(elapsed_expression(now(), then, jst()), "around 12:25");
    }

    #[test]
    fn test_date_bucket_after_a_day() {
        // 2026-03-12 20:00Z = 2026-03-13 05:00 JST
        let then = Utc.with_ymd_and_hms(2026, 3, 12, 20, 0, 0).unwrap();
        assert_eq!(
            elapsed_expression(now(), then, jst()),
            "around 5:00 on 3/13"
        );
    }

    #[test]
    fn test_future_timestamp_clamps_to_zero() {
        let then = now() + Duration::seconds(30);
        assert_eq!(elapsed_expression(now(), then, jst()), "0 seconds ago");
    }

    #[test]
    fn test_format_utc_rfc3339() {
        assert_eq!(format_utc_rfc3339(now()), "2026-03-14T06:30:00Z");
    }
}
