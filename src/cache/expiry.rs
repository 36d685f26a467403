//! Expiry Policy Module
//!
//! Turns a TTL into the absolute Unix timestamp stored next to each value.

use chrono::{DateTime, Duration, Months, Utc};

/// Expiry given to entries stored without a TTL (year 2286).
pub const MAX_EXPIRY: i64 = 9_999_999_999;

// == TTL ==
/// Time-to-live accepted by every backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// Whole seconds; zero or negative means "already expired"
    Seconds(i64),
    /// Fixed-length duration added to the current instant
    Delta(Duration),
    /// Calendar months added to the current instant
    Months(u32),
}

impl From<i64> for Ttl {
    fn from(seconds: i64) -> Self {
        Ttl::Seconds(seconds)
    }
}

impl From<Duration> for Ttl {
    fn from(delta: Duration) -> Self {
        Ttl::Delta(delta)
    }
}

// == Expiry At ==
/// Computes the expiry timestamp of a TTL relative to `now`.
///
/// Calendar TTLs use the timestamp of `now + ttl` directly so that months
/// keep their real length. Anything past [`MAX_EXPIRY`] is clamped to it.
pub fn expiry_at(ttl: Option<Ttl>, now: DateTime<Utc>) -> i64 {
    let until = match ttl {
        None => return MAX_EXPIRY,
        Some(Ttl::Seconds(seconds)) if seconds <= 0 => return 0,
        Some(Ttl::Seconds(seconds)) if seconds > MAX_EXPIRY => return MAX_EXPIRY,
        Some(Ttl::Seconds(seconds)) => return now.timestamp().saturating_add(seconds).min(MAX_EXPIRY),
        Some(Ttl::Delta(delta)) if delta <= Duration::zero() => return 0,
        Some(Ttl::Delta(delta)) => now.checked_add_signed(delta),
        Some(Ttl::Months(0)) => return 0,
        Some(Ttl::Months(months)) => now.checked_add_months(Months::new(months)),
    };

    until.map_or(MAX_EXPIRY, |at| at.timestamp().min(MAX_EXPIRY))
}

/// Computes the expiry timestamp of a TTL relative to the wall clock.
pub fn compute_expiry(ttl: Option<Ttl>) -> i64 {
    expiry_at(ttl, Utc::now())
}

/// Seconds left before an entry stored now with `ttl` would expire.
///
/// Zero or negative means the value must not be stored at all.
pub fn seconds_until_expiry(ttl: Option<Ttl>, now: DateTime<Utc>) -> i64 {
    expiry_at(ttl, now) - now.timestamp()
}

// == Is Expired ==
/// An entry is still valid during the very second it expires.
pub fn is_expired(expiry: i64, now: i64) -> bool {
    now > expiry
}

/// Returns the current Unix timestamp in seconds.
pub fn current_timestamp() -> i64 {
    Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 31, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_no_ttl_never_expires() {
        assert_eq!(expiry_at(None, fixed_now()), MAX_EXPIRY);
        assert_eq!(compute_expiry(None), MAX_EXPIRY);
    }

    #[test]
    fn test_non_positive_seconds_are_expired() {
        assert_eq!(expiry_at(Some(Ttl::Seconds(0)), fixed_now()), 0);
        assert_eq!(expiry_at(Some(Ttl::Seconds(-1)), fixed_now()), 0);
    }

    #[test]
    fn test_huge_seconds_clamped() {
        assert_eq!(
            expiry_at(Some(Ttl::Seconds(MAX_EXPIRY + 1)), fixed_now()),
            MAX_EXPIRY
        );
        assert_eq!(expiry_at(Some(Ttl::Seconds(i64::MAX)), fixed_now()), MAX_EXPIRY);
    }

    #[test]
    fn test_seconds_added_to_now() {
        let now = fixed_now();
        assert_eq!(expiry_at(Some(Ttl::Seconds(60)), now), now.timestamp() + 60);
    }

    #[test]
    fn test_delta_added_to_now() {
        let now = fixed_now();
        let ttl = Some(Ttl::Delta(Duration::hours(2)));
        assert_eq!(expiry_at(ttl, now), now.timestamp() + 7200);
        assert_eq!(expiry_at(Some(Ttl::Delta(Duration::zero())), now), 0);
    }

    #[test]
    fn test_months_follow_calendar() {
        // 2024-01-31 + 1 month lands on 2024-02-29 (leap year, clamped day)
        let expected = Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap();
        assert_eq!(
            expiry_at(Some(Ttl::Months(1)), fixed_now()),
            expected.timestamp()
        );
    }

    #[test]
    fn test_months_past_sentinel_clamped() {
        assert_eq!(
            expiry_at(Some(Ttl::Months(12 * 400)), fixed_now()),
            MAX_EXPIRY
        );
    }

    #[test]
    fn test_seconds_until_expiry() {
        let now = fixed_now();
        assert_eq!(seconds_until_expiry(Some(Ttl::Seconds(30)), now), 30);
        assert!(seconds_until_expiry(Some(Ttl::Seconds(0)), now) <= 0);
    }

    #[test]
    fn test_is_expired_is_strict() {
        assert!(!is_expired(100, 100));
        assert!(is_expired(100, 101));
        assert!(!is_expired(MAX_EXPIRY, current_timestamp()));
        assert!(is_expired(0, current_timestamp()));
    }
}
