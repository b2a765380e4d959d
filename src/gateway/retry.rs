//! Provider-paced retry for throttled batches.

use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use rand::Rng;

/// How a throttled batch is re-attempted.
///
/// The default waits exactly what the gateway asks for, forever. The other
/// knobs bound that behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum re-attempts per batch (`None` = unbounded)
    pub max_retries: Option<u32>,
    /// Upper bound applied to the provider delay
    pub max_delay: Option<Duration>,
    /// Jitter factor (0.0 to 1.0), only ever lengthens the delay
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: None,
            max_delay: None,
            jitter_factor: 0.0,
        }
    }
}

impl RetryPolicy {
    /// Whether another attempt is allowed after `retries` re-attempts.
    pub fn allows(&self, retries: u32) -> bool {
        self.max_retries.map_or(true, |max| retries < max)
    }

    /// Final sleep for a provider-requested delay.
    pub fn delay_for(&self, requested: Duration) -> Duration {
        let capped = match self.max_delay {
            Some(max) => requested.min(max),
            None => requested,
        };

        if self.jitter_factor > 0.0 {
            let spread = capped.as_secs_f64() * self.jitter_factor;
            let jitter = rand::rng().random_range(0.0..=spread);
            let jitter = Duration::try_from_secs_f64(jitter).unwrap_or(Duration::ZERO);
            capped.saturating_add(jitter)
        } else {
            capped
        }
    }
}

/// Obsolete HTTP-date layouts still accepted by recipients (RFC 850, asctime).
const OBSOLETE_DATE_FORMATS: [&str; 2] = ["%A, %d-%b-%y %H:%M:%S GMT", "%a %b %e %H:%M:%S %Y"];

fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc2822(value) {
        return Some(at.with_timezone(&Utc));
    }
    OBSOLETE_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|at| at.and_utc())
}

/// Interpret a `retry-after` header value.
///
/// Accepts a number of seconds or an HTTP-date. Returns `None` unless the
/// result is a positive delay that fits in a `Duration`.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();

    let seconds = match value.parse::<f64>() {
        Ok(seconds) => seconds,
        Err(_) => {
            let at = parse_http_date(value)?;
            at.signed_duration_since(now).num_milliseconds() as f64 / 1000.0
        }
    };

    if seconds > 0.0 {
        Duration::try_from_secs_f64(seconds).ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2015, 10, 21, 7, 28, 0).unwrap()
    }

    #[test]
    fn test_parse_integer_seconds() {
        assert_eq!(parse_retry_after("2", now()), Some(Duration::from_secs(2)));
        assert_eq!(parse_retry_after(" 120 ", now()), Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_parse_http_date() {
        let delay = parse_retry_after("Wed, 21 Oct 2015 07:28:30 GMT", now());
        assert_eq!(delay, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_parse_obsolete_http_dates() {
        let rfc850 = parse_retry_after("Wednesday, 21-Oct-15 07:28:30 GMT", now());
        let asctime = parse_retry_after("Wed Oct 21 07:28:30 2015", now());
        assert_eq!(rfc850, Some(Duration::from_secs(30)));
        assert_eq!(asctime, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_rejects_delays_too_large_for_duration() {
        assert_eq!(parse_retry_after("99999999999999999999", now()), None);
        assert_eq!(parse_retry_after("1e300", now()), None);
        assert_eq!(parse_retry_after("inf", now()), None);
    }

    #[test]
    fn test_jitter_on_huge_delay_saturates() {
        let policy = RetryPolicy {
            jitter_factor: 1.0,
            ..Default::default()
        };
        assert!(policy.delay_for(Duration::MAX) >= Duration::MAX - Duration::from_secs(1));
        let near_max = Duration::from_secs(u64::MAX / 2);
        assert!(policy.delay_for(near_max) >= near_max);
    }

    #[test]
    fn test_rejects_non_positive_and_garbage() {
        assert_eq!(parse_retry_after("0", now()), None);
        assert_eq!(parse_retry_after("-5", now()), None);
        assert_eq!(parse_retry_after("NaN", now()), None);
        assert_eq!(parse_retry_after("soon", now()), None);
        assert_eq!(parse_retry_after("", now()), None);
        // Date in the past
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:27:00 GMT", now()), None);
    }

    #[test]
    fn test_default_policy_is_unbounded() {
        let policy = RetryPolicy::default();
        assert!(policy.allows(0));
        assert!(policy.allows(10_000));
        assert_eq!(policy.delay_for(Duration::from_secs(90)), Duration::from_secs(90));
    }

    #[test]
    fn test_max_retries() {
        let policy = RetryPolicy {
            max_retries: Some(2),
            ..Default::default()
        };
        assert!(policy.allows(0));
        assert!(policy.allows(1));
        assert!(!policy.allows(2));
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = RetryPolicy {
            max_delay: Some(Duration::from_secs(10)),
            ..Default::default()
        };
        assert_eq!(policy.delay_for(Duration::from_secs(300)), Duration::from_secs(10));
        assert_eq!(policy.delay_for(Duration::from_secs(3)), Duration::from_secs(3));
    }

    #[test]
    fn test_jitter_stays_within_spread() {
        let policy = RetryPolicy {
            jitter_factor: 0.5,
            ..Default::default()
        };
        for _ in 0..50 {
            let delay = policy.delay_for(Duration::from_secs(10));
            assert!(delay >= Duration::from_secs(10));
            assert!(delay <= Duration::from_secs(15));
        }
    }
}
