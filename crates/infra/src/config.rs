use chrono_tz::Tz;
use std::{fmt::Display, str::FromStr};
use tracing::warn;

const MIN_POLL_INTERVAL_SECS: u64 = 30;
const MAX_POLL_INTERVAL_SECS: u64 = 60;
const MAX_DELIVERY_ATTEMPTS: u32 = 10;
const MAX_DELIVERY_TIMEOUT_SECS: u64 = 300;
/// Upper bound of a single wait between delivery attempts
pub const MAX_DELIVERY_BACKOFF_MILLIS: u64 = 60_000;
/// Time a claim outlives the slowest possible delivery
const CLAIM_LEASE_MARGIN_SECS: i64 = 60;
const MAX_CLAIM_LEASE_SECS: i64 = 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the application to run on
    pub port: usize,
    /// Timezone used for owners that do not state one
    pub default_timezone: Tz,
    /// How often the dispatcher looks for due reminders. Kept between 30
    /// and 60 seconds, coarser than that delays reminders noticeably.
    pub poll_interval_secs: u64,
    /// Maximum number of due reminders handled in a single poll
    pub dispatch_batch_limit: usize,
    /// Maximum number of deliveries in flight at the same time
    pub delivery_concurrency: usize,
    /// Delivery attempts per reminder within one poll
    pub delivery_max_attempts: u32,
    /// Wait before the first retry, doubled for every following retry
    pub delivery_backoff_millis: u64,
    /// A delivery that has not completed within this time is a transient failure
    pub delivery_timeout_secs: u64,
    /// Maximum number of characters in a reminder text
    pub max_payload_length: usize,
    /// How long a dispatcher may hold a reminder it is firing. Always longer
    /// than the slowest delivery with all of its retries.
    pub claim_lease_secs: i64,
}

impl Config {
    pub fn new() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self {
            port: parse_var(&lookup, "PORT", 5000),
            default_timezone: parse_var(&lookup, "NUDGE_DEFAULT_TIMEZONE", Tz::UTC),
            poll_interval_secs: clamp_var(
                "NUDGE_POLL_INTERVAL_SECS",
                parse_var(&lookup, "NUDGE_POLL_INTERVAL_SECS", 30u64),
                MIN_POLL_INTERVAL_SECS,
                MAX_POLL_INTERVAL_SECS,
            ),
            dispatch_batch_limit: parse_var(&lookup, "NUDGE_DISPATCH_BATCH_LIMIT", 100usize).max(1),
            delivery_concurrency: parse_var(&lookup, "NUDGE_DELIVERY_CONCURRENCY", 8usize).max(1),
            delivery_max_attempts: clamp_var(
                "NUDGE_DELIVERY_MAX_ATTEMPTS",
                parse_var(&lookup, "NUDGE_DELIVERY_MAX_ATTEMPTS", 3u32),
                1,
                MAX_DELIVERY_ATTEMPTS,
            ),
            delivery_backoff_millis: clamp_var(
                "NUDGE_DELIVERY_BACKOFF_MILLIS",
                parse_var(&lookup, "NUDGE_DELIVERY_BACKOFF_MILLIS", 500u64),
                0,
                MAX_DELIVERY_BACKOFF_MILLIS,
            ),
            delivery_timeout_secs: clamp_var(
                "NUDGE_DELIVERY_TIMEOUT_SECS",
                parse_var(&lookup, "NUDGE_DELIVERY_TIMEOUT_SECS", 10u64),
                1,
                MAX_DELIVERY_TIMEOUT_SECS,
            ),
            max_payload_length: parse_var(&lookup, "NUDGE_MAX_PAYLOAD_LENGTH", 500usize).max(1),
            claim_lease_secs: 0,
        };

        let min_lease = config.delivery_budget_secs() + CLAIM_LEASE_MARGIN_SECS;
        config.claim_lease_secs = clamp_var(
            "NUDGE_CLAIM_LEASE_SECS",
            parse_var(&lookup, "NUDGE_CLAIM_LEASE_SECS", 300i64),
            min_lease,
            MAX_CLAIM_LEASE_SECS.max(min_lease),
        );
        config
    }

    /// The longest a delivery can take with every attempt timing out and all
    /// the waits in between
    pub fn delivery_budget_secs(&self) -> i64 {
        let mut backoff = self.delivery_backoff_millis.min(MAX_DELIVERY_BACKOFF_MILLIS);
        let mut waits_millis = 0u64;
        for _ in 1..self.delivery_max_attempts {
            waits_millis = waits_millis.saturating_add(backoff);
            backoff = next_backoff(backoff);
        }
        let secs = u64::from(self.delivery_max_attempts)
            .saturating_mul(self.delivery_timeout_secs)
            .saturating_add(waits_millis.div_ceil(1000));
        i64::try_from(secs).unwrap_or(i64::MAX)
    }
}

/// The wait after `backoff_millis`, doubled and capped
pub fn next_backoff(backoff_millis: u64) -> u64 {
    backoff_millis
        .saturating_mul(2)
        .min(MAX_DELIVERY_BACKOFF_MILLIS)
}

fn clamp_var<T>(key: &str, value: T, min: T, max: T) -> T
where
    T: Ord + Copy + Display,
{
    let clamped = value.clamp(min, max);
    if clamped != value {
        warn!(
            "{}: {} is outside of {}-{}, using {}.",
            key, value, min, max, clamped
        );
    }
    clamped
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Display,
{
    let value = match lookup(key) {
        Some(value) => value,
        None => return default,
    };
    match value.trim().parse::<T>() {
        Ok(parsed) => parsed,
        Err(_) => {
            warn!(
                "The given {}: {} is not valid, falling back to the default: {}.",
                key, value, default
            );
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        let vars = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn uses_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.port, 5000);
        assert_eq!(config.default_timezone, Tz::UTC);
        assert_eq!(config.poll_interval_secs, 30);
        assert_eq!(config.dispatch_batch_limit, 100);
        assert_eq!(config.delivery_concurrency, 8);
        assert_eq!(config.delivery_max_attempts, 3);
        assert_eq!(config.delivery_backoff_millis, 500);
        assert_eq!(config.delivery_timeout_secs, 10);
        assert_eq!(config.max_payload_length, 500);
        assert_eq!(config.claim_lease_secs, 300);
    }

    #[test]
    fn reads_and_validates_values() {
        let config = config_from(&[
            ("PORT", "8080"),
            ("NUDGE_DEFAULT_TIMEZONE", "America/New_York"),
            ("NUDGE_POLL_INTERVAL_SECS", "5"),
            ("NUDGE_DELIVERY_CONCURRENCY", "not a number"),
        ]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.default_timezone, chrono_tz::America::New_York);
        assert_eq!(config.poll_interval_secs, 30);
        assert_eq!(config.delivery_concurrency, 8);

        let config = config_from(&[
            ("NUDGE_POLL_INTERVAL_SECS", "600"),
            ("NUDGE_DEFAULT_TIMEZONE", "Mars/Olympus"),
        ]);
        assert_eq!(config.poll_interval_secs, 60);
        assert_eq!(config.default_timezone, Tz::UTC);
    }

    #[test]
    fn lease_outlives_slowest_delivery() {
        // 3 attempts of 10s plus waits of 0.5s and 1s
        let config = config_from(&[]);
        assert_eq!(config.delivery_budget_secs(), 32);
        assert!(config.claim_lease_secs >= config.delivery_budget_secs());

        let config = config_from(&[
            ("NUDGE_DELIVERY_MAX_ATTEMPTS", "10"),
            ("NUDGE_DELIVERY_TIMEOUT_SECS", "60"),
            ("NUDGE_DELIVERY_BACKOFF_MILLIS", "500"),
            ("NUDGE_CLAIM_LEASE_SECS", "300"),
        ]);
        // 600s of attempts, waits 0.5+1+2+4+8+16+32+60+60 = 183.5s
        assert_eq!(config.delivery_budget_secs(), 784);
        assert_eq!(config.claim_lease_secs, 784 + 60);

        let config = config_from(&[
            ("NUDGE_DELIVERY_MAX_ATTEMPTS", "1000000"),
            ("NUDGE_DELIVERY_TIMEOUT_SECS", "99999999"),
            ("NUDGE_CLAIM_LEASE_SECS", "1"),
        ]);
        assert_eq!(config.delivery_max_attempts, 10);
        assert_eq!(config.delivery_timeout_secs, 300);
        assert!(config.claim_lease_secs > config.delivery_budget_secs());
    }

    #[test]
    fn backoff_is_capped() {
        assert_eq!(next_backoff(500), 1000);
        assert_eq!(next_backoff(40_000), MAX_DELIVERY_BACKOFF_MILLIS);
        assert_eq!(next_backoff(u64::MAX), MAX_DELIVERY_BACKOFF_MILLIS);
    }
}
