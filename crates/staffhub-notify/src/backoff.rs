//! Exponential backoff with jitter for delivery retries.

use std::time::Duration;

use rand::Rng;

use staffhub_core::config::notify::NotifyConfig;

/// Deterministic part of the retry delay: `base * 2^retry_count`, capped.
pub fn base_delay(retry_count: u32, config: &NotifyConfig) -> Duration {
    // Shift bound keeps the multiplication from overflowing long before
    // the cap would have kicked in anyway.
    let exp = retry_count.min(20);
    let seconds = config
        .backoff_base_seconds
        .saturating_mul(1u64 << exp)
        .min(config.backoff_cap_seconds);
    Duration::from_secs(seconds)
}

/// Retry delay with random jitter added, so a burst of failures does not
/// re-dispatch in lockstep.
pub fn delay_with_jitter(retry_count: u32, config: &NotifyConfig) -> Duration {
    let jitter_ms = if config.backoff_jitter_ms == 0 {
        0
    } else {
        rand::rng().random_range(0..=config.backoff_jitter_ms)
    };
    base_delay(retry_count, config) + Duration::from_millis(jitter_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> NotifyConfig {
        NotifyConfig {
            backoff_base_seconds: 5,
            backoff_cap_seconds: 300,
            backoff_jitter_ms: 0,
            ..NotifyConfig::default()
        }
    }

    #[test]
    fn test_delay_strictly_increases_until_cap() {
        let config = config();
        let mut previous = Duration::ZERO;
        for retry in 1..=6 {
            let delay = base_delay(retry, &config);
            assert!(
                delay > previous || delay == Duration::from_secs(config.backoff_cap_seconds),
                "delay for retry {retry} must grow until the cap"
            );
            previous = delay;
        }
    }

    #[test]
    fn test_delay_is_capped() {
        let config = config();
        assert_eq!(base_delay(10, &config), Duration::from_secs(300));
        assert_eq!(base_delay(32, &config), Duration::from_secs(300));
    }

    #[test]
    fn test_jitter_bounded() {
        let mut config = config();
        config.backoff_jitter_ms = 250;
        for retry in 1..=4 {
            let base = base_delay(retry, &config);
            let jittered = delay_with_jitter(retry, &config);
            assert!(jittered >= base);
            assert!(jittered <= base + Duration::from_millis(250));
        }
    }
}
