//! Uniform random delay policy applied between interaction steps.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::trace;

/// Delay drawn uniformly from `[min_ms, max_ms]`.
///
/// A zero policy (`PacingPolicy::none()`) never sleeps, which is what tests use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacingPolicy {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self::between_ms(1_000, 3_000)
    }
}

impl PacingPolicy {
    pub const fn none() -> Self {
        Self {
            min_ms: 0,
            max_ms: 0,
        }
    }

    pub const fn between_ms(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    pub fn between_secs(min: f64, max: f64) -> Self {
        Self::between_ms(secs_to_ms(min), secs_to_ms(max))
    }

    /// Multiply both bounds by `factor`; negative or non-finite factors disable pacing.
    pub fn scaled(self, factor: f64) -> Self {
        if !factor.is_finite() || factor <= 0.0 {
            return Self::none();
        }
        Self {
            min_ms: (self.min_ms as f64 * factor).round() as u64,
            max_ms: (self.max_ms as f64 * factor).round() as u64,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.min_ms <= self.max_ms
    }

    pub fn is_zero(&self) -> bool {
        self.max_ms == 0
    }

    /// Draw one delay. An inverted range collapses to `min_ms`.
    pub fn sample(&self) -> Duration {
        if self.max_ms <= self.min_ms {
            return Duration::from_millis(self.min_ms);
        }
        let ms = rand::thread_rng().gen_range(self.min_ms..=self.max_ms);
        Duration::from_millis(ms)
    }

    /// Sleep for one sampled delay.
    pub async fn pause(&self) {
        let delay = self.sample();
        if delay.is_zero() {
            return;
        }
        trace!(delay_ms = delay.as_millis() as u64, "pacing pause");
        tokio::time::sleep(delay).await;
    }
}

fn secs_to_ms(secs: f64) -> u64 {
    if secs.is_finite() && secs > 0.0 {
        (secs * 1000.0).round() as u64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_stay_in_range() {
        let policy = PacingPolicy::between_secs(0.5, 1.0);
        assert_eq!(policy, PacingPolicy::between_ms(500, 1_000));
        for _ in 0..200 {
            let d = policy.sample();
            assert!(d >= Duration::from_millis(500) && d <= Duration::from_millis(1_000));
        }
    }

    #[test]
    fn scaling() {
        let policy = PacingPolicy::between_ms(1_000, 3_000);
        assert_eq!(policy.scaled(0.5), PacingPolicy::between_ms(500, 1_500));
        assert!(policy.scaled(0.0).is_zero());
        assert!(policy.scaled(f64::NAN).is_zero());
    }

    #[test]
    fn inverted_range_is_invalid_but_safe() {
        let policy = PacingPolicy::between_ms(900, 100);
        assert!(!policy.is_valid());
        assert_eq!(policy.sample(), Duration::from_millis(900));
    }

    #[test]
    fn deserializes_from_yaml() {
        let policy: PacingPolicy = serde_yaml::from_str("min_ms: 2000\nmax_ms: 4000\n").unwrap();
        assert_eq!(policy, PacingPolicy::between_ms(2_000, 4_000));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_policy_does_not_sleep() {
        let start = tokio::time::Instant::now();
        PacingPolicy::none().pause().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
