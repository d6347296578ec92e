//! Retry policies for flaky public endpoints.
//!
//! Each public service the compilers talk to gets a preset tuned to how it
//! misbehaves: Horizons wants a few slow exponential retries, MediaWiki wikis
//! rate-limit aggressively and need jittered backoff, the NASA archives just
//! need a linear pause.

use std::time::Duration;

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// `base * 2^retry`
    Exponential { base: Duration },
    /// `step * (retry + 1)`
    Linear { step: Duration },
}

/// Retry configuration for one source.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Always at least 1.
    pub attempts: u32,
    pub backoff: Backoff,
    /// Upper bound on a single delay (jitter included)
    pub max_delay: Option<Duration>,
    /// Uniform random extra delay in `[0, jitter)`
    pub jitter: Duration,
}

impl RetryPolicy {
    /// JPL Horizons: 5 attempts, 2 s doubling.
    pub fn horizons() -> Self {
        Self {
            attempts: 5,
            backoff: Backoff::Exponential {
                base: Duration::from_secs(2),
            },
            max_delay: None,
            jitter: Duration::ZERO,
        }
    }

    /// NASA Exoplanet Archive TAP: 5 attempts, 2 s linear.
    pub fn archive() -> Self {
        Self {
            attempts: 5,
            backoff: Backoff::Linear {
                step: Duration::from_secs(2),
            },
            max_delay: None,
            jitter: Duration::ZERO,
        }
    }

    /// ESA Gaia TAP: 4 attempts, 2 s linear.
    pub fn gaia() -> Self {
        Self {
            attempts: 4,
            ..Self::archive()
        }
    }

    /// JPL SBDB and NASA Open Data: 6 attempts, 2 s linear capped at 30 s.
    pub fn sbdb() -> Self {
        Self {
            attempts: 6,
            max_delay: Some(Duration::from_secs(30)),
            ..Self::archive()
        }
    }

    /// Fandom MediaWiki: 6 attempts, 1 s doubling plus up to 2 s jitter, capped at 60 s.
    pub fn mediawiki() -> Self {
        Self {
            attempts: 6,
            backoff: Backoff::Exponential {
                base: Duration::from_secs(1),
            },
            max_delay: Some(Duration::from_secs(60)),
            jitter: Duration::from_secs(2),
        }
    }

    /// `attempts` tries with no pause; used by tests.
    pub fn immediate(attempts: u32) -> Self {
        Self {
            attempts,
            backoff: Backoff::Linear {
                step: Duration::ZERO,
            },
            max_delay: None,
            jitter: Duration::ZERO,
        }
    }

    /// Same policy with a different attempt count.
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    /// Attempts, never less than one.
    pub fn total_attempts(&self) -> u32 {
        self.attempts.max(1)
    }

    /// Deterministic part of the delay before retry number `retry` (0-based).
    pub fn base_delay(&self, retry: u32) -> Duration {
        self.cap(self.raw_delay(retry))
    }

    /// Delay before retry number `retry`, jitter included.
    pub fn delay(&self, retry: u32) -> Duration {
        let base = self.raw_delay(retry);
        let jitter = if self.jitter.is_zero() {
            Duration::ZERO
        } else {
            self.jitter.mul_f64(rand::random::<f64>())
        };
        self.cap(base.saturating_add(jitter))
    }

    fn raw_delay(&self, retry: u32) -> Duration {
        match self.backoff {
            Backoff::Exponential { base } => {
                base.saturating_mul(2u32.saturating_pow(retry.min(31)))
            }
            Backoff::Linear { step } => step.saturating_mul(retry.saturating_add(1)),
        }
    }

    fn cap(&self, delay: Duration) -> Duration {
        match self.max_delay {
            Some(max) => delay.min(max),
            None => delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::archive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizons_delays_double() {
        let policy = RetryPolicy::horizons();
        assert_eq!(policy.delay(0), Duration::from_secs(2));
        assert_eq!(policy.delay(1), Duration::from_secs(4));
        assert_eq!(policy.delay(3), Duration::from_secs(16));
    }

    #[test]
    fn test_sbdb_linear_delay_is_capped() {
        let policy = RetryPolicy::sbdb();
        assert_eq!(policy.delay(0), Duration::from_secs(2));
        assert_eq!(policy.delay(4), Duration::from_secs(10));
        assert_eq!(policy.delay(20), Duration::from_secs(30));
    }

    #[test]
    fn test_mediawiki_jitter_stays_in_bounds() {
        let policy = RetryPolicy::mediawiki();
        for retry in 0..8 {
            let delay = policy.delay(retry);
            let base = policy.base_delay(retry);
            assert!(delay >= base);
            assert!(delay <= Duration::from_secs(60));
            assert!(delay < base + Duration::from_secs(2) || delay == Duration::from_secs(60));
        }
    }

    #[test]
    fn test_immediate_never_sleeps() {
        let policy = RetryPolicy::immediate(3);
        assert_eq!(policy.delay(0), Duration::ZERO);
        assert_eq!(policy.delay(10), Duration::ZERO);
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        assert_eq!(RetryPolicy::immediate(0).total_attempts(), 1);
    }
}
