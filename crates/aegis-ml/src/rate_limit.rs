//! Process-wide token-bucket rate limiting for prediction requests.
//!
//! Grounded on `aegis-notifications::rate_limit::ChannelRateLimiters`:
//! one `governor` limiter built from a [`Quota`]. The inference engine
//! has a single global bucket rather than one per key, since predictions
//! are rate limited per process, not per model.

use aegis_config::InferenceConfig;
use aegis_types::{Error, Result};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorRateLimiter,
};
use nonzero_ext::nonzero;
use std::num::NonZeroU32;

type Limiter = GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// A single process-wide token bucket, built from `rate_limit_rps`/
/// `rate_limit_burst`. A configured rate of `0` disables limiting.
pub struct PredictionRateLimiter {
    limiter: Option<Limiter>,
}

impl PredictionRateLimiter {
    /// Build the limiter from engine configuration.
    pub fn new(config: &InferenceConfig) -> Self {
        let limiter = NonZeroU32::new(config.rate_limit_rps).map(|rps| {
            let burst = NonZeroU32::new(config.rate_limit_burst).unwrap_or(nonzero!(1u32));
            GovernorRateLimiter::direct(Quota::per_second(rps).allow_burst(burst))
        });
        Self { limiter }
    }

    /// Consume one token. An exhausted bucket returns
    /// [`Error::RateLimited`].
    pub fn check(&self) -> Result<()> {
        let Some(limiter) = &self.limiter else {
            return Ok(());
        };
        limiter.check().map_err(|_| Error::RateLimited {
            message: "prediction rate limit exceeded".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_then_exhaustion() {
        let limiter = PredictionRateLimiter::new(&InferenceConfig {
            rate_limit_rps: 1,
            rate_limit_burst: 2,
            ..InferenceConfig::default()
        });
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_ok());
        assert!(matches!(limiter.check(), Err(Error::RateLimited { .. })));
    }

    #[test]
    fn zero_rate_disables_limiting() {
        let limiter = PredictionRateLimiter::new(&InferenceConfig {
            rate_limit_rps: 0,
            ..InferenceConfig::default()
        });
        for _ in 0..100 {
            assert!(limiter.check().is_ok());
        }
    }
}
