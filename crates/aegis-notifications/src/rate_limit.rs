//! Per-channel token-bucket rate limiting.
//!
//! One `governor` limiter per key, built from a [`Quota`], keyed by
//! [`Channel`].

use aegis_config::ChannelRateLimit;
use aegis_types::{Channel, Error, Result};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorRateLimiter,
};
use nonzero_ext::nonzero;
use std::collections::HashMap;
use std::num::NonZeroU32;

type Limiter = GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// One token bucket per channel, built from the configured per-minute rate
/// and burst allowance.
pub struct ChannelRateLimiters {
    limiters: HashMap<&'static str, Limiter>,
    limits: HashMap<&'static str, ChannelRateLimit>,
}

impl ChannelRateLimiters {
    /// Build a limiter per entry in `limits_per_channel`.
    pub fn new(limits_per_channel: impl IntoIterator<Item = (Channel, ChannelRateLimit)>) -> Self {
        let mut limiters = HashMap::new();
        let mut limits = HashMap::new();
        for (channel, limit) in limits_per_channel {
            limits.insert(channel.as_str(), limit);
            limiters.insert(channel.as_str(), build_limiter(limit));
        }
        Self { limiters, limits }
    }

    /// Consume one token for `channel`. Disabled channels always succeed.
    /// An exhausted bucket returns [`Error::RateLimited`].
    pub fn check(&self, channel: Channel) -> Result<()> {
        let limit = self.limits.get(channel.as_str()).copied().unwrap_or_default();
        if !limit.enabled {
            return Ok(());
        }
        let Some(limiter) = self.limiters.get(channel.as_str()) else {
            return Ok(());
        };
        limiter.check().map_err(|_| Error::RateLimited {
            message: format!("rate limit exceeded for channel '{}'", channel.as_str()),
        })
    }
}

fn build_limiter(limit: ChannelRateLimit) -> Limiter {
    let per_minute = NonZeroU32::new(limit.requests_per_minute).unwrap_or(nonzero!(60u32));
    let burst = NonZeroU32::new(limit.burst).unwrap_or(nonzero!(10u32));
    let quota = Quota::per_minute(per_minute).allow_burst(burst);
    GovernorRateLimiter::direct(quota)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_then_exhaustion_then_disabled_channel_always_passes() {
        let limiters = ChannelRateLimiters::new([
            (
                Channel::Slack,
                ChannelRateLimit {
                    enabled: true,
                    requests_per_minute: 60,
                    burst: 2,
                },
            ),
            (
                Channel::Email,
                ChannelRateLimit {
                    enabled: false,
                    requests_per_minute: 1,
                    burst: 1,
                },
            ),
        ]);

        assert!(limiters.check(Channel::Slack).is_ok());
        assert!(limiters.check(Channel::Slack).is_ok());
        assert!(matches!(limiters.check(Channel::Slack), Err(Error::RateLimited { .. })));

        for _ in 0..10 {
            assert!(limiters.check(Channel::Email).is_ok());
        }
    }

    #[test]
    fn unconfigured_channel_is_unlimited() {
        let limiters = ChannelRateLimiters::new(std::iter::empty());
        for _ in 0..5 {
            assert!(limiters.check(Channel::Webhook).is_ok());
        }
    }
}
