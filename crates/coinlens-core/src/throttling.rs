//! Client-side rate budget and retry backoff for upstream calls.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

/// Exponential retry delays, capped, for a bounded number of retries.
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    pub first_delay: Duration,
    pub max_delay: Duration,
    pub factor: f64,
    pub max_retries: u32,
}

impl Backoff {
    /// Sum of every delay in the schedule.
    pub fn total_delay(&self) -> Duration {
        (0..self.max_retries).filter_map(|retry| self.delay_for(retry)).sum()
    }

    /// Delay before retry number `retry` (zero-based); `None` once the retry
    /// budget is spent.
    pub fn delay_for(&self, retry: u32) -> Option<Duration> {
        if retry >= self.max_retries {
            return None;
        }
        let scaled = self.first_delay.as_secs_f64() * self.factor.powf(f64::from(retry));
        Some(Duration::from_secs_f64(
            scaled.min(self.max_delay.as_secs_f64()).max(0.0),
        ))
    }
}

/// How many calls a provider accepts per window, and how to back off.
#[derive(Debug, Clone, PartialEq)]
pub struct RatePolicy {
    pub calls: u32,
    pub per: Duration,
    pub backoff: Backoff,
}

impl RatePolicy {
    /// CoinGecko public demo tier: 30 calls a minute. Retries wait 250ms,
    /// 500ms, then 1s, so the whole schedule fits in a few-second request
    /// budget.
    pub fn coingecko_demo() -> Self {
        Self {
            calls: 30,
            per: Duration::from_secs(60),
            backoff: Backoff {
                first_delay: Duration::from_millis(250),
                max_delay: Duration::from_secs(1),
                factor: 2.0,
                max_retries: 3,
            },
        }
    }

    /// Time for one spent call to come back into the budget.
    fn replenish_interval(&self) -> Duration {
        self.per / self.calls.max(1)
    }

    fn quota(&self) -> Quota {
        let calls = NonZeroU32::new(self.calls).unwrap_or(NonZeroU32::MIN);
        Quota::with_period(self.replenish_interval())
            .unwrap_or_else(|| Quota::per_second(calls))
            .allow_burst(calls)
    }
}

impl Default for RatePolicy {
    fn default() -> Self {
        Self::coingecko_demo()
    }
}

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Shared budget for one adapter; clones draw from the same budget.
#[derive(Clone)]
pub struct Throttle {
    limiter: Arc<DirectLimiter>,
    replenish: Duration,
    backoff: Backoff,
}

impl std::fmt::Debug for Throttle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Throttle")
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

impl Throttle {
    pub fn new(policy: &RatePolicy) -> Self {
        Self {
            limiter: Arc::new(RateLimiter::direct(policy.quota())),
            replenish: policy.replenish_interval(),
            backoff: policy.backoff.clone(),
        }
    }

    /// Spends one call from the budget. When none is left, returns the
    /// longest it can take for one to free up.
    pub fn try_acquire(&self) -> Result<(), Duration> {
        self.limiter.check().map_err(|_| self.replenish)
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }
}
