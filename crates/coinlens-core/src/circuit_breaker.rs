use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::info;

/// Externally visible circuit state, reported through source health.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive retryable failures that open the circuit.
    pub trip_after: u32,
    /// How long an open circuit refuses calls before letting a trial call through.
    pub cool_down: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            trip_after: 3,
            cool_down: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Closed { failures: u32 },
    Open { since: Instant, failures: u32 },
    Probing { failures: u32 },
}

impl Phase {
    const fn failures(self) -> u32 {
        match self {
            Self::Closed { failures } | Self::Open { failures, .. } | Self::Probing { failures } => {
                failures
            }
        }
    }
}

/// Guards the upstream calls of one adapter.
///
/// After `trip_after` consecutive failures the circuit opens and calls are
/// refused for `cool_down`. The first call after that is a trial call: success
/// closes the circuit, failure opens it again.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: &'static str,
    config: CircuitBreakerConfig,
    phase: Mutex<Phase>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new("coingecko", CircuitBreakerConfig::default())
    }
}

impl CircuitBreaker {
    pub fn new(name: &'static str, config: CircuitBreakerConfig) -> Self {
        Self {
            name,
            config,
            phase: Mutex::new(Phase::Closed { failures: 0 }),
        }
    }

    fn phase(&self) -> MutexGuard<'_, Phase> {
        // Phase is Copy and written in one assignment; a poisoned lock still holds a valid value.
        self.phase
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Whether the next upstream call may go out. Moves an open circuit whose
    /// cool-down has elapsed into the probing state.
    pub fn allow_request(&self) -> bool {
        let mut phase = self.phase();
        let Phase::Open { since, failures } = *phase else {
            return true;
        };
        if since.elapsed() < self.config.cool_down {
            return false;
        }

        info!(circuit = self.name, "cool-down elapsed, trying upstream again");
        *phase = Phase::Probing { failures };
        true
    }

    pub fn record_success(&self) {
        let mut phase = self.phase();
        if !matches!(*phase, Phase::Closed { .. }) {
            info!(circuit = self.name, "upstream recovered, circuit closed");
        }
        *phase = Phase::Closed { failures: 0 };
    }

    pub fn record_failure(&self) {
        let mut phase = self.phase();
        let failures = phase.failures().saturating_add(1);

        *phase = match *phase {
            Phase::Probing { .. } => Phase::Open {
                since: Instant::now(),
                failures,
            },
            Phase::Closed { .. } if failures >= self.config.trip_after => {
                info!(circuit = self.name, failures, "circuit opened");
                Phase::Open {
                    since: Instant::now(),
                    failures,
                }
            }
            Phase::Closed { .. } => Phase::Closed { failures },
            // Calls already in flight when the circuit opened.
            Phase::Open { since, .. } => Phase::Open { since, failures },
        };
    }

    pub fn state(&self) -> CircuitState {
        match *self.phase() {
            Phase::Closed { .. } => CircuitState::Closed,
            Phase::Open { .. } => CircuitState::Open,
            Phase::Probing { .. } => CircuitState::HalfOpen,
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.phase().failures()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(trip_after: u32, cool_down: Duration) -> CircuitBreaker {
        CircuitBreaker::new(
            "test",
            CircuitBreakerConfig {
                trip_after,
                cool_down,
            },
        )
    }

    #[test]
    fn stays_closed_below_threshold_then_refuses_calls() {
        let breaker = breaker(2, Duration::from_secs(60));

        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert!(breaker.allow_request());

        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert_eq!(breaker.consecutive_failures(), 2);
        assert!(!breaker.allow_request());
    }

    #[test]
    fn success_resets_the_failure_streak() {
        let breaker = breaker(2, Duration::from_secs(60));

        breaker.record_failure();
        breaker.record_success();
        breaker.record_failure();

        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.consecutive_failures(), 1);
    }

    #[test]
    fn trial_call_outcome_decides_between_open_and_closed() {
        let breaker = breaker(1, Duration::from_millis(1));

        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(5));
        assert!(breaker.allow_request());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);

        std::thread::sleep(Duration::from_millis(5));
        assert!(breaker.allow_request());
        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.consecutive_failures(), 0);
    }
}
