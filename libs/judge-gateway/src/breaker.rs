/// Circuit Breaker - fail fast while the judge is down
///
/// **States:**
/// - `Closed`: every call is admitted, failures are counted inside a sliding window
/// - `Open`: every call is rejected until the cooldown has elapsed
/// - `HalfOpen`: one trial call is in flight; its outcome closes or re-opens
///
/// There is no timer. The Open -> HalfOpen transition happens lazily inside
/// `admit()`, so the breaker does nothing between calls.
///
/// One instance is shared by every caller in the process. All transitions go
/// through a single mutex so concurrent failures cannot lose updates, and an
/// open breaker always knows when it opened.

use crate::error::GatewayError;
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerConfig {
    /// Consecutive failures that open the breaker
    pub failure_threshold: u32,
    /// Failures further apart than this do not accumulate
    pub failure_window: Duration,
    /// How long the breaker stays open before a trial call is allowed
    pub cooldown: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            failure_window: Duration::from_millis(60_000),
            cooldown: Duration::from_millis(30_000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CircuitState {
    Closed {
        failures: u32,
        last_failure: Option<Instant>,
    },
    Open {
        since: Instant,
    },
    HalfOpen {
        trial_started: Instant,
    },
}

impl CircuitState {
    fn closed() -> Self {
        CircuitState::Closed {
            failures: 0,
            last_failure: None,
        }
    }
}

/// Externally visible breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BreakerSnapshot {
    pub state: BreakerState,
    pub consecutive_failures: u32,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    config: BreakerConfig,
    state: Mutex<CircuitState>,
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            state: Mutex::new(CircuitState::closed()),
        }
    }

    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, CircuitState> {
        // State is always left consistent, so a poisoned lock is still usable
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Ask permission for one outbound call.
    ///
    /// Fails with `GatewayError::Unavailable` while open. Once the cooldown
    /// has elapsed exactly one trial call is let through.
    pub fn admit(&self) -> Result<(), GatewayError> {
        let now = Instant::now();
        let cooldown = self.config.cooldown;
        let mut state = self.lock();
        let current = *state;

        match current {
            CircuitState::Closed { .. } => Ok(()),
            CircuitState::Open { since } => {
                let elapsed = now.duration_since(since);
                if elapsed < cooldown {
                    return Err(GatewayError::Unavailable {
                        retry_after: cooldown - elapsed,
                    });
                }
                *state = CircuitState::HalfOpen { trial_started: now };
                info!(open_ms = elapsed.as_millis() as u64, "Circuit breaker half-open, admitting trial call");
                Ok(())
            }
            CircuitState::HalfOpen { trial_started } => {
                let elapsed = now.duration_since(trial_started);
                if elapsed < cooldown {
                    return Err(GatewayError::Unavailable {
                        retry_after: cooldown - elapsed,
                    });
                }
                // Trial call never reported back; allow another one
                *state = CircuitState::HalfOpen { trial_started: now };
                warn!("Half-open trial outcome never recorded, admitting another");
                Ok(())
            }
        }
    }

    /// Fully closes the breaker. Idempotent.
    pub fn record_success(&self) {
        let mut state = self.lock();
        if !matches!(*state, CircuitState::Closed { .. }) {
            info!("Circuit breaker closed, judge recovered");
        }
        *state = CircuitState::closed();
    }

    pub fn record_failure(&self) {
        let now = Instant::now();
        let threshold = self.config.failure_threshold;
        let mut state = self.lock();
        let current = *state;

        *state = match current {
            CircuitState::Closed {
                failures,
                last_failure,
            } => {
                let streak = match last_failure {
                    Some(last) if now.duration_since(last) > self.config.failure_window => 0,
                    _ => failures,
                };
                let failures = streak + 1;

                if failures >= threshold {
                    warn!(failures, cooldown_ms = self.config.cooldown.as_millis() as u64, "Circuit breaker opened");
                    CircuitState::Open { since: now }
                } else {
                    CircuitState::Closed {
                        failures,
                        last_failure: Some(now),
                    }
                }
            }
            CircuitState::HalfOpen { .. } => {
                warn!("Half-open trial call failed, circuit breaker re-opened");
                CircuitState::Open { since: now }
            }
            CircuitState::Open { .. } => CircuitState::Open { since: now },
        };
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let threshold = self.config.failure_threshold;
        match *self.lock() {
            CircuitState::Closed { failures, .. } => BreakerSnapshot {
                state: BreakerState::Closed,
                consecutive_failures: failures,
            },
            CircuitState::Open { .. } => BreakerSnapshot {
                state: BreakerState::Open,
                consecutive_failures: threshold,
            },
            // One more failure re-opens
            CircuitState::HalfOpen { .. } => BreakerSnapshot {
                state: BreakerState::HalfOpen,
                consecutive_failures: threshold.saturating_sub(1),
            },
        }
    }

    pub fn is_open(&self) -> bool {
        self.snapshot().state == BreakerState::Open
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(BreakerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    fn trip(breaker: &CircuitBreaker) {
        for _ in 0..breaker.config().failure_threshold {
            breaker.admit().unwrap();
            breaker.record_failure();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_opens_after_threshold_failures() {
        let breaker = CircuitBreaker::default();

        for n in 1..5 {
            breaker.admit().unwrap();
            breaker.record_failure();
            assert_eq!(breaker.snapshot().consecutive_failures, n);
            assert_eq!(breaker.snapshot().state, BreakerState::Closed);
        }

        breaker.admit().unwrap();
        breaker.record_failure();

        let err = breaker.admit().unwrap_err();
        assert!(err.is_unavailable());
        assert!(breaker.is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_reports_remaining_cooldown() {
        let breaker = CircuitBreaker::default();
        trip(&breaker);

        advance(Duration::from_secs(10)).await;

        match breaker.admit() {
            Err(GatewayError::Unavailable { retry_after }) => {
                assert_eq!(retry_after, Duration::from_secs(20));
            }
            other => panic!("expected Unavailable, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_outside_window_restarts_streak() {
        let breaker = CircuitBreaker::default();

        for _ in 0..4 {
            breaker.record_failure();
        }
        assert_eq!(breaker.snapshot().consecutive_failures, 4);

        advance(Duration::from_millis(60_001)).await;
        breaker.record_failure();

        assert_eq!(breaker.snapshot().consecutive_failures, 1);
        assert!(breaker.admit().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_within_window_accumulate() {
        let breaker = CircuitBreaker::default();

        for _ in 0..5 {
            breaker.record_failure();
            advance(Duration::from_secs(59)).await;
        }

        assert!(breaker.is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_counter() {
        let breaker = CircuitBreaker::default();
        for _ in 0..4 {
            breaker.record_failure();
        }
        breaker.record_success();
        breaker.record_success();

        assert_eq!(breaker.snapshot().consecutive_failures, 0);
        breaker.record_failure();
        assert_eq!(breaker.snapshot().consecutive_failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_admits_single_trial_call() {
        let breaker = CircuitBreaker::default();
        trip(&breaker);

        advance(Duration::from_secs(30)).await;

        assert!(breaker.admit().is_ok());
        assert_eq!(breaker.snapshot().state, BreakerState::HalfOpen);
        assert_eq!(breaker.snapshot().consecutive_failures, 4);
        assert!(breaker.admit().unwrap_err().is_unavailable());
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_success_closes() {
        let breaker = CircuitBreaker::default();
        trip(&breaker);

        advance(Duration::from_secs(31)).await;
        breaker.admit().unwrap();
        breaker.record_success();

        let snapshot = breaker.snapshot();
        assert_eq!(snapshot.state, BreakerState::Closed);
        assert_eq!(snapshot.consecutive_failures, 0);
        assert!(breaker.admit().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_failure_reopens_immediately() {
        let breaker = CircuitBreaker::default();
        trip(&breaker);

        advance(Duration::from_secs(31)).await;
        breaker.admit().unwrap();
        breaker.record_failure();

        assert!(breaker.is_open());
        assert!(breaker.admit().unwrap_err().is_unavailable());

        // Cooldown restarts from the failed trial call
        advance(Duration::from_secs(29)).await;
        assert!(breaker.admit().is_err());
        advance(Duration::from_secs(1)).await;
        assert!(breaker.admit().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_lost_trial_call_is_replaced_after_cooldown() {
        let breaker = CircuitBreaker::default();
        trip(&breaker);

        advance(Duration::from_secs(30)).await;
        breaker.admit().unwrap();

        advance(Duration::from_secs(30)).await;
        assert!(breaker.admit().is_ok());
        assert_eq!(breaker.snapshot().state, BreakerState::HalfOpen);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_failures_never_leave_inconsistent_state() {
        let breaker = std::sync::Arc::new(CircuitBreaker::default());

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let breaker = breaker.clone();
                tokio::spawn(async move {
                    breaker.record_failure();
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let snapshot = breaker.snapshot();
        assert_eq!(snapshot.state, BreakerState::Open);
        assert_eq!(snapshot.consecutive_failures, 5);
    }
}
