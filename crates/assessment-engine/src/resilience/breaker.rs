use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::clock::Clock;
use crate::lookup::LookupError;

/// Breaker thresholds. The failure rate is measured over the last
/// `window_size` calls once at least `minimum_calls` have been recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakerConfig {
    pub failure_rate_threshold: f64,
    pub window_size: usize,
    pub minimum_calls: usize,
    pub open_seconds: i64,
    pub half_open_probes: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_rate_threshold: 0.5,
            window_size: 10,
            minimum_calls: 5,
            open_seconds: 30,
            half_open_probes: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerStatus {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
enum State {
    Closed,
    Open { until: DateTime<Utc> },
    HalfOpen { admitted: u32, succeeded: u32 },
}

#[derive(Debug)]
struct Inner {
    state: State,
    outcomes: VecDeque<bool>,
}

/// Count-based circuit breaker guarding a lookup backend.
pub struct CircuitBreaker {
    name: &'static str,
    config: BreakerConfig,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(name: &'static str, config: BreakerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            name,
            config,
            clock,
            inner: Mutex::new(Inner {
                state: State::Closed,
                outcomes: VecDeque::new(),
            }),
        }
    }

    pub fn status(&self) -> BreakerStatus {
        let mut inner = self.lock();
        self.refresh(&mut inner);
        match inner.state {
            State::Closed => BreakerStatus::Closed,
            State::Open { .. } => BreakerStatus::Open,
            State::HalfOpen { .. } => BreakerStatus::HalfOpen,
        }
    }

    /// Whether a backend call may proceed now. Half-open admits a limited
    /// number of probe calls.
    pub fn try_acquire(&self) -> bool {
        let mut inner = self.lock();
        self.refresh(&mut inner);
        match &mut inner.state {
            State::Closed => true,
            State::Open { .. } => false,
            State::HalfOpen { admitted, .. } => {
                if *admitted < self.config.half_open_probes {
                    *admitted += 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut guard = self.lock();
        let inner = &mut *guard;
        match &mut inner.state {
            State::Closed => self.push_outcome(&mut inner.outcomes, true),
            State::HalfOpen { succeeded, .. } => {
                *succeeded += 1;
                if *succeeded >= self.config.half_open_probes {
                    info!(breaker = self.name, "probe calls succeeded; circuit closed");
                    inner.state = State::Closed;
                    inner.outcomes.clear();
                }
            }
            State::Open { .. } => {}
        }
    }

    pub fn record_failure(&self) {
        let mut guard = self.lock();
        let inner = &mut *guard;
        match inner.state {
            State::Closed => {
                self.push_outcome(&mut inner.outcomes, false);
                if self.failure_rate_exceeded(&inner.outcomes) {
                    warn!(
                        breaker = self.name,
                        open_seconds = self.config.open_seconds,
                        "failure rate threshold exceeded; circuit opened"
                    );
                    self.open(inner);
                }
            }
            State::HalfOpen { .. } => {
                warn!(breaker = self.name, "probe call failed; circuit reopened");
                self.open(inner);
            }
            State::Open { .. } => {}
        }
    }

    /// Runs `call` if admitted, recording its outcome.
    pub fn call<T>(
        &self,
        call: impl FnOnce() -> Result<T, LookupError>,
    ) -> Result<T, LookupError> {
        if !self.try_acquire() {
            return Err(LookupError::CircuitOpen(self.name));
        }
        match call() {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(error) => {
                self.record_failure();
                Err(error)
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn refresh(&self, inner: &mut Inner) {
        if let State::Open { until } = inner.state {
            if self.clock.now() >= until {
                info!(breaker = self.name, "cooldown elapsed; circuit half-open");
                inner.state = State::HalfOpen {
                    admitted: 0,
                    succeeded: 0,
                };
            }
        }
    }

    fn open(&self, inner: &mut Inner) {
        inner.state = State::Open {
            until: self.clock.now() + Duration::seconds(self.config.open_seconds),
        };
        inner.outcomes.clear();
    }

    fn push_outcome(&self, outcomes: &mut VecDeque<bool>, success: bool) {
        outcomes.push_back(success);
        while outcomes.len() > self.config.window_size.max(1) {
            outcomes.pop_front();
        }
    }

    fn failure_rate_exceeded(&self, outcomes: &VecDeque<bool>) -> bool {
        if outcomes.len() < self.config.minimum_calls.max(1) {
            return false;
        }
        let failures = outcomes.iter().filter(|success| !**success).count();
        failures as f64 / outcomes.len() as f64 >= self.config.failure_rate_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::clock::ManualClock;
    use chrono::TimeZone;

    fn breaker() -> (CircuitBreaker, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).single().expect("valid time"),
        ));
        let config = BreakerConfig {
            failure_rate_threshold: 0.5,
            window_size: 4,
            minimum_calls: 4,
            open_seconds: 30,
            half_open_probes: 2,
        };
        (CircuitBreaker::new("test", config, clock.clone()), clock)
    }

    #[test]
    fn stays_closed_below_minimum_calls() {
        let (breaker, _) = breaker();
        for _ in 0..3 {
            breaker.record_failure();
        }
        assert_eq!(breaker.status(), BreakerStatus::Closed);
    }

    #[test]
    fn opens_when_failure_rate_reaches_threshold() {
        let (breaker, _) = breaker();
        breaker.record_success();
        breaker.record_success();
        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.status(), BreakerStatus::Open);
        assert!(!breaker.try_acquire());
    }

    #[test]
    fn half_opens_after_cooldown_and_closes_on_successful_probes() {
        let (breaker, clock) = breaker();
        for _ in 0..4 {
            breaker.record_failure();
        }
        clock.advance(Duration::seconds(29));
        assert_eq!(breaker.status(), BreakerStatus::Open);
        clock.advance(Duration::seconds(1));
        assert_eq!(breaker.status(), BreakerStatus::HalfOpen);

        assert!(breaker.try_acquire());
        assert!(breaker.try_acquire());
        assert!(!breaker.try_acquire());
        breaker.record_success();
        breaker.record_success();
        assert_eq!(breaker.status(), BreakerStatus::Closed);
    }

    #[test]
    fn failed_probe_reopens() {
        let (breaker, clock) = breaker();
        for _ in 0..4 {
            breaker.record_failure();
        }
        clock.advance(Duration::seconds(30));
        assert!(breaker.try_acquire());
        breaker.record_failure();
        assert_eq!(breaker.status(), BreakerStatus::Open);
    }

    #[test]
    fn call_short_circuits_while_open() {
        let (breaker, _) = breaker();
        for _ in 0..4 {
            breaker.record_failure();
        }
        let mut invoked = false;
        let result: Result<(), LookupError> = breaker.call(|| {
            invoked = true;
            Ok(())
        });
        assert_eq!(result, Err(LookupError::CircuitOpen("test")));
        assert!(!invoked);
    }
}
