use tokio::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open { resume_at: Instant },
}

/// Pauses probing for a flat cool-down after a failed call.
///
/// There is no half-open state: once the cool-down has elapsed the next
/// probe simply runs.
pub struct FailureBreaker {
    cooldown: Duration,
    state: BreakerState,
}

impl FailureBreaker {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            state: BreakerState::Closed,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> BreakerState {
        self.state
    }

    pub fn resume_at(&self) -> Option<Instant> {
        match self.state {
            BreakerState::Open { resume_at } => Some(resume_at),
            BreakerState::Closed => None,
        }
    }

    /// Returns whether a probe may run at `now`, closing the breaker if its
    /// cool-down has elapsed.
    pub fn allows_probe(&mut self, now: Instant) -> bool {
        match self.state {
            BreakerState::Closed => true,
            BreakerState::Open { resume_at } if now >= resume_at => {
                self.state = BreakerState::Closed;
                true
            }
            BreakerState::Open { .. } => false,
        }
    }

    /// Records a failed call. Returns `true` only on the Closed→Open
    /// transition so callers can log once per streak.
    pub fn record_failure(&mut self, now: Instant) -> bool {
        match self.state {
            BreakerState::Closed => {
                self.state = BreakerState::Open {
                    resume_at: now + self.cooldown,
                };
                true
            }
            BreakerState::Open { .. } => false,
        }
    }

    pub fn reset(&mut self) {
        self.state = BreakerState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COOLDOWN: Duration = Duration::from_secs(5);

    #[test]
    fn test_opens_on_first_failure_only() {
        let t0 = Instant::now();
        let mut breaker = FailureBreaker::new(COOLDOWN);

        assert!(breaker.record_failure(t0));
        assert!(!breaker.record_failure(t0 + Duration::from_millis(10)));
        assert_eq!(breaker.resume_at(), Some(t0 + COOLDOWN));
    }

    #[test]
    fn test_never_closes_before_cooldown() {
        let t0 = Instant::now();
        let mut breaker = FailureBreaker::new(COOLDOWN);
        breaker.record_failure(t0);

        assert!(!breaker.allows_probe(t0));
        assert!(!breaker.allows_probe(t0 + COOLDOWN - Duration::from_millis(1)));
        assert!(matches!(breaker.state(), BreakerState::Open { .. }));

        assert!(breaker.allows_probe(t0 + COOLDOWN));
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[test]
    fn test_new_streak_after_recovery_opens_again() {
        let t0 = Instant::now();
        let mut breaker = FailureBreaker::new(COOLDOWN);
        breaker.record_failure(t0);
        assert!(breaker.allows_probe(t0 + COOLDOWN));

        let t1 = t0 + COOLDOWN + Duration::from_millis(250);
        assert!(breaker.record_failure(t1));
        assert_eq!(breaker.resume_at(), Some(t1 + COOLDOWN));
    }

    #[test]
    fn test_reset_closes_immediately() {
        let t0 = Instant::now();
        let mut breaker = FailureBreaker::new(COOLDOWN);
        breaker.record_failure(t0);
        breaker.reset();
        assert!(breaker.allows_probe(t0));
    }
}
