//! Retry delay policy for the queued senders

use std::time::Duration;

/// Shortest delay between two attempts at the same buffer
pub const RETRY_FLOOR: Duration = Duration::from_millis(250);

/// How retry delays grow across consecutive failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Delay after the first failure
    pub initial: Duration,
    /// Upper bound for the delay
    pub max: Duration,
    /// Growth factor per consecutive failure (1 holds the delay constant)
    pub multiplier: u32,
}

impl BackoffPolicy {
    /// Constant delay
    pub const fn fixed(delay: Duration) -> Self {
        Self {
            initial: delay,
            max: delay,
            multiplier: 1,
        }
    }

    /// Delay doubling from `initial` up to `max`
    pub const fn exponential(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            multiplier: 2,
        }
    }

    /// Clamp the policy so `initial >= RETRY_FLOOR`, `max >= initial`, `multiplier >= 1`
    #[must_use]
    pub fn normalized(self) -> Self {
        let initial = self.initial.max(RETRY_FLOOR);
        Self {
            initial,
            max: self.max.max(initial),
            multiplier: self.multiplier.max(1),
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::fixed(RETRY_FLOOR)
    }
}

/// Backoff state of one sender
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: BackoffPolicy,
    current: Option<Duration>,
}

impl Backoff {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            policy: policy.normalized(),
            current: None,
        }
    }

    /// Delay to wait after another failure
    pub fn next_delay(&mut self) -> Duration {
        let delay = match self.current {
            None => self.policy.initial,
            Some(previous) => previous
                .saturating_mul(self.policy.multiplier)
                .min(self.policy.max),
        };
        self.current = Some(delay);
        delay
    }

    /// Forget the failure streak after a successful attempt
    pub fn reset(&mut self) {
        self.current = None;
    }

    pub fn policy(&self) -> BackoffPolicy {
        self.policy
    }
}
