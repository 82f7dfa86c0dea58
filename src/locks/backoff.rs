//! Bounded exponential backoff between contended lock attempts.

use std::time::Duration;

/// Initial delay and cap of an exponential backoff sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub max: Duration,
}

impl BackoffPolicy {
    /// Contention on local files: 10ms doubling up to 100ms.
    pub const LOCAL: Self = Self {
        initial: Duration::from_millis(10),
        max: Duration::from_millis(100),
    };

    /// Contention on network-backed files: 10ms doubling up to 30s.
    pub const NETWORK: Self = Self {
        initial: Duration::from_millis(10),
        max: Duration::from_secs(30),
    };

    pub fn new(initial: Duration, max: Duration) -> Self {
        Self { initial, max }
    }

    /// Start a fresh delay sequence.
    pub fn delays(&self) -> Backoff {
        Backoff {
            next: self.initial,
            max: self.max,
        }
    }
}

/// An in-progress delay sequence.
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    max: Duration,
}

impl Backoff {
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next.min(self.max);
        self.next = self.next.saturating_mul(2).min(self.max);
        delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_policy_doubles_then_caps() {
        let mut delays = BackoffPolicy::LOCAL.delays();
        let seen: Vec<u128> = (0..6).map(|_| delays.next_delay().as_millis()).collect();
        assert_eq!(seen, vec![10, 20, 40, 80, 100, 100]);
    }

    #[test]
    fn network_policy_caps_at_thirty_seconds() {
        let mut delays = BackoffPolicy::NETWORK.delays();
        let last = (0..20).map(|_| delays.next_delay()).last().unwrap();
        assert_eq!(last, Duration::from_secs(30));
    }

    #[test]
    fn initial_above_max_is_clamped() {
        let mut delays =
            BackoffPolicy::new(Duration::from_millis(500), Duration::from_millis(50)).delays();
        assert_eq!(delays.next_delay(), Duration::from_millis(50));
        assert_eq!(delays.next_delay(), Duration::from_millis(50));
    }
}
