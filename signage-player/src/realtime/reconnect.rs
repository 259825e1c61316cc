use std::time::Duration;

/// How long to wait before the next realtime connection attempt.
///
/// The first `max_attempts` consecutive failures back off geometrically from
/// `base_delay` (capped at `max_delay`); after that the client settles on
/// `fallback_delay` until a connection succeeds.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
    pub fallback_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(1000),
            multiplier: 1.5,
            max_delay: Duration::from_millis(10_000),
            fallback_delay: Duration::from_millis(30_000),
        }
    }
}

impl ReconnectPolicy {
    /// Delay after the `failures`-th consecutive failure (0-based).
    pub fn delay_for(&self, failures: u32) -> Duration {
        if failures >= self.max_attempts {
            return self.fallback_delay;
        }
        let factor = self.multiplier.powi(failures as i32);
        let millis = (self.base_delay.as_millis() as f64 * factor).floor();
        let capped = millis.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }

    pub fn backoff(&self) -> Backoff<'_> {
        Backoff {
            policy: self,
            failures: 0,
        }
    }
}

/// Running failure counter for one client.
#[derive(Debug)]
pub struct Backoff<'a> {
    policy: &'a ReconnectPolicy,
    failures: u32,
}

impl Backoff<'_> {
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.policy.delay_for(self.failures);
        self.failures = self.failures.saturating_add(1);
        delay
    }

    pub fn reset(&mut self) {
        self.failures = 0;
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schedule() {
        let policy = ReconnectPolicy::default();
        let mut backoff = policy.backoff();
        let delays: Vec<u64> = (0..7)
            .map(|_| backoff.next_delay().as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![1000, 1500, 2250, 3375, 5062, 30_000, 30_000]);
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = ReconnectPolicy {
            max_attempts: 10,
            multiplier: 3.0,
            ..ReconnectPolicy::default()
        };
        assert_eq!(policy.delay_for(2), Duration::from_millis(9000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(10_000));
        assert_eq!(policy.delay_for(9), Duration::from_millis(10_000));
        assert_eq!(policy.delay_for(10), Duration::from_millis(30_000));
    }

    #[test]
    fn test_reset_restarts_schedule() {
        let policy = ReconnectPolicy::default();
        let mut backoff = policy.backoff();
        for _ in 0..6 {
            backoff.next_delay();
        }
        assert_eq!(backoff.failures(), 6);
        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_millis(1000));
    }
}
