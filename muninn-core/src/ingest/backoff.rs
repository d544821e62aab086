//! Capped exponential backoff for socket-error retries.
//!
//! The receive loop never exits on a transient error; it sleeps through this
//! schedule and tries again, resetting after the first clean read. Jitter
//! keeps a fleet of restarted ingestors from hammering in lockstep.

use rand::Rng;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct BackoffConfig {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    /// Randomization factor, 0.0 to 1.0.
    pub jitter_factor: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_secs(1),
            multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

/// Unbounded retry schedule with a delay ceiling.
pub struct RetryBackoff {
    config: BackoffConfig,
    current_delay: Duration,
    attempts: u64,
}

impl RetryBackoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self { current_delay: config.initial_delay, config, attempts: 0 }
    }

    /// Next delay to sleep, advancing the schedule.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.jittered(self.current_delay);
        self.attempts += 1;
        self.current_delay = std::cmp::min(
            Duration::from_secs_f64(self.current_delay.as_secs_f64() * self.config.multiplier),
            self.config.max_delay,
        );
        delay
    }

    /// Back to the initial delay after a successful operation.
    pub fn reset(&mut self) {
        self.current_delay = self.config.initial_delay;
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if self.config.jitter_factor == 0.0 {
            return delay;
        }
        let jitter = rand::thread_rng().gen::<f64>() * self.config.jitter_factor;
        let multiplier = 1.0 + (jitter - self.config.jitter_factor / 2.0);
        Duration::from_secs_f64(delay.as_secs_f64() * multiplier)
    }
}

impl Default for RetryBackoff {
    fn default() -> Self {
        Self::new(BackoffConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_grow_and_cap() {
        let mut backoff = RetryBackoff::new(BackoffConfig {
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(80),
            multiplier: 2.0,
            jitter_factor: 0.0,
        });
        assert_eq!(backoff.next_delay(), Duration::from_millis(10));
        assert_eq!(backoff.next_delay(), Duration::from_millis(20));
        assert_eq!(backoff.next_delay(), Duration::from_millis(40));
        assert_eq!(backoff.next_delay(), Duration::from_millis(80));
        assert_eq!(backoff.next_delay(), Duration::from_millis(80));
        assert_eq!(backoff.attempts(), 5);
    }

    #[test]
    fn reset_returns_to_initial() {
        let mut backoff = RetryBackoff::new(BackoffConfig {
            jitter_factor: 0.0,
            ..Default::default()
        });
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_millis(10));
    }

    #[test]
    fn jitter_stays_within_band() {
        let mut backoff = RetryBackoff::new(BackoffConfig {
            initial_delay: Duration::from_millis(100),
            jitter_factor: 0.2,
            ..Default::default()
        });
        for _ in 0..50 {
            let d = backoff.jittered(Duration::from_millis(100));
            let ms = d.as_secs_f64() * 1000.0;
            assert!((90.0..=110.0).contains(&ms), "delay {}ms outside jitter band", ms);
        }
    }
}
