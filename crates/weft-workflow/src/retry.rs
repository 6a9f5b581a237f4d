use std::time::Duration;

use rand::Rng;

/// Retry behavior for a step.
///
/// `max_attempts` is the total attempt cap: `max_attempts = 3` means the step
/// runs at most three times, and a step that succeeds on the last attempt
/// records `retries = 2`. A step without a retry policy gets one attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
  pub max_attempts: u32,
  /// Base delay between attempts.
  pub delay: Duration,
  pub backoff: Backoff,
  /// Cap applied to exponential delays.
  pub max_delay: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
  Fixed,
  Linear,
  Exponential,
  Random,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_attempts: 1,
      delay: Duration::from_secs(1),
      backoff: Backoff::Fixed,
      max_delay: None,
    }
  }
}

impl RetryPolicy {
  /// Delay to wait after the `attempt`-th failure (1-indexed) before the
  /// next attempt.
  pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
    let n = attempt.max(1);
    match self.backoff {
      Backoff::Fixed => self.delay,
      Backoff::Linear => self.delay.saturating_mul(n),
      Backoff::Exponential => {
        let factor = 1u32.checked_shl(n - 1).unwrap_or(u32::MAX);
        let delay = self.delay.saturating_mul(factor);
        match self.max_delay {
          Some(cap) if delay > cap => cap,
          _ => delay,
        }
      }
      Backoff::Random => {
        let base_ms = self.delay.as_millis() as u64;
        if base_ms == 0 {
          return self.delay;
        }
        let jitter = rand::thread_rng().gen_range(0..base_ms);
        self.delay + Duration::from_millis(jitter)
      }
    }
  }
}
