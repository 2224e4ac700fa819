use crate::config::NodeConfig;
use crate::error::Result;
use log::debug;
use std::thread;
use std::time::Duration;

const MAX_BACKOFF_SHIFT: u32 = 6;

/// Bounded retry with exponential backoff for outbound calls.
/// Only transient failures (dial/IO) are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no waiting
    pub fn once() -> RetryPolicy {
        RetryPolicy {
            attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    pub fn from_config(config: &NodeConfig) -> RetryPolicy {
        RetryPolicy {
            attempts: config.retry_attempts.max(1),
            base_delay: config.retry_backoff(),
            max_delay: config.retry_backoff() * (1 << MAX_BACKOFF_SHIFT),
        }
    }

    /// Delay before retry number `attempt` (0-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(MAX_BACKOFF_SHIFT);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    pub fn run<T>(&self, what: &str, mut op: impl FnMut() -> Result<T>) -> Result<T> {
        let mut attempt = 0;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt + 1 < self.attempts => {
                    let delay = self.delay_for(attempt);
                    debug!(
                        "{what} failed (attempt {}/{}): {e}; retrying in {delay:?}",
                        attempt + 1,
                        self.attempts
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
