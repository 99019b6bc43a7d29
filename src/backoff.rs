use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;

/// Capped exponential backoff for the live feed reconnect loop. Attempts
/// are unbounded; the feed keeps retrying until shutdown. A small random
/// jitter keeps multiple clients from reconnecting in lockstep.
#[derive(Debug)]
pub struct ExponentialBackoff {
    base_delay: Duration,
    max_delay: Duration,
    current_attempt: u32,
}

impl ExponentialBackoff {
    pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            base_delay,
            max_delay,
            current_attempt: 0,
        }
    }

    /// Delay for the upcoming attempt, before jitter.
    pub fn current_delay(&self) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(self.current_attempt));
        exp.min(self.max_delay)
    }

    pub async fn sleep(&mut self) {
        let delay = self.current_delay();
        let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..250));

        log::warn!(
            "⏳ Reconnect attempt {} in {:.1}s",
            self.current_attempt + 1,
            delay.as_secs_f64()
        );

        sleep(delay + jitter).await;
        self.current_attempt = self.current_attempt.saturating_add(1);
    }

    pub fn reset(&mut self) {
        self.current_attempt = 0;
    }
}
