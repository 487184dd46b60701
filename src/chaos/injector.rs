//! Simulated latency and failure.

use std::time::Duration;

use rand::Rng;

use crate::config::FaultConfig;

/// Draw a delay in `[0, max_latency_ms]`, or 0 when latency is disabled.
pub fn draw_delay<R: Rng>(rng: &mut R, max_latency_ms: u64) -> u64 {
    if max_latency_ms == 0 {
        return 0;
    }
    rng.gen_range(0..=max_latency_ms)
}

/// Roll `[1, 100]` and fail when the roll is at most `error_percent`.
pub fn draw_failure<R: Rng>(rng: &mut R, error_percent: u8) -> bool {
    rng.gen_range(1..=100u8) <= error_percent
}

/// Per-request fault gate driven by the process-wide [`FaultConfig`].
#[derive(Debug, Clone, Copy)]
pub struct FaultInjector {
    config: FaultConfig,
}

impl FaultInjector {
    pub fn new(config: FaultConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> FaultConfig {
        self.config
    }

    /// Suspend the current request for a random delay and return it in ms.
    pub async fn maybe_delay(&self) -> u64 {
        let delay_ms = draw_delay(&mut rand::thread_rng(), self.config.max_latency_ms);
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
        delay_ms
    }

    /// Decide whether this request ends with a simulated error.
    pub fn should_fail(&self) -> bool {
        draw_failure(&mut rand::thread_rng(), self.config.error_percent)
    }
}
