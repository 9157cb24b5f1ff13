// Request pacing for providers with a hard QPS quota.
//
// Enforces a minimum interval between consecutive requests from one
// provider instance. Callers that arrive too early sleep until their slot
// opens; nothing is queued and nothing runs in the background.

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

#[derive(Clone)]
pub struct RateLimiter {
    state: Arc<Mutex<Option<Instant>>>,
    interval: Duration,
}

impl RateLimiter {
    /// Allow at most `requests_per_second` requests per second.
    pub fn new(requests_per_second: f64) -> Self {
        Self {
            state: Arc::new(Mutex::new(None)),
            interval: Duration::from_secs_f64(1.0 / requests_per_second),
        }
    }

    /// Wait for the next slot.
    ///
    /// The slot is reserved under the lock before sleeping, so concurrent
    /// callers line up one interval apart instead of waking together.
    pub async fn acquire(&self) {
        let wait = {
            let mut last = self.state.lock().await;
            let now = Instant::now();
            let slot = match *last {
                Some(prev) if prev + self.interval > now => prev + self.interval,
                _ => now,
            };
            *last = Some(slot);
            slot.saturating_duration_since(now)
        };

        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }
}
