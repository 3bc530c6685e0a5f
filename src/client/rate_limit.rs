use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

/// Upper bound on a single wait between availability checks.
const MAX_POLL: Duration = Duration::from_millis(100);

/// Token bucket governing outbound request rate.
///
/// Refill is lazy: tokens accrue proportional to elapsed time at each
/// `acquire`, capped at capacity. No background timer.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    refill_rate_per_second: f64,
    state: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    pub fn new(capacity: f64, refill_rate_per_second: f64) -> Self {
        assert!(
            capacity > 0.0 && refill_rate_per_second > 0.0,
            "token bucket requires positive capacity and refill rate"
        );
        Self {
            capacity,
            refill_rate_per_second,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Block until `n` tokens are available, then deduct them.
    ///
    /// Refill and deduct happen as one locked step so concurrent acquirers
    /// cannot double-spend fractional tokens.
    pub async fn acquire(&self, n: u32) {
        let need = n as f64;
        debug_assert!(
            need <= self.capacity,
            "requested {need} tokens from a bucket of capacity {}",
            self.capacity
        );
        loop {
            let shortfall = {
                let mut s = self.state.lock().expect("bucket lock poisoned");
                let now = Instant::now();
                let elapsed = now.duration_since(s.last_refill).as_secs_f64();
                s.tokens = (s.tokens + elapsed * self.refill_rate_per_second).min(self.capacity);
                s.last_refill = now;
                if s.tokens >= need {
                    s.tokens -= need;
                    return;
                }
                need - s.tokens
            };
            let wait = Duration::from_secs_f64(shortfall / self.refill_rate_per_second);
            tokio::time::sleep(wait.min(MAX_POLL)).await;
        }
    }

    #[cfg(test)]
    fn tokens(&self) -> f64 {
        self.state.lock().unwrap().tokens
    }
}
