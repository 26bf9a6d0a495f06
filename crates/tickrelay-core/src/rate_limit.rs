//! Token-bucket rate limiter for outbound source calls.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use tokio::sync::Notify;
use tokio::time::sleep;

/// Limiter configuration. `tokens_per_second` doubles as bucket capacity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimiterConfig {
    pub tokens_per_second: f64,
}

impl RateLimiterConfig {
    pub fn new(tokens_per_second: f64) -> Self {
        Self {
            tokens_per_second: tokens_per_second.max(f64::MIN_POSITIVE),
        }
    }
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl Bucket {
    /// Accrue tokens proportionally to elapsed time, capped at capacity.
    fn refill(&mut self, rate: f64, capacity: f64) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * rate).min(capacity);
        self.last_refill = now;
    }
}

/// Token bucket throttling one source's outbound request rate.
///
/// Each source instance owns its own bucket; buckets are never shared across
/// sources. [`RateLimiter::acquire`] is the only suspension point and it
/// suspends only the calling path, never the whole process.
#[derive(Debug)]
pub struct RateLimiter {
    rate: f64,
    capacity: f64,
    bucket: Mutex<Bucket>,
    reset_signal: Notify,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        let capacity = config.tokens_per_second;
        Self {
            rate: config.tokens_per_second,
            capacity,
            bucket: Mutex::new(Bucket {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
            reset_signal: Notify::new(),
        }
    }

    pub fn per_second(tokens_per_second: f64) -> Self {
        Self::new(RateLimiterConfig::new(tokens_per_second))
    }

    /// Acquire `n` tokens, suspending until the shortfall has accrued.
    ///
    /// The wait is computed exactly as `needed / tokens_per_second` seconds.
    /// A concurrent [`reset`](Self::reset) wakes pending waiters early.
    /// Requests larger than capacity are clamped to capacity, since they
    /// could never be satisfied otherwise.
    pub async fn acquire(&self, n: f64) {
        let need = n.clamp(0.0, self.capacity);

        loop {
            let wait = {
                let mut bucket = self
                    .bucket
                    .lock()
                    .expect("rate limiter bucket lock should not be poisoned");
                bucket.refill(self.rate, self.capacity);

                if bucket.tokens >= need {
                    bucket.tokens -= need;
                    return;
                }

                Duration::from_secs_f64((need - bucket.tokens) / self.rate)
            };

            tokio::select! {
                _ = sleep(wait) => {}
                _ = self.reset_signal.notified() => {}
            }
        }
    }

    /// Non-suspending probe: would `acquire(n)` return without waiting?
    /// Applies the same capacity clamp as `acquire`.
    pub fn is_ready(&self, n: f64) -> bool {
        let need = n.clamp(0.0, self.capacity);
        let mut bucket = self
            .bucket
            .lock()
            .expect("rate limiter bucket lock should not be poisoned");
        bucket.refill(self.rate, self.capacity);
        bucket.tokens >= need
    }

    /// Current token balance after refill.
    pub fn available(&self) -> f64 {
        let mut bucket = self
            .bucket
            .lock()
            .expect("rate limiter bucket lock should not be poisoned");
        bucket.refill(self.rate, self.capacity);
        bucket.tokens
    }

    /// Restore full capacity immediately and wake any pending waiters.
    pub fn reset(&self) {
        {
            let mut bucket = self
                .bucket
                .lock()
                .expect("rate limiter bucket lock should not be poisoned");
            bucket.tokens = self.capacity;
            bucket.last_refill = Instant::now();
        }
        self.reset_signal.notify_waiters();
    }

    pub const fn capacity(&self) -> f64 {
        self.capacity
    }
}
