//! Process-wide token-bucket rate limiter shared by the generator workers.

use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::{sleep, Instant};

/// Token bucket with a mutable refill rate.
///
/// The bucket starts full. A rate of zero parks every waiter until the rate
/// is raised again; `set_rate` wakes sleepers so a new rate takes effect on
/// the next wait.
pub struct RateLimiter {
    state: Mutex<Bucket>,
    notify: Notify,
}

struct Bucket {
    rate: f64,
    burst: f64,
    tokens: f64,
    last_refill: Instant,
}

impl Bucket {
    fn refill(&mut self, now: Instant) {
        if self.rate > 0.0 {
            let elapsed = now.duration_since(self.last_refill).as_secs_f64();
            self.tokens = (self.tokens + elapsed * self.rate).min(self.burst);
        }
        self.last_refill = now;
    }
}

impl RateLimiter {
    pub fn new(rate: u32, burst: usize) -> Self {
        let burst = burst.max(1) as f64;
        Self {
            state: Mutex::new(Bucket {
                rate: rate as f64,
                burst,
                tokens: burst,
                last_refill: Instant::now(),
            }),
            notify: Notify::new(),
        }
    }

    /// Block until one token is available.
    ///
    /// Cancel-safe: dropping the future before completion consumes no token.
    pub async fn acquire(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);

            let wait = {
                let mut bucket = self.state.lock().unwrap();
                bucket.refill(Instant::now());
                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    return;
                }
                // Register for rate-change wakeups before releasing the lock
                // so a concurrent set_rate cannot slip between the check and
                // the await.
                notified.as_mut().enable();
                if bucket.rate > 0.0 {
                    Some(Duration::from_secs_f64((1.0 - bucket.tokens) / bucket.rate))
                } else {
                    None
                }
            };

            match wait {
                Some(deficit) => {
                    tokio::select! {
                        _ = sleep(deficit) => {}
                        _ = &mut notified => {}
                    }
                }
                None => notified.await,
            }
        }
    }

    /// Change the refill rate; takes effect on the next token wait.
    pub fn set_rate(&self, rate: u32) {
        {
            let mut bucket = self.state.lock().unwrap();
            bucket.refill(Instant::now());
            bucket.rate = rate as f64;
        }
        self.notify.notify_waiters();
    }

    pub fn rate(&self) -> u32 {
        self.state.lock().unwrap().rate as u32
    }
}
