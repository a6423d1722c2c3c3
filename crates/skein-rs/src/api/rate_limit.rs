//! Minimum-interval rate limiting for API calls.
//!
//! A per-minute budget is turned into a minimum spacing between requests:
//! 60 requests/minute means one slot per second. [`RateLimiter::acquire`]
//! reserves the next slot and sleeps until it opens; callers that must not
//! block use [`RateLimiter::try_acquire`].

use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

/// Spaces requests at least one interval apart.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// A limiter allowing `limit` requests per minute. A zero limit is
    /// treated as one request per minute.
    pub fn per_minute(limit: u32) -> Self {
        let limit = limit.max(1);
        Self::with_interval(Duration::from_secs_f64(60.0 / f64::from(limit)))
    }

    /// A limiter with an explicit minimum spacing between requests.
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }

    /// The minimum spacing between requests.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Reserve the next slot and return how long to wait for it. The lock
    /// is held only for the slot arithmetic, never across the wait.
    fn reserve(&self) -> Duration {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        match *last {
            Some(prev) => {
                let next = prev + self.interval;
                if next > now {
                    *last = Some(next);
                    next - now
                } else {
                    *last = Some(now);
                    Duration::ZERO
                }
            }
            None => {
                *last = Some(now);
                Duration::ZERO
            }
        }
    }

    /// Wait for the next request slot.
    pub async fn acquire(&self) {
        let wait = self.reserve();
        if !wait.is_zero() {
            debug!("rate limit: waiting {:.2}s for next slot", wait.as_secs_f64());
            tokio::time::sleep(wait).await;
        }
    }

    /// Take a slot only if one is open right now.
    pub fn try_acquire(&self) -> bool {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        match *last {
            Some(prev) if now < prev + self.interval => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_minute_sets_interval() {
        assert_eq!(RateLimiter::per_minute(60).interval(), Duration::from_secs(1));
        assert_eq!(
            RateLimiter::per_minute(120).interval(),
            Duration::from_millis(500)
        );
        // Zero is clamped rather than dividing by zero.
        assert_eq!(RateLimiter::per_minute(0).interval(), Duration::from_secs(60));
    }

    #[test]
    fn first_slot_is_free() {
        let limiter = RateLimiter::per_minute(60);
        assert_eq!(limiter.reserve(), Duration::ZERO);
    }

    #[test]
    fn back_to_back_reservations_are_spaced() {
        let limiter = RateLimiter::with_interval(Duration::from_secs(10));
        assert_eq!(limiter.reserve(), Duration::ZERO);

        let wait = limiter.reserve();
        assert!(wait > Duration::from_secs(9));
        assert!(wait <= Duration::from_secs(10));

        // A third reservation queues behind the second slot.
        let wait = limiter.reserve();
        assert!(wait > Duration::from_secs(19));
    }

    #[test]
    fn try_acquire_refuses_while_slot_is_taken() {
        let limiter = RateLimiter::with_interval(Duration::from_secs(60));
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[tokio::test]
    async fn acquire_waits_out_the_interval() {
        let limiter = RateLimiter::with_interval(Duration::from_millis(30));
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(30));
    }
}
