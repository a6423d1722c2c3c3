//! API-call hygiene: rate limiting and retry with backoff.
//!
//! Both are wired into [`ChatClient`](crate::ChatClient) — every request
//! waits for a rate-limit slot, and transient failures are retried up to
//! the configured budget.

pub mod rate_limit;
pub mod retry;

// Re-export commonly used items at the module level.
pub use rate_limit::RateLimiter;
pub use retry::RetryConfig;
