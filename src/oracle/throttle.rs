//! Request throttling wrapper around governor.
//!
//! Caps the rate of outgoing oracle requests. Callers wait for a permit;
//! nothing is ever rejected.

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use tracing::{debug, instrument};

/// Direct rate limiter shared by all in-flight oracle calls.
pub struct RequestThrottle {
    limiter: DefaultDirectRateLimiter,
    requests_per_second: u32,
}

impl RequestThrottle {
    /// Create a throttle allowing `requests_per_second` permits per second.
    /// A zero rate is treated as one request per second.
    pub fn new(requests_per_second: u32) -> Self {
        let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: RateLimiter::direct(Quota::per_second(rate)),
            requests_per_second: rate.get(),
        }
    }

    /// Wait until a request may be sent.
    #[instrument(skip(self))]
    pub async fn acquire(&self) {
        if self.limiter.check().is_ok() {
            return;
        }
        debug!("Rate limit reached ({} req/s), waiting for permit", self.requests_per_second);
        self.limiter.until_ready().await;
    }
}
