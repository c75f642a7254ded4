//! Per-request pacing for a transport.
//!
//! The scheduler only spaces out batches. When a target also throttles on
//! request rate, wrap the transport so `ready` waits for a governor permit.
//! The executor awaits `ready` before starting the request timeout.

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;

use crate::error::{DiscoveryError, Result, TransportResult};
use crate::traits::transport::{Transport, TransportRequest, TransportResponse};

/// Transport that holds each request until the quota allows it.
pub struct RateLimitedTransport<T: Transport> {
    inner: T,
    limiter: DefaultDirectRateLimiter,
}

impl<T: Transport> RateLimitedTransport<T> {
    /// `requests_per_second` permits per second, bursting up to the same number.
    pub fn new(inner: T, requests_per_second: u32) -> Result<Self> {
        let Some(rate) = NonZeroU32::new(requests_per_second) else {
            return Err(DiscoveryError::RateLimit {
                reason: "requests_per_second must be at least 1".to_string(),
            });
        };
        Ok(Self::with_quota(inner, Quota::per_second(rate)))
    }

    pub fn with_quota(inner: T, quota: Quota) -> Self {
        Self {
            inner,
            limiter: RateLimiter::direct(quota),
        }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

#[async_trait]
impl<T: Transport> Transport for RateLimitedTransport<T> {
    async fn ready(&self) {
        self.limiter.until_ready().await;
        self.inner.ready().await
    }

    async fn send(&self, request: TransportRequest<'_>) -> TransportResult<TransportResponse> {
        self.inner.send(request).await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// `transport.rate_limited(rps)` shorthand.
pub trait TransportExt: Transport + Sized {
    fn rate_limited(self, requests_per_second: u32) -> Result<RateLimitedTransport<Self>> {
        RateLimitedTransport::new(self, requests_per_second)
    }
}

impl<T: Transport> TransportExt for T {}
