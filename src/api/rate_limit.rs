// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

//! Per-client request budget for the `/api` routes.

use anyhow::{anyhow, Result};
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use governor::{
    clock::{Clock, DefaultClock},
    middleware::StateInformationMiddleware,
    state::keyed::DefaultKeyedStateStore,
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::RateLimitConfig;
use crate::error::AppError;

const LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Forget idle clients once this many are tracked
const RETAIN_THRESHOLD: usize = 10_000;

type KeyedLimiter =
    RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock, StateInformationMiddleware>;

/// Outcome of one request against a client's budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Milliseconds since the epoch at which the budget is full again
    pub reset_ms: i64,
}

pub struct RateLimit {
    limiter: KeyedLimiter,
    clock: DefaultClock,
    limit: u32,
    period: Duration,
}

impl RateLimit {
    /// Allow `requests` per `window` for each client, replenished evenly across the window
    pub fn new(requests: u32, window: Duration) -> Result<Self> {
        let burst = NonZeroU32::new(requests)
            .ok_or_else(|| anyhow!("rate limit must allow at least one request"))?;
        let period = window / requests;
        let quota = Quota::with_period(period)
            .ok_or_else(|| anyhow!("rate limit window is too short"))?
            .allow_burst(burst);
        let limiter = RateLimiter::keyed(quota).with_middleware::<StateInformationMiddleware>();
        Ok(Self {
            limiter,
            clock: DefaultClock::default(),
            limit: requests,
            period,
        })
    }

    pub fn from_config(config: &RateLimitConfig) -> Result<Self> {
        Self::new(config.requests, Duration::from_secs(config.window_secs))
    }

    pub fn check(&self, client: &str) -> Decision {
        if self.limiter.len() > RETAIN_THRESHOLD {
            self.limiter.retain_recent();
        }

        let key = client.to_string();
        match self.limiter.check_key(&key) {
            Ok(snapshot) => {
                let remaining = snapshot.remaining_burst_capacity();
                let refill = self.period * (self.limit - remaining);
                Decision {
                    allowed: true,
                    limit: self.limit,
                    remaining,
                    reset_ms: reset_at(refill),
                }
            }
            Err(not_until) => {
                let wait = not_until.wait_time_from(self.clock.now());
                Decision {
                    allowed: false,
                    limit: self.limit,
                    remaining: 0,
                    reset_ms: reset_at(wait),
                }
            }
        }
    }
}

fn reset_at(after: Duration) -> i64 {
    let after_ms = i64::try_from(after.as_millis()).unwrap_or(i64::MAX);
    Utc::now().timestamp_millis().saturating_add(after_ms)
}

/// First `x-forwarded-for` entry, or loopback when absent
pub fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .unwrap_or("127.0.0.1")
        .to_string()
}

fn apply_headers(headers: &mut HeaderMap, decision: &Decision) {
    headers.insert(LIMIT, HeaderValue::from(decision.limit));
    headers.insert(REMAINING, HeaderValue::from(decision.remaining));
    headers.insert(RESET, HeaderValue::from(decision.reset_ms));
}

pub async fn rate_limit(State(limiter): State<Arc<RateLimit>>, request: Request, next: Next) -> Response {
    let client = client_ip(request.headers());
    let decision = limiter.check(&client);

    if !decision.allowed {
        warn!("Rate limit exceeded for {} on {}", client, request.uri().path());
        let mut response = AppError::TooManyRequests.into_response();
        let retry_secs = (decision.reset_ms - Utc::now().timestamp_millis()).max(0) / 1000 + 1;
        apply_headers(response.headers_mut(), &decision);
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(retry_secs));
        return response;
    }

    debug!("{} has {} requests left", client, decision.remaining);
    let mut response = next.run(request).await;
    apply_headers(response.headers_mut(), &decision);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budgets_are_per_client() {
        let limiter = RateLimit::new(2, Duration::from_secs(60)).unwrap();

        let first = limiter.check("10.0.0.1");
        assert!(first.allowed);
        assert_eq!(first.limit, 2);
        assert_eq!(first.remaining, 1);
        assert_eq!(limiter.check("10.0.0.1").remaining, 0);

        let limited = limiter.check("10.0.0.1");
        assert!(!limited.allowed);
        assert!(limited.reset_ms > Utc::now().timestamp_millis());

        assert!(limiter.check("10.0.0.2").allowed);
    }

    #[test]
    fn zero_requests_is_rejected() {
        assert!(RateLimit::new(0, Duration::from_secs(10)).is_err());
    }

    #[test]
    fn client_ip_prefers_the_first_forwarded_address() {
        let mut headers = HeaderMap::new();
        assert_eq!(client_ip(&headers), "127.0.0.1");

        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        assert_eq!(client_ip(&headers), "203.0.113.7");
    }
}
