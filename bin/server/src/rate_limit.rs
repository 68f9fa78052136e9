//! Per-IP rate limiting for the board API.
//!
//! Token bucket per client IP, with separate budgets for the read and
//! write surfaces. Denials answer with the standard error envelope and a
//! `Retry-After` header.
//!
//! Requests whose client IP cannot be determined are denied; proxy
//! headers are only honored when the server is configured to trust them.

use axum::{
    body::Body,
    http::{Request, Response, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::Value;
use soapbox::api::{ApiEnvelope, ErrorCode};
use std::collections::HashMap;
use std::future::Future;
use std::net::IpAddr;
use std::pin::Pin;
use std::sync::{Arc, RwLock};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tower::{Layer, Service};
use tracing::{debug, warn};

/// Budget of one bucket class.
#[derive(Clone, Copy, Debug)]
pub struct RateLimitConfig {
    /// Maximum requests per window, also the burst capacity.
    pub requests_per_window: u32,
    /// Time window the budget refills over.
    pub window_duration: Duration,
    /// How long an idle bucket survives before cleanup.
    pub cleanup_interval: Duration,
}

impl RateLimitConfig {
    /// Budget for read endpoints.
    pub fn reads() -> Self {
        Self {
            requests_per_window: 300,
            window_duration: Duration::from_secs(10),
            cleanup_interval: Duration::from_secs(300),
        }
    }

    /// Budget for write endpoints, deliberately much tighter.
    pub fn writes() -> Self {
        Self {
            requests_per_window: 30,
            window_duration: Duration::from_secs(10),
            cleanup_interval: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone)]
struct TokenBucket {
    tokens: f64,
    last_replenish: Instant,
}

impl TokenBucket {
    fn new(max_tokens: u32) -> Self {
        Self {
            tokens: max_tokens as f64,
            last_replenish: Instant::now(),
        }
    }

    /// Replenishes by elapsed time, then tries to take one token.
    fn try_consume(&mut self, config: &RateLimitConfig) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_replenish);

        let replenish_rate =
            config.requests_per_window as f64 / config.window_duration.as_secs_f64();
        self.tokens = (self.tokens + elapsed.as_secs_f64() * replenish_rate)
            .min(config.requests_per_window as f64);
        self.last_replenish = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn is_stale(&self, cleanup_interval: Duration) -> bool {
        self.last_replenish.elapsed() > cleanup_interval
    }
}

#[derive(Debug)]
struct RateLimitState {
    buckets: HashMap<IpAddr, TokenBucket>,
    config: RateLimitConfig,
    last_cleanup: Instant,
}

impl RateLimitState {
    fn new(config: RateLimitConfig) -> Self {
        Self {
            buckets: HashMap::new(),
            config,
            last_cleanup: Instant::now(),
        }
    }

    fn check(&mut self, ip: IpAddr) -> bool {
        if self.last_cleanup.elapsed() > self.config.cleanup_interval {
            self.cleanup_stale();
        }

        let bucket = self
            .buckets
            .entry(ip)
            .or_insert_with(|| TokenBucket::new(self.config.requests_per_window));
        bucket.try_consume(&self.config)
    }

    fn cleanup_stale(&mut self) {
        let cleanup_interval = self.config.cleanup_interval;
        let before = self.buckets.len();
        self.buckets
            .retain(|_, bucket| !bucket.is_stale(cleanup_interval));
        let removed = before - self.buckets.len();
        if removed > 0 {
            debug!(removed, "dropped stale rate limit buckets");
        }
        self.last_cleanup = Instant::now();
    }
}

/// Layer installing per-IP rate limiting on a router.
#[derive(Clone)]
pub struct RateLimitLayer {
    state: Arc<RwLock<RateLimitState>>,
    trust_proxy_headers: bool,
}

impl RateLimitLayer {
    pub fn with_config(config: RateLimitConfig, trust_proxy_headers: bool) -> Self {
        Self {
            state: Arc::new(RwLock::new(RateLimitState::new(config))),
            trust_proxy_headers,
        }
    }

    /// A layer budgeted for the read surface.
    pub fn for_reads(trust_proxy_headers: bool) -> Self {
        Self::with_config(RateLimitConfig::reads(), trust_proxy_headers)
    }

    /// A layer budgeted for the write surface.
    pub fn for_writes(trust_proxy_headers: bool) -> Self {
        Self::with_config(RateLimitConfig::writes(), trust_proxy_headers)
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            state: self.state.clone(),
            trust_proxy_headers: self.trust_proxy_headers,
        }
    }
}

#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    state: Arc<RwLock<RateLimitState>>,
    trust_proxy_headers: bool,
}

impl<S> Service<Request<Body>> for RateLimitService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let client_ip = extract_client_ip(&req, self.trust_proxy_headers);

        // No identifiable client means no budget to draw from: deny.
        let allowed = match client_ip {
            Some(ip) => {
                let mut state = self.state.write().unwrap_or_else(|poisoned| {
                    warn!("rate limit state was poisoned, recovering");
                    poisoned.into_inner()
                });
                state.check(ip)
            }
            None => {
                warn!("could not determine client IP, denying request");
                false
            }
        };

        if !allowed {
            if let Some(ip) = client_ip {
                warn!(%ip, "rate limit exceeded");
            }
            let response = (
                StatusCode::TOO_MANY_REQUESTS,
                [("Retry-After", "10")],
                Json(ApiEnvelope::<Value>::failure(
                    ErrorCode::RateLimited,
                    "too many requests, slow down",
                )),
            )
                .into_response();
            return Box::pin(async move { Ok(response) });
        }

        Box::pin(self.inner.call(req))
    }
}

/// Determines which IP a request counts against.
///
/// `X-Forwarded-For` (first hop) and `X-Real-IP` are consulted only when
/// proxy headers are trusted; otherwise only the socket address counts,
/// which requires the router to be served with connect info.
fn extract_client_ip<B>(req: &Request<B>, trust_proxy_headers: bool) -> Option<IpAddr> {
    if trust_proxy_headers {
        if let Some(forwarded) = req.headers().get("x-forwarded-for") {
            if let Ok(forwarded_str) = forwarded.to_str() {
                if let Some(first) = forwarded_str.split(',').next() {
                    if let Ok(ip) = first.trim().parse::<IpAddr>() {
                        return Some(ip);
                    }
                }
            }
        }
        if let Some(real_ip) = req.headers().get("x-real-ip") {
            if let Ok(real_ip_str) = real_ip.to_str() {
                if let Ok(ip) = real_ip_str.trim().parse::<IpAddr>() {
                    return Some(ip);
                }
            }
        }
    }

    req.extensions()
        .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
        .map(|ci| ci.0.ip())
}
