//! Request middleware: trace propagation, bearer auth, per-IP rate
//! limiting, and HTTP metrics
//!
//! Execution order on protected routes is metrics -> trace -> rate limit ->
//! auth -> handler. The exposition and Swagger routes bypass the stack.

use crate::adapter::error_response;
use crate::state::AppState;
use axum::Json;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};
use ragline_common::TraceId;
use ragline_config::RateLimitConfig;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

const TRACE_HEADER: &str = "X-Trace-Id";

/// Per-IP token-bucket limiter backed by governor's keyed state
pub struct IpRateLimiter {
    limiter: RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>,
}

impl IpRateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let one = NonZeroU32::MIN;
        let per_second = NonZeroU32::new(config.per_second).unwrap_or(one);
        let burst = NonZeroU32::new(config.burst).unwrap_or(one);
        Self {
            limiter: RateLimiter::keyed(Quota::per_second(per_second).allow_burst(burst)),
        }
    }

    pub fn allow(&self, ip: &str) -> bool {
        self.limiter.check_key(&ip.to_owned()).is_ok()
    }
}

/// Honor an incoming `X-Trace-Id` or mint one, stash it in extensions, and
/// echo it on the response.
pub async fn inject_trace(mut request: Request, next: Next) -> Response {
    let incoming = request
        .headers()
        .get(TRACE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let trace_id = TraceId::from(incoming);
    request.extensions_mut().insert(trace_id.clone());

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(trace_id.as_str()) {
        response.headers_mut().insert(TRACE_HEADER, value);
    }
    response
}

/// Constant-time bearer token check.
pub async fn authenticate(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if state.config.auth.allow_anonymous {
        return next.run(request).await;
    }

    let header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    if !valid_bearer_token(header, &state.config.auth.token) {
        warn!("rejected request with invalid bearer token");
        return (
            StatusCode::UNAUTHORIZED,
            Json(error_response("", "Unauthorized", 401)),
        )
            .into_response();
    }
    next.run(request).await
}

fn valid_bearer_token(header: Option<&str>, expected: &str) -> bool {
    let Some(header) = header else {
        return false;
    };
    let Some(candidate) = header.strip_prefix("Bearer ") else {
        return false;
    };
    candidate.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Per-IP rate limit; disabled unless configured on.
pub async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if !state.config.rate_limit.enabled {
        return next.run(request).await;
    }

    let ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "unknown".to_owned(), |info| info.0.ip().to_string());
    if !state.limiter.allow(&ip) {
        warn!(ip, "rate limit exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(error_response("", "Rate limit exceeded", 429)),
        )
            .into_response();
    }
    debug!(ip, "rate limit check passed");
    next.run(request).await
}

/// Count every request by path and final status.
pub async fn track_http_metrics(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    let response = next.run(request).await;
    metrics::counter!(
        "http_requests_total",
        "path" => path,
        "status" => response.status().as_u16().to_string()
    )
    .increment(1);
    response
}

#[cfg(test)]
mod tests {
    use super::{IpRateLimiter, valid_bearer_token};
    use ragline_config::RateLimitConfig;

    #[test]
    fn bearer_token_requires_exact_match() {
        assert!(valid_bearer_token(Some("Bearer secret"), "secret"));
        assert!(!valid_bearer_token(Some("Bearer wrong"), "secret"));
        assert!(!valid_bearer_token(Some("secret"), "secret"));
        assert!(!valid_bearer_token(None, "secret"));
    }

    #[test]
    fn limiter_throttles_a_single_ip_but_not_others() {
        let limiter = IpRateLimiter::new(&RateLimitConfig {
            enabled: true,
            per_second: 1,
            burst: 2,
        });
        assert!(limiter.allow("10.0.0.1"));
        assert!(limiter.allow("10.0.0.1"));
        assert!(!limiter.allow("10.0.0.1"), "burst exhausted");
        assert!(limiter.allow("10.0.0.2"), "other clients unaffected");
    }
}
