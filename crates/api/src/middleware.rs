use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request, State},
    http::{header, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dispatch_infrastructure::MetricsCollector;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter as GovernorLimiter};
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Shared state of the rate limiting middleware: one token bucket for the
/// whole API.
pub struct RateLimiter {
    limiter: DefaultDirectRateLimiter,
    metrics: Arc<MetricsCollector>,
}

impl RateLimiter {
    /// Refills `rps` tokens per second. A zero `burst` falls back to `rps`
    /// as the bucket capacity.
    pub fn new(rps: u32, burst: u32, metrics: Arc<MetricsCollector>) -> Self {
        let rate = NonZeroU32::new(rps.max(1)).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(burst).unwrap_or(rate);
        Self {
            limiter: GovernorLimiter::direct(Quota::per_second(rate).allow_burst(burst)),
            metrics,
        }
    }

    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    if limiter.try_acquire() {
        return next.run(request).await;
    }

    limiter.metrics.record_rate_limited(request.uri().path());

    (
        StatusCode::TOO_MANY_REQUESTS,
        [(header::RETRY_AFTER, "1")],
        Json(json!({ "error": "rate limit exceeded" })),
    )
        .into_response()
}

pub async fn request_logging(
    State(metrics): State<Arc<MetricsCollector>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    // Route templates keep the path label bounded.
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());
    let start = Instant::now();

    let response = next.run(request).await;
    let status = response.status();

    info!(
        method = %method,
        uri = %uri,
        status = status.as_u16(),
        latency_ms = start.elapsed().as_millis() as u64,
        "request handled"
    );
    metrics.record_http_request(method.as_str(), &path, status.as_u16());

    response
}

pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::HEAD, Method::POST, Method::PUT])
        .allow_headers(Any)
}

pub fn trace_layer(
) -> TraceLayer<tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>>
{
    TraceLayer::new_for_http()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(rps: u32, burst: u32) -> RateLimiter {
        RateLimiter::new(rps, burst, Arc::new(MetricsCollector::new()))
    }

    #[test]
    fn test_allows_rps_requests_then_rejects() {
        let limiter = limiter(3, 0);

        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[test]
    fn test_burst_overrides_capacity() {
        let limiter = limiter(1, 4);

        for _ in 0..4 {
            assert!(limiter.try_acquire());
        }
        assert!(!limiter.try_acquire());
    }
}
