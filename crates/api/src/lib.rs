//! # Dispatch API
//!
//! HTTP surface of the courier dispatch service, built on axum.
//!
//! ## Endpoints
//!
//! - `GET /ping`, `GET|HEAD /healthcheck`, `GET /health`
//! - `GET /metrics` (path configurable) when the exporter is installed
//! - `GET /couriers`, `GET /courier/{id}`, `POST /courier`, `PUT /courier`
//! - `POST /delivery/assign`, `POST /delivery/unassign`, `POST /delivery/complete`
//!
//! Errors are returned as `{"error": "..."}` with the status chosen by
//! [`error::ApiError`].
//!
//! ## Middleware
//!
//! Every request passes through tracing, optional CORS, request logging
//! (which also feeds the HTTP metrics) and, when `api.rate_limit_rps` is
//! non-zero, a governor token bucket that answers 429 with `Retry-After: 1`.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;

use axum::Router;
use std::sync::Arc;
use tower::ServiceBuilder;

use dispatch_config::models::ApiConfig;
use middleware::{cors_layer, rate_limit, request_logging, trace_layer, RateLimiter};

pub use error::{ApiError, ApiResult};
pub use routes::{create_routes, AppState};

/// Build the router with the full middleware stack.
pub fn create_app(state: AppState, config: &ApiConfig, metrics_endpoint: Option<&str>) -> Router {
    let metrics = state.metrics.clone();
    let mut app = create_routes(state, metrics_endpoint);

    if config.rate_limit_rps > 0 {
        let limiter = Arc::new(RateLimiter::new(
            config.rate_limit_rps,
            config.rate_limit_burst,
            metrics.clone(),
        ));
        app = app.layer(axum::middleware::from_fn_with_state(limiter, rate_limit));
    }

    if config.cors_enabled {
        app = app.layer(cors_layer());
    }

    app.layer(
        ServiceBuilder::new()
            .layer(trace_layer())
            .layer(axum::middleware::from_fn_with_state(metrics, request_logging)),
    )
}
