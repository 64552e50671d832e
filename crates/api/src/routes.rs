use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use dispatch_core::traits::{CourierRepository, DeliveryDispatcher};
use dispatch_infrastructure::MetricsCollector;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::handlers::{
    couriers::{create_courier, get_courier, list_couriers, update_courier},
    delivery::{assign_delivery, complete_delivery, unassign_delivery},
    health::{health_check, healthcheck, ping},
    metrics::prometheus_metrics,
};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub couriers: Arc<dyn CourierRepository>,
    pub dispatcher: Arc<dyn DeliveryDispatcher>,
    pub metrics: Arc<MetricsCollector>,
    pub prometheus: Option<PrometheusHandle>,
}

/// `metrics_endpoint` mounts the Prometheus exposition when set.
pub fn create_routes(state: AppState, metrics_endpoint: Option<&str>) -> Router {
    let mut router = Router::new()
        .route("/ping", get(ping))
        .route("/healthcheck", get(healthcheck).head(healthcheck))
        .route("/health", get(health_check))
        .route("/couriers", get(list_couriers))
        .route("/courier", post(create_courier).put(update_courier))
        .route("/courier/{id}", get(get_courier))
        .route("/delivery/assign", post(assign_delivery))
        .route("/delivery/unassign", post(unassign_delivery))
        .route("/delivery/complete", post(complete_delivery));

    if let Some(path) = metrics_endpoint {
        router = router.route(path, get(prometheus_metrics));
    }

    router.with_state(state)
}
