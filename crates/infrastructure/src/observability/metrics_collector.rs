//! Dispatch counters.
//!
//! Handles are resolved against whatever global recorder is installed when
//! the collector is built; with none installed every call is a no-op.

use dispatch_core::{traits::RetryRecorder, DispatchError, DispatchResult};
use metrics::{counter, gauge, histogram, Counter, Gauge, Histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::{info, warn};

pub struct MetricsCollector {
    assignments_total: Counter,
    assignment_failures_total: Counter,
    unassignments_total: Counter,
    completions_total: Counter,
    couriers_released_total: Counter,
    events_processed_total: Counter,
    events_failed_total: Counter,
    events_dropped_total: Counter,
    orders_polled_total: Counter,
    rate_limit_exceeded_total: Counter,
    active_deliveries: Gauge,
    assignment_duration: Histogram,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            assignments_total: counter!("courier_assignments_total"),
            assignment_failures_total: counter!("courier_assignment_failures_total"),
            unassignments_total: counter!("courier_unassignments_total"),
            completions_total: counter!("courier_completions_total"),
            couriers_released_total: counter!("courier_released_total"),
            events_processed_total: counter!("courier_order_events_processed_total"),
            events_failed_total: counter!("courier_order_events_failed_total"),
            events_dropped_total: counter!("courier_order_events_dropped_total"),
            orders_polled_total: counter!("courier_orders_polled_total"),
            rate_limit_exceeded_total: counter!("courier_rate_limit_exceeded_total"),
            active_deliveries: gauge!("courier_active_deliveries"),
            assignment_duration: histogram!("courier_assignment_duration_seconds"),
        }
    }

    pub fn record_assignment(&self, order_id: &str, courier_id: i64, duration_seconds: f64) {
        self.assignments_total.increment(1);
        self.active_deliveries.increment(1.0);
        self.assignment_duration.record(duration_seconds);
        info!(order_id, courier_id, duration_seconds, "courier assigned");
    }

    pub fn record_assignment_failure(&self, order_id: &str, error: &DispatchError) {
        self.assignment_failures_total.increment(1);
        warn!(order_id, error = %error, "assignment failed");
    }

    pub fn record_unassignment(&self, order_id: &str, courier_id: i64) {
        self.unassignments_total.increment(1);
        self.active_deliveries.decrement(1.0);
        info!(order_id, courier_id, "courier unassigned");
    }

    pub fn record_completion(&self, order_id: &str, courier_id: i64) {
        self.completions_total.increment(1);
        self.active_deliveries.decrement(1.0);
        info!(order_id, courier_id, "delivery completed");
    }

    pub fn record_released(&self, count: u64) {
        if count > 0 {
            self.couriers_released_total.increment(count);
            info!(released = count, "released couriers from expired deliveries");
        }
    }

    pub fn record_event_processed(&self, outcome: &str) {
        self.events_processed_total.increment(1);
        counter!("courier_order_event_outcomes_total", "outcome" => outcome.to_string())
            .increment(1);
    }

    pub fn record_event_failed(&self) {
        self.events_failed_total.increment(1);
    }

    pub fn record_event_dropped(&self) {
        self.events_dropped_total.increment(1);
    }

    pub fn record_orders_polled(&self, count: usize) {
        self.orders_polled_total.increment(count as u64);
    }

    pub fn record_rate_limited(&self, path: &str) {
        self.rate_limit_exceeded_total.increment(1);
        warn!(path, "rate limit exceeded");
    }

    pub fn record_http_request(&self, method: &str, path: &str, status: u16) {
        counter!(
            "courier_http_requests_total",
            "method" => method.to_string(),
            "path" => path.to_string(),
            "status" => status.to_string()
        )
        .increment(1);
    }
}

impl RetryRecorder for MetricsCollector {
    fn record_retry(&self, operation: &str, attempt: u32, error: &DispatchError) {
        counter!("courier_gateway_retries_total", "operation" => operation.to_string())
            .increment(1);
        warn!(operation, attempt, error = %error, "retrying gateway call");
    }
}

/// Install the process-wide Prometheus recorder. Call once, before any
/// `MetricsCollector` is built.
pub fn install_prometheus_recorder() -> DispatchResult<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| DispatchError::Internal(format!("failed to install metrics recorder: {e}")))
}
