use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{models::OrderSummary, DispatchError, DispatchResult};

/// Upstream order source.
///
/// Implementations own their retry policy. Both calls may fail with
/// `OrderNotFound`, `TransientNetwork` (after retries are exhausted),
/// `UpstreamRejected` or `Cancelled`.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Raw status string for the order.
    async fn fetch_status(&self, order_id: &str) -> DispatchResult<String>;

    /// Orders created at or after `since`.
    async fn fetch_orders(&self, since: DateTime<Utc>) -> DispatchResult<Vec<OrderSummary>>;
}

/// Observer notified once per retry, before the backoff sleep.
pub trait RetryRecorder: Send + Sync {
    fn record_retry(&self, operation: &str, attempt: u32, error: &DispatchError);
}

/// Recorder that drops every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRetryRecorder;

impl RetryRecorder for NoopRetryRecorder {
    fn record_retry(&self, _operation: &str, _attempt: u32, _error: &DispatchError) {}
}
