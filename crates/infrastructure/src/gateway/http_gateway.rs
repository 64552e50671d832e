use std::error::Error as StdError;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use dispatch_config::GatewayConfig;
use dispatch_core::{
    models::OrderSummary,
    traits::{NoopRetryRecorder, OrderGateway, RetryRecorder},
    DispatchError, DispatchResult, ShutdownSignal,
};
use reqwest::{header, Client, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::debug;

use super::retry::RetryPolicy;

const STATUS_OPERATION: &str = "fetch_status";
const ORDERS_OPERATION: &str = "fetch_orders";

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: String,
}

/// Order service client over HTTP with bounded retries.
pub struct HttpOrderGateway {
    base_url: Url,
    client: Client,
    policy: RetryPolicy,
    recorder: Arc<dyn RetryRecorder>,
    shutdown: ShutdownSignal,
}

impl HttpOrderGateway {
    pub fn new(config: &GatewayConfig) -> DispatchResult<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            DispatchError::Configuration(format!("invalid gateway base url {}: {e}", config.base_url))
        })?;

        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        headers.insert("X-Bypass-Auth", header::HeaderValue::from_static("true"));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .default_headers(headers)
            .build()
            .map_err(|e| DispatchError::Configuration(format!("failed to build http client: {e}")))?;

        Ok(Self {
            base_url,
            client,
            policy: RetryPolicy::new(
                config.max_attempts,
                Duration::from_millis(config.base_delay_ms),
            ),
            recorder: Arc::new(NoopRetryRecorder),
            shutdown: ShutdownSignal::never(),
        })
    }

    pub fn with_recorder(mut self, recorder: Arc<dyn RetryRecorder>) -> Self {
        self.recorder = recorder;
        self
    }

    pub fn with_shutdown(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown = shutdown;
        self
    }

    fn endpoint(&self, segments: &[&str]) -> DispatchResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                DispatchError::Configuration(format!("gateway base url {} cannot hold a path", self.base_url))
            })?
            .clear()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, order_id: Option<&str>) -> DispatchResult<T> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body, order_id));
        }

        let bytes = response.bytes().await.map_err(classify_transport_error)?;
        serde_json::from_slice(&bytes).map_err(|e| {
            DispatchError::UpstreamRejected(format!("undecodable response from {url}: {e}"))
        })
    }
}

#[async_trait]
impl OrderGateway for HttpOrderGateway {
    async fn fetch_status(&self, order_id: &str) -> DispatchResult<String> {
        let url = self.endpoint(&["public", "api", "v1", "order", order_id, "status"])?;
        debug!(order_id, %url, "fetching order status");

        let body: StatusBody = self
            .policy
            .run(STATUS_OPERATION, self.recorder.as_ref(), &self.shutdown, || {
                self.get_json(url.clone(), Some(order_id))
            })
            .await?;
        Ok(body.status)
    }

    async fn fetch_orders(&self, since: DateTime<Utc>) -> DispatchResult<Vec<OrderSummary>> {
        let mut url = self.endpoint(&["public", "api", "v1", "orders"])?;
        url.query_pairs_mut()
            .append_pair("from", &since.to_rfc3339_opts(SecondsFormat::Nanos, true));

        self.policy
            .run(ORDERS_OPERATION, self.recorder.as_ref(), &self.shutdown, || {
                self.get_json(url.clone(), None)
            })
            .await
    }
}

fn classify_status(status: StatusCode, body: &str, order_id: Option<&str>) -> DispatchError {
    if let Some(order_id) = order_id {
        if status == StatusCode::NOT_FOUND || (status.is_client_error() && body.contains("not_found")) {
            return DispatchError::OrderNotFound {
                order_id: order_id.to_string(),
            };
        }
    }
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        return DispatchError::TransientNetwork(format!("upstream returned {status}"));
    }
    DispatchError::UpstreamRejected(format!("upstream returned {status}"))
}

fn classify_transport_error(error: reqwest::Error) -> DispatchError {
    if error.is_timeout() || error.is_connect() || has_transient_io_cause(&error) {
        DispatchError::TransientNetwork(error.to_string())
    } else if error.is_decode() {
        DispatchError::UpstreamRejected(error.to_string())
    } else {
        DispatchError::Internal(format!("order gateway request failed: {error}"))
    }
}

fn has_transient_io_cause(error: &(dyn StdError + 'static)) -> bool {
    let mut source = error.source();
    while let Some(cause) = source {
        if let Some(io_error) = cause.downcast_ref::<io::Error>() {
            if matches!(
                io_error.kind(),
                io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::TimedOut
                    | io::ErrorKind::UnexpectedEof
            ) {
                return true;
            }
        }
        source = cause.source();
    }
    false
}
