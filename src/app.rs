use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use dispatch_api::{create_app, AppState};
use dispatch_config::AppConfig;
use dispatch_core::{
    traits::{DeliveryDispatcher, OrderGateway},
    ShutdownSignal,
};
use dispatch_dispatcher::{
    DispatchEngine, ExpirySweeper, OrderEventConsumer, OrderEventReactor, OrderPoller,
};
use dispatch_infrastructure::{
    install_prometheus_recorder, DatabaseManager, HttpOrderGateway, MessageQueueFactory,
    MetricsCollector,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::{net::TcpListener, task::JoinHandle};
use tracing::{error, info};

/// The assembled service: storage, metrics and every enabled component.
pub struct Application {
    config: AppConfig,
    database: DatabaseManager,
    metrics: Arc<MetricsCollector>,
    prometheus: Option<PrometheusHandle>,
}

impl Application {
    pub async fn new(config: AppConfig) -> Result<Self> {
        // Counter handles bind to the recorder that is current when they are created.
        let prometheus = if config.observability.metrics_enabled {
            Some(install_prometheus_recorder().context("installing Prometheus recorder")?)
        } else {
            None
        };
        let metrics = Arc::new(MetricsCollector::new());

        info!(url = %mask_url(&config.database.url), "connecting storage");
        let database = DatabaseManager::new(&config.database)
            .await
            .context("connecting to the database")?;

        Ok(Self {
            config,
            database,
            metrics,
            prometheus,
        })
    }

    /// Run every enabled component until `shutdown` fires.
    pub async fn run(&self, shutdown: ShutdownSignal) -> Result<()> {
        let dispatcher: Arc<dyn DeliveryDispatcher> = Arc::new(DispatchEngine::new(
            self.database.delivery_repository(),
            self.metrics.clone(),
        ));
        let gateway: Arc<dyn OrderGateway> = Arc::new(
            HttpOrderGateway::new(&self.config.gateway)
                .context("building order gateway")?
                .with_recorder(self.metrics.clone())
                .with_shutdown(shutdown.clone()),
        );

        let mut handles: Vec<JoinHandle<()>> = Vec::new();
        let settings = &self.config.dispatcher;

        if settings.sweeper_enabled {
            let sweeper = ExpirySweeper::new(
                self.database.courier_repository(),
                self.metrics.clone(),
                Duration::from_secs(settings.sweep_interval_seconds),
            );
            let signal = shutdown.clone();
            handles.push(tokio::spawn(async move { sweeper.run(signal).await }));
        }

        if settings.poller_enabled {
            let poller = OrderPoller::new(
                gateway.clone(),
                dispatcher.clone(),
                self.metrics.clone(),
                Duration::from_secs(settings.poll_interval_seconds),
            );
            let signal = shutdown.clone();
            handles.push(tokio::spawn(async move { poller.run(signal).await }));
        }

        if settings.consumer_enabled {
            info!(url = %mask_url(&self.config.message_queue.url), "connecting event queue");
            let queue = MessageQueueFactory::create(&self.config.message_queue)
                .await
                .context("connecting to the message queue")?;
            let reactor = Arc::new(OrderEventReactor::new(gateway.clone(), dispatcher.clone()));
            let consumer = OrderEventConsumer::new(
                queue,
                self.config.message_queue.order_events_queue.clone(),
                reactor,
                self.metrics.clone(),
                Duration::from_millis(settings.consumer_poll_interval_ms),
            );
            let signal = shutdown.clone();
            handles.push(tokio::spawn(async move { consumer.run(signal).await }));
        }

        if self.config.api.enabled {
            handles.push(self.spawn_api(dispatcher, shutdown.clone()).await?);
        }

        info!(components = handles.len(), "courier dispatch running");
        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "component task failed");
            }
        }

        self.database.close().await;
        info!("all components stopped");
        Ok(())
    }

    async fn spawn_api(
        &self,
        dispatcher: Arc<dyn DeliveryDispatcher>,
        shutdown: ShutdownSignal,
    ) -> Result<JoinHandle<()>> {
        let state = AppState {
            couriers: self.database.courier_repository(),
            dispatcher,
            metrics: self.metrics.clone(),
            prometheus: self.prometheus.clone(),
        };
        let metrics_endpoint = self
            .prometheus
            .as_ref()
            .map(|_| self.config.observability.metrics_endpoint.as_str());
        let app = create_app(state, &self.config.api, metrics_endpoint);

        let bind_address = &self.config.api.bind_address;
        let listener = TcpListener::bind(bind_address)
            .await
            .with_context(|| format!("binding {bind_address}"))?;
        info!(address = %bind_address, "HTTP API listening");

        Ok(tokio::spawn(async move {
            let server = axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await });
            if let Err(e) = server.await {
                error!(error = %e, "HTTP API failed");
            }
            info!("HTTP API stopped");
        }))
    }
}

/// Hide the password part of a connection URL.
fn mask_url(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            // `scheme://` has no password to hide.
            if !url[colon_pos + 1..at_pos].starts_with("//") {
                let mut masked = url.to_string();
                masked.replace_range(colon_pos + 1..at_pos, "***");
                return masked;
            }
        }
    }
    url.to_string()
}
