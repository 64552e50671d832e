use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dispatch_core::{
    traits::{DeliveryDispatcher, OrderGateway},
    Clock, ShutdownSignal, SystemClock,
};
use dispatch_infrastructure::MetricsCollector;
use tracing::{debug, error, info, warn};

/// Pulls newly created orders from upstream and assigns them.
pub struct OrderPoller {
    gateway: Arc<dyn OrderGateway>,
    dispatcher: Arc<dyn DeliveryDispatcher>,
    clock: Arc<dyn Clock>,
    metrics: Arc<MetricsCollector>,
    period: Duration,
}

impl OrderPoller {
    pub fn new(
        gateway: Arc<dyn OrderGateway>,
        dispatcher: Arc<dyn DeliveryDispatcher>,
        metrics: Arc<MetricsCollector>,
        period: Duration,
    ) -> Self {
        Self {
            gateway,
            dispatcher,
            clock: Arc::new(SystemClock),
            metrics,
            period,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// One period back from now.
    pub fn fresh_cursor(&self) -> DateTime<Utc> {
        let lookback = chrono::Duration::from_std(self.period).unwrap_or(chrono::Duration::zero());
        self.clock.now() - lookback
    }

    /// Run one tick from `cursor` and return the cursor for the next one.
    ///
    /// A failed fetch keeps the cursor, an empty batch resets it, and a
    /// non-empty batch moves it just past the newest order seen.
    pub async fn poll_once(&self, cursor: DateTime<Utc>) -> DateTime<Utc> {
        let orders = match self.gateway.fetch_orders(cursor).await {
            Ok(orders) => orders,
            Err(e) => {
                error!(%cursor, error = %e, "failed to fetch new orders");
                return cursor;
            }
        };

        let Some(newest) = orders.iter().map(|o| o.created_at).max() else {
            debug!(%cursor, "no new orders");
            return self.fresh_cursor();
        };

        self.metrics.record_orders_polled(orders.len());
        for order in &orders {
            if let Err(e) = self.dispatcher.assign(&order.id).await {
                warn!(order_id = %order.id, error = %e, "failed to assign polled order");
            }
        }

        newest + chrono::Duration::nanoseconds(1)
    }

    pub async fn run(&self, shutdown: ShutdownSignal) {
        info!(period_secs = self.period.as_secs(), "order poller started");
        let mut cursor = self.fresh_cursor();
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    cursor = self.poll_once(cursor).await;
                }
            }
        }

        info!("order poller stopped");
    }
}
