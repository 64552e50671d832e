use std::sync::Arc;
use std::time::Duration;

use dispatch_core::{
    traits::CourierRepository, Clock, DispatchResult, ShutdownSignal, SystemClock,
};
use dispatch_infrastructure::MetricsCollector;
use tracing::{debug, error, info};

/// Periodically hands couriers of overdue deliveries back to the pool.
pub struct ExpirySweeper {
    couriers: Arc<dyn CourierRepository>,
    clock: Arc<dyn Clock>,
    metrics: Arc<MetricsCollector>,
    interval: Duration,
}

impl ExpirySweeper {
    pub fn new(
        couriers: Arc<dyn CourierRepository>,
        metrics: Arc<MetricsCollector>,
        interval: Duration,
    ) -> Self {
        Self {
            couriers,
            clock: Arc::new(SystemClock),
            metrics,
            interval,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// One sweep; returns the number of couriers released.
    pub async fn sweep_once(&self) -> DispatchResult<u64> {
        let released = self.couriers.release_expired(self.clock.now()).await?;
        debug!(released, "expiry sweep finished");
        self.metrics.record_released(released);
        Ok(released)
    }

    pub async fn run(&self, shutdown: ShutdownSignal) {
        info!(interval_secs = self.interval.as_secs(), "expiry sweeper started");
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep_once().await {
                        error!(error = %e, "expiry sweep failed");
                    }
                }
            }
        }

        info!("expiry sweeper stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use dispatch_core::{models::CourierStatus, traits::DeliveryDispatcher, ShutdownTrigger};
    use dispatch_testing_utils::{ManualClock, TestStore};

    use crate::DispatchEngine;

    #[tokio::test]
    async fn test_sweep_releases_overdue_courier_once() {
        let store = TestStore::new();
        let courier = store.seed_couriers(1, "car").await.remove(0);
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let metrics = Arc::new(MetricsCollector::new());

        DispatchEngine::new(store.deliveries.clone(), metrics.clone())
            .with_clock(clock.clone())
            .assign("order-1")
            .await
            .unwrap();

        let sweeper = ExpirySweeper::new(store.couriers.clone(), metrics, Duration::from_secs(10))
            .with_clock(clock.clone());

        assert_eq!(sweeper.sweep_once().await.unwrap(), 0);

        clock.advance(ChronoDuration::minutes(6));
        assert_eq!(sweeper.sweep_once().await.unwrap(), 1);
        assert_eq!(sweeper.sweep_once().await.unwrap(), 0);

        let stored = store.couriers.get_by_id(courier.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CourierStatus::Available);
        assert!(store.deliveries.list_active().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_exits_on_shutdown() {
        let store = TestStore::new();
        let sweeper = Arc::new(ExpirySweeper::new(
            store.couriers.clone(),
            Arc::new(MetricsCollector::new()),
            Duration::from_millis(5),
        ));
        let trigger = ShutdownTrigger::new();

        let handle = {
            let sweeper = sweeper.clone();
            let signal = trigger.signal();
            tokio::spawn(async move { sweeper.run(signal).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.trigger();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
