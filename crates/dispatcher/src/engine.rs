use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use dispatch_core::{
    models::{CourierStatus, Delivery, NewDelivery},
    traits::{Assignment, DeliveryDispatcher, DeliveryRepository},
    Clock, DispatchError, DispatchResult, SystemClock,
};
use dispatch_infrastructure::MetricsCollector;
use tracing::{debug, instrument};

use crate::deadline::deadline_for;

/// Courier-to-order binding over the delivery ledger.
///
/// Every operation runs in one ledger transaction; any error drops the
/// transaction and rolls back whatever was staged.
pub struct DispatchEngine {
    deliveries: Arc<dyn DeliveryRepository>,
    clock: Arc<dyn Clock>,
    metrics: Arc<MetricsCollector>,
}

impl DispatchEngine {
    pub fn new(deliveries: Arc<dyn DeliveryRepository>, metrics: Arc<MetricsCollector>) -> Self {
        Self {
            deliveries,
            clock: Arc::new(SystemClock),
            metrics,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    async fn try_assign(&self, order_id: &str) -> DispatchResult<Assignment> {
        let mut tx = self.deliveries.begin().await?;

        if let Some(existing) = tx.get_by_order(order_id).await? {
            if !existing.is_active() {
                return Err(DispatchError::DeliveryAlreadyClosed {
                    order_id: order_id.to_string(),
                });
            }
            let courier = tx
                .get_courier(existing.courier_id)
                .await?
                .ok_or(DispatchError::CourierNotFound {
                    id: existing.courier_id,
                })?;
            debug!(order_id, courier_id = courier.id, "order already assigned");
            return Ok(Assignment {
                delivery: existing,
                courier,
            });
        }

        let mut courier = tx
            .lock_available_courier()
            .await?
            .ok_or(DispatchError::NoCourierAvailable)?;

        let assigned_at = self.clock.now();
        let delivery = tx
            .create(&NewDelivery {
                courier_id: courier.id,
                order_id: order_id.to_string(),
                assigned_at,
                deadline: deadline_for(&courier.transport_type, assigned_at),
            })
            .await?;
        tx.set_courier_status(courier.id, CourierStatus::Busy).await?;
        tx.commit().await?;

        courier.status = CourierStatus::Busy;
        Ok(Assignment { delivery, courier })
    }
}

#[async_trait]
impl DeliveryDispatcher for DispatchEngine {
    #[instrument(skip(self))]
    async fn assign(&self, order_id: &str) -> DispatchResult<Assignment> {
        let started = Instant::now();
        let result = match self.try_assign(order_id).await {
            // A concurrent assign committed this order first; replay its result.
            Err(DispatchError::Conflict(_)) => {
                debug!(order_id, "lost assignment race, re-reading");
                self.try_assign(order_id).await
            }
            other => other,
        };
        match result {
            Ok(assignment) => {
                self.metrics.record_assignment(
                    order_id,
                    assignment.courier.id,
                    started.elapsed().as_secs_f64(),
                );
                Ok(assignment)
            }
            Err(error) => {
                self.metrics.record_assignment_failure(order_id, &error);
                Err(error)
            }
        }
    }

    #[instrument(skip(self))]
    async fn unassign(&self, order_id: &str) -> DispatchResult<Delivery> {
        let mut tx = self.deliveries.begin().await?;
        let delivery = tx.delete_by_order(order_id).await?;
        tx.set_courier_status(delivery.courier_id, CourierStatus::Available)
            .await?;
        tx.commit().await?;

        self.metrics.record_unassignment(order_id, delivery.courier_id);
        Ok(delivery)
    }

    #[instrument(skip(self))]
    async fn complete(&self, order_id: &str) -> DispatchResult<Delivery> {
        let mut tx = self.deliveries.begin().await?;
        let delivery = tx.mark_completed(order_id, self.clock.now()).await?;
        tx.set_courier_status(delivery.courier_id, CourierStatus::Available)
            .await?;
        tx.commit().await?;

        self.metrics.record_completion(order_id, delivery.courier_id);
        Ok(delivery)
    }
}
