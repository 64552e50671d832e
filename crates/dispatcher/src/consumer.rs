use std::sync::Arc;
use std::time::Duration;

use dispatch_core::{
    models::{Message, OrderEvent},
    traits::MessageQueue,
    DispatchResult, ShutdownSignal,
};
use dispatch_infrastructure::MetricsCollector;
use tracing::{error, info, warn};

use crate::reactor::OrderEventReactor;

/// How one message was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Acked,
    Requeued,
    Dropped,
}

/// Counts for one consumed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub received: usize,
    pub requeued: usize,
}

/// Feeds order events from a queue into the reactor.
pub struct OrderEventConsumer {
    queue: Arc<dyn MessageQueue>,
    queue_name: String,
    reactor: Arc<OrderEventReactor>,
    metrics: Arc<MetricsCollector>,
    idle_wait: Duration,
}

impl OrderEventConsumer {
    pub fn new(
        queue: Arc<dyn MessageQueue>,
        queue_name: impl Into<String>,
        reactor: Arc<OrderEventReactor>,
        metrics: Arc<MetricsCollector>,
        idle_wait: Duration,
    ) -> Self {
        Self {
            queue,
            queue_name: queue_name.into(),
            reactor,
            metrics,
            idle_wait,
        }
    }

    pub async fn process_message(&self, message: &Message) -> DispatchResult<Settlement> {
        let event: OrderEvent = match message.decode() {
            Ok(event) => event,
            Err(e) => {
                warn!(message_id = %message.id, error = %e, "dropping undecodable order event");
                self.metrics.record_event_dropped();
                self.queue.ack_message(&message.id).await?;
                return Ok(Settlement::Dropped);
            }
        };

        match self.reactor.handle_event(&event.order_id).await {
            Ok(outcome) => {
                self.metrics.record_event_processed(outcome.label());
                self.queue.ack_message(&message.id).await?;
                Ok(Settlement::Acked)
            }
            Err(e) => {
                error!(
                    order_id = %event.order_id,
                    retry_count = message.retry_count,
                    error = %e,
                    "order event failed, requeueing"
                );
                self.metrics.record_event_failed();
                self.queue.nack_message(&message.id, true).await?;
                Ok(Settlement::Requeued)
            }
        }
    }

    /// Fetch and settle one batch.
    pub async fn poll_once(&self) -> DispatchResult<BatchReport> {
        let messages = self.queue.consume_messages(&self.queue_name).await?;
        let mut report = BatchReport {
            received: messages.len(),
            requeued: 0,
        };
        for message in &messages {
            match self.process_message(message).await {
                Ok(Settlement::Requeued) => report.requeued += 1,
                Ok(_) => {}
                Err(e) => {
                    error!(message_id = %message.id, error = %e, "failed to settle message");
                }
            }
        }
        Ok(report)
    }

    pub async fn run(&self, shutdown: ShutdownSignal) {
        info!(queue = %self.queue_name, "order event consumer started");

        while !shutdown.is_cancelled() {
            // Back off when nothing arrived or everything bounced.
            let wait = match self.poll_once().await {
                Ok(report) if report.received > report.requeued => continue,
                Ok(_) => self.idle_wait,
                Err(e) => {
                    error!(queue = %self.queue_name, error = %e, "failed to consume order events");
                    self.idle_wait.max(Duration::from_secs(1))
                }
            };

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }
        }

        info!(queue = %self.queue_name, "order event consumer stopped");
    }
}
