use async_trait::async_trait;
use dispatch_core::{models::Message, traits::MessageQueue, DispatchError, DispatchResult};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

/// Process-local queue used in embedded mode and tests.
///
/// Consumed messages stay in flight until acked or nacked. A requeued
/// message goes back to the head of its queue with `retry_count` bumped.
#[derive(Debug, Clone)]
pub struct InMemoryMessageQueue {
    queues: Arc<RwLock<HashMap<String, VecDeque<Message>>>>,
    in_flight: Arc<Mutex<HashMap<String, (String, Message)>>>,
    batch_size: usize,
}

impl Default for InMemoryMessageQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMessageQueue {
    pub fn new() -> Self {
        Self::with_batch_size(10)
    }

    pub fn with_batch_size(batch_size: usize) -> Self {
        Self {
            queues: Arc::new(RwLock::new(HashMap::new())),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            batch_size: batch_size.max(1),
        }
    }

    /// Messages handed out and not yet settled.
    pub async fn in_flight_count(&self) -> usize {
        self.in_flight.lock().await.len()
    }

    async fn settle(&self, message_id: &str) -> DispatchResult<(String, Message)> {
        self.in_flight.lock().await.remove(message_id).ok_or_else(|| {
            DispatchError::MessageQueue(format!("unknown or already settled message {message_id}"))
        })
    }
}

#[async_trait]
impl MessageQueue for InMemoryMessageQueue {
    async fn publish_message(&self, queue: &str, message: &Message) -> DispatchResult<()> {
        self.queues
            .write()
            .await
            .entry(queue.to_string())
            .or_default()
            .push_back(message.clone());
        debug!(queue, message_id = %message.id, "message published");
        Ok(())
    }

    async fn consume_messages(&self, queue: &str) -> DispatchResult<Vec<Message>> {
        let mut queues = self.queues.write().await;
        let Some(pending) = queues.get_mut(queue) else {
            return Ok(Vec::new());
        };

        let take = pending.len().min(self.batch_size);
        let batch: Vec<Message> = pending.drain(..take).collect();
        drop(queues);

        let mut in_flight = self.in_flight.lock().await;
        for message in &batch {
            in_flight.insert(message.id.clone(), (queue.to_string(), message.clone()));
        }
        Ok(batch)
    }

    async fn ack_message(&self, message_id: &str) -> DispatchResult<()> {
        self.settle(message_id).await?;
        Ok(())
    }

    async fn nack_message(&self, message_id: &str, requeue: bool) -> DispatchResult<()> {
        let (queue, mut message) = self.settle(message_id).await?;
        if requeue {
            message.increment_retry();
            self.queues
                .write()
                .await
                .entry(queue)
                .or_default()
                .push_front(message);
        } else {
            warn!(message_id, "message dropped");
        }
        Ok(())
    }

    async fn create_queue(&self, queue: &str, _durable: bool) -> DispatchResult<()> {
        self.queues
            .write()
            .await
            .entry(queue.to_string())
            .or_default();
        Ok(())
    }

    async fn get_queue_size(&self, queue: &str) -> DispatchResult<u32> {
        Ok(self
            .queues
            .read()
            .await
            .get(queue)
            .map(|q| q.len() as u32)
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch_core::models::OrderEvent;

    #[tokio::test]
    async fn test_consume_respects_batch_size_and_order() {
        let queue = InMemoryMessageQueue::with_batch_size(2);
        for id in ["a", "b", "c"] {
            queue
                .publish_message("events", &Message::order_event(&OrderEvent::new(id)))
                .await
                .unwrap();
        }

        let batch = queue.consume_messages("events").await.unwrap();
        let ids: Vec<String> = batch
            .iter()
            .map(|m| m.decode::<OrderEvent>().unwrap().order_id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(queue.get_queue_size("events").await.unwrap(), 1);
        assert_eq!(queue.in_flight_count().await, 2);
    }

    #[tokio::test]
    async fn test_nack_with_requeue_redelivers_first() {
        let queue = InMemoryMessageQueue::new();
        queue
            .publish_message("events", &Message::order_event(&OrderEvent::new("a")))
            .await
            .unwrap();
        queue
            .publish_message("events", &Message::order_event(&OrderEvent::new("b")))
            .await
            .unwrap();

        let first = queue.consume_messages("events").await.unwrap();
        queue.nack_message(&first[0].id, true).await.unwrap();
        queue.ack_message(&first[1].id).await.unwrap();

        let again = queue.consume_messages("events").await.unwrap();
        assert_eq!(again.len(), 1);
        assert_eq!(again[0].id, first[0].id);
        assert_eq!(again[0].retry_count, 1);
    }

    #[tokio::test]
    async fn test_nack_without_requeue_drops() {
        let queue = InMemoryMessageQueue::new();
        queue
            .publish_message("events", &Message::order_event(&OrderEvent::new("a")))
            .await
            .unwrap();
        let batch = queue.consume_messages("events").await.unwrap();
        queue.nack_message(&batch[0].id, false).await.unwrap();

        assert_eq!(queue.get_queue_size("events").await.unwrap(), 0);
        assert_eq!(queue.in_flight_count().await, 0);
    }

    #[tokio::test]
    async fn test_double_ack_is_an_error() {
        let queue = InMemoryMessageQueue::new();
        queue
            .publish_message("events", &Message::order_event(&OrderEvent::new("a")))
            .await
            .unwrap();
        let batch = queue.consume_messages("events").await.unwrap();
        queue.ack_message(&batch[0].id).await.unwrap();
        assert!(queue.ack_message(&batch[0].id).await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_queue_is_empty() {
        let queue = InMemoryMessageQueue::new();
        assert!(queue.consume_messages("missing").await.unwrap().is_empty());
        assert_eq!(queue.get_queue_size("missing").await.unwrap(), 0);
    }
}
