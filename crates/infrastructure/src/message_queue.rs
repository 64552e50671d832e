use async_trait::async_trait;
use dispatch_config::MessageQueueConfig;
use dispatch_core::{models::Message, traits::MessageQueue, DispatchError, DispatchResult};
use lapin::{
    options::*, types::FieldTable, BasicProperties, Channel, Connection, ConnectionProperties,
    Queue,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// RabbitMQ-backed order event feed
pub struct RabbitMQMessageQueue {
    // Owns the channel's connection for the lifetime of the queue.
    _connection: Connection,
    channel: Arc<Mutex<Channel>>,
    pending: Mutex<PendingTags>,
    config: MessageQueueConfig,
}

impl RabbitMQMessageQueue {
    pub async fn new(config: MessageQueueConfig) -> DispatchResult<Self> {
        let connect = Connection::connect(&config.url, ConnectionProperties::default());
        let connection =
            tokio::time::timeout(Duration::from_secs(config.connection_timeout_seconds), connect)
                .await
                .map_err(|_| {
                    DispatchError::MessageQueue(format!(
                        "timed out connecting to RabbitMQ after {}s",
                        config.connection_timeout_seconds
                    ))
                })?
                .map_err(|e| DispatchError::MessageQueue(format!("failed to connect to RabbitMQ: {e}")))?;

        let channel = connection
            .create_channel()
            .await
            .map_err(|e| DispatchError::MessageQueue(format!("failed to open channel: {e}")))?;

        info!(queue = %config.order_events_queue, "connected to RabbitMQ");

        let queue = Self {
            _connection: connection,
            channel: Arc::new(Mutex::new(channel)),
            pending: Mutex::new(PendingTags::default()),
            config,
        };

        {
            let channel = queue.channel.lock().await;
            queue
                .declare_queue(&channel, &queue.config.order_events_queue, true)
                .await?;
        }

        Ok(queue)
    }

    async fn declare_queue(
        &self,
        channel: &Channel,
        queue_name: &str,
        durable: bool,
    ) -> DispatchResult<Queue> {
        let queue = channel
            .queue_declare(
                queue_name,
                QueueDeclareOptions {
                    durable,
                    exclusive: false,
                    auto_delete: false,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| {
                DispatchError::MessageQueue(format!("failed to declare queue {queue_name}: {e}"))
            })?;

        debug!(queue = queue_name, "queue declared");
        Ok(queue)
    }

    /// Accepts both our own envelopes and bare event bodies from other
    /// producers; anything else is wrapped as a JSON string and left for the
    /// consumer to reject.
    fn decode_body(data: &[u8]) -> Message {
        if let Ok(message) = serde_json::from_slice::<Message>(data) {
            return message;
        }
        match serde_json::from_slice::<serde_json::Value>(data) {
            Ok(value) => Message::new(value),
            Err(_) => Message::new(serde_json::Value::String(
                String::from_utf8_lossy(data).into_owned(),
            )),
        }
    }

    async fn take_tag(&self, message_id: &str) -> DispatchResult<u64> {
        self.pending.lock().await.take(message_id).ok_or_else(|| {
            DispatchError::MessageQueue(format!("unknown or already settled message {message_id}"))
        })
    }
}

/// AMQP delivery tags of messages handed out but not settled, per message
/// id. Redelivered copies of one envelope share an id, so each id holds its
/// tags in arrival order.
#[derive(Debug, Default)]
struct PendingTags {
    tags: HashMap<String, VecDeque<u64>>,
}

impl PendingTags {
    fn record(&mut self, message_id: &str, tag: u64) {
        self.tags
            .entry(message_id.to_string())
            .or_default()
            .push_back(tag);
    }

    fn take(&mut self, message_id: &str) -> Option<u64> {
        let queue = self.tags.get_mut(message_id)?;
        let tag = queue.pop_front();
        if queue.is_empty() {
            self.tags.remove(message_id);
        }
        tag
    }
}

fn is_missing_queue(error: &lapin::Error) -> bool {
    let text = error.to_string();
    text.contains("NOT_FOUND") || text.contains("404")
}

#[async_trait]
impl MessageQueue for RabbitMQMessageQueue {
    async fn publish_message(&self, queue: &str, message: &Message) -> DispatchResult<()> {
        let payload = message.serialize_bytes()?;
        let channel = self.channel.lock().await;

        let confirm = channel
            .basic_publish(
                "",
                queue,
                BasicPublishOptions::default(),
                &payload,
                BasicProperties::default().with_delivery_mode(2),
            )
            .await
            .map_err(|e| DispatchError::MessageQueue(format!("failed to publish to {queue}: {e}")))?;

        confirm
            .await
            .map_err(|e| DispatchError::MessageQueue(format!("publish confirm failed: {e}")))?;

        debug!(queue, message_id = %message.id, "message published");
        Ok(())
    }

    async fn consume_messages(&self, queue: &str) -> DispatchResult<Vec<Message>> {
        let channel = self.channel.lock().await;
        let mut messages = Vec::new();

        while messages.len() < self.config.batch_size as usize {
            match channel.basic_get(queue, BasicGetOptions::default()).await {
                Ok(Some(delivery)) => {
                    let message = Self::decode_body(&delivery.data);
                    self.pending
                        .lock()
                        .await
                        .record(&message.id, delivery.delivery_tag);
                    messages.push(message);
                }
                Ok(None) => break,
                Err(e) if is_missing_queue(&e) => {
                    debug!(queue, "queue does not exist yet");
                    break;
                }
                Err(e) => {
                    return Err(DispatchError::MessageQueue(format!(
                        "failed to fetch from {queue}: {e}"
                    )))
                }
            }
        }

        Ok(messages)
    }

    async fn ack_message(&self, message_id: &str) -> DispatchResult<()> {
        let tag = self.take_tag(message_id).await?;
        let channel = self.channel.lock().await;
        channel
            .basic_ack(tag, BasicAckOptions::default())
            .await
            .map_err(|e| DispatchError::MessageQueue(format!("ack failed: {e}")))?;
        debug!(message_id, "message acked");
        Ok(())
    }

    async fn nack_message(&self, message_id: &str, requeue: bool) -> DispatchResult<()> {
        let tag = self.take_tag(message_id).await?;
        let channel = self.channel.lock().await;
        channel
            .basic_nack(
                tag,
                BasicNackOptions {
                    multiple: false,
                    requeue,
                },
            )
            .await
            .map_err(|e| DispatchError::MessageQueue(format!("nack failed: {e}")))?;
        if !requeue {
            warn!(message_id, "message dropped");
        }
        Ok(())
    }

    async fn create_queue(&self, queue: &str, durable: bool) -> DispatchResult<()> {
        let channel = self.channel.lock().await;
        self.declare_queue(&channel, queue, durable).await?;
        Ok(())
    }

    async fn get_queue_size(&self, queue: &str) -> DispatchResult<u32> {
        let channel = self.channel.lock().await;
        let declared = channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    passive: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await;

        match declared {
            Ok(info) => Ok(info.message_count()),
            Err(e) if is_missing_queue(&e) => Ok(0),
            Err(e) => Err(DispatchError::MessageQueue(format!(
                "failed to inspect queue {queue}: {e}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch_core::models::OrderEvent;

    #[test]
    fn test_duplicate_envelopes_keep_every_tag() {
        let mut pending = PendingTags::default();
        pending.record("m-1", 7);
        pending.record("m-1", 9);
        pending.record("m-2", 8);

        assert_eq!(pending.take("m-1"), Some(7));
        assert_eq!(pending.take("m-1"), Some(9));
        assert_eq!(pending.take("m-1"), None);
        assert_eq!(pending.take("m-2"), Some(8));
    }

    #[test]
    fn test_decode_body_keeps_envelope() {
        let original = Message::order_event(&OrderEvent::new("o-1"));
        let bytes = original.serialize_bytes().unwrap();
        let decoded = RabbitMQMessageQueue::decode_body(&bytes);
        assert_eq!(decoded.id, original.id);
        assert_eq!(decoded.decode::<OrderEvent>().unwrap().order_id, "o-1");
    }

    #[test]
    fn test_decode_body_wraps_bare_event() {
        let decoded =
            RabbitMQMessageQueue::decode_body(br#"{"order_id":"o-2","status":"created"}"#);
        let event: OrderEvent = decoded.decode().unwrap();
        assert_eq!(event.order_id, "o-2");
        assert_eq!(event.status.as_deref(), Some("created"));
    }

    #[test]
    fn test_decode_body_wraps_garbage_as_string() {
        let decoded = RabbitMQMessageQueue::decode_body(b"not json");
        assert!(decoded.decode::<OrderEvent>().is_err());
    }
}
