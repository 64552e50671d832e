use async_trait::async_trait;

use crate::{models::Message, DispatchResult};

/// Message queue abstraction
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Publish a message to the queue
    async fn publish_message(&self, queue: &str, message: &Message) -> DispatchResult<()>;

    /// Fetch pending messages from the queue
    async fn consume_messages(&self, queue: &str) -> DispatchResult<Vec<Message>>;

    /// Acknowledge a processed message
    async fn ack_message(&self, message_id: &str) -> DispatchResult<()>;

    /// Reject a message, optionally putting it back for redelivery
    async fn nack_message(&self, message_id: &str, requeue: bool) -> DispatchResult<()>;

    /// Declare a queue
    async fn create_queue(&self, queue: &str, durable: bool) -> DispatchResult<()>;

    /// Number of messages waiting in the queue
    async fn get_queue_size(&self, queue: &str) -> DispatchResult<u32>;
}
