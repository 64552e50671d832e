use std::sync::Arc;
use tracing::info;

use dispatch_config::{MessageQueueConfig, MessageQueueType};
use dispatch_core::{traits::MessageQueue, DispatchResult};

use crate::{InMemoryMessageQueue, RabbitMQMessageQueue};

pub struct MessageQueueFactory;

impl MessageQueueFactory {
    pub async fn create(config: &MessageQueueConfig) -> DispatchResult<Arc<dyn MessageQueue>> {
        match config.r#type {
            MessageQueueType::Rabbitmq => {
                info!("initializing RabbitMQ message queue");
                let rabbitmq = RabbitMQMessageQueue::new(config.clone()).await?;
                Ok(Arc::new(rabbitmq))
            }
            MessageQueueType::InMemory => {
                info!("initializing in-memory message queue");
                let queue = InMemoryMessageQueue::with_batch_size(config.batch_size as usize);
                queue
                    .create_queue(&config.order_events_queue, true)
                    .await?;
                Ok(Arc::new(queue))
            }
        }
    }
}
