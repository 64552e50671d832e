//! Adapters behind the dispatch-core traits: storage, the order event
//! feed, the upstream order gateway and metrics.

pub mod database;
pub mod gateway;
pub mod in_memory_queue;
pub mod message_queue;
pub mod message_queue_factory;
pub mod observability;

pub use database::*;
pub use gateway::{HttpOrderGateway, RetryPolicy};
pub use in_memory_queue::InMemoryMessageQueue;
pub use message_queue::RabbitMQMessageQueue;
pub use message_queue_factory::MessageQueueFactory;
pub use observability::*;
