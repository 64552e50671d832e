pub mod dispatcher;
pub mod gateway;
pub mod message_queue;
pub mod repository;

pub use dispatcher::*;
pub use gateway::*;
pub use message_queue::*;
pub use repository::*;
