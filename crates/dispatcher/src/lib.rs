//! Delivery lifecycle engine and the background loops that drive it.

pub mod consumer;
pub mod deadline;
pub mod engine;
pub mod poller;
pub mod reactor;
pub mod sweeper;

pub use consumer::{BatchReport, OrderEventConsumer, Settlement};
pub use deadline::{deadline_for, delivery_budget};
pub use engine::DispatchEngine;
pub use poller::OrderPoller;
pub use reactor::{OrderEventReactor, ReactorOutcome};
pub use sweeper::ExpirySweeper;
