//! # Data models
//!
//! Couriers, deliveries and the order-side types the dispatcher reacts to.
//!
//! - [`Courier`]: a courier record with its availability status
//! - [`Delivery`]: the binding of one order to one courier, with a deadline
//! - [`OrderStatus`]: upstream order status as a closed set plus an
//!   `Unrecognized` fallback
//! - [`Message`]: envelope produced by the event transport
//!
//! All timestamps are `DateTime<Utc>`.

pub mod courier;
pub mod delivery;
pub mod message;
pub mod order;

pub use courier::{Courier, CourierStatus, CourierUpdate, NewCourier, TransportMode};
pub use delivery::{Delivery, NewDelivery};
pub use message::Message;
pub use order::{OrderEvent, OrderStatus, OrderSummary};
