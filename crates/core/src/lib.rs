pub mod clock;
pub mod errors;
pub mod models;
pub mod shutdown;
pub mod traits;

pub use clock::{Clock, SystemClock};
pub use errors::*;
pub use models::{
    Courier, CourierStatus, CourierUpdate, Delivery, Message, NewCourier, NewDelivery, OrderEvent,
    OrderStatus, OrderSummary, TransportMode,
};
pub use shutdown::{ShutdownSignal, ShutdownTrigger};
pub use traits::{
    Assignment, CourierRepository, DeliveryDispatcher, DeliveryRepository, DeliveryTransaction,
    MessageQueue, NoopRetryRecorder, OrderGateway, RetryRecorder,
};
