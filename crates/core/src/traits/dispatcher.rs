use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    models::{Courier, Delivery},
    DispatchResult,
};

/// Result of a successful assignment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Assignment {
    pub delivery: Delivery,
    pub courier: Courier,
}

/// Delivery lifecycle operations, each one unit of work.
#[async_trait]
pub trait DeliveryDispatcher: Send + Sync {
    /// Bind the least-loaded available courier to the order
    async fn assign(&self, order_id: &str) -> DispatchResult<Assignment>;

    /// Dissolve the active delivery and free its courier
    async fn unassign(&self, order_id: &str) -> DispatchResult<Delivery>;

    /// Close the active delivery as completed and free its courier
    async fn complete(&self, order_id: &str) -> DispatchResult<Delivery>;
}
