//! Persistence contracts for the courier directory and delivery ledger.
//!
//! The dispatcher depends only on these traits; concrete stores live in
//! `dispatch-infrastructure` (PostgreSQL and in-memory).
//!
//! ## Units of work
//!
//! Every multi-step mutation goes through a [`DeliveryTransaction`] obtained
//! from [`DeliveryRepository::begin`]. Changes become visible only on
//! [`DeliveryTransaction::commit`]; dropping the transaction discards them,
//! so an early `?` return is a rollback.
//!
//! ```ignore
//! let mut tx = deliveries.begin().await?;
//! let courier = tx.lock_available_courier().await?.ok_or(DispatchError::NoCourierAvailable)?;
//! let delivery = tx.create(new_delivery).await?;
//! tx.set_courier_status(courier.id, CourierStatus::Busy).await?;
//! tx.commit().await?;
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    models::{Courier, CourierStatus, CourierUpdate, Delivery, NewCourier, NewDelivery},
    DispatchResult,
};

/// Courier directory.
#[async_trait]
pub trait CourierRepository: Send + Sync {
    /// Register a courier.
    ///
    /// # Errors
    ///
    /// * `Conflict` - a courier with the same phone already exists
    async fn create(&self, courier: &NewCourier) -> DispatchResult<Courier>;

    async fn get_by_id(&self, id: i64) -> DispatchResult<Option<Courier>>;

    /// All couriers ordered by id.
    async fn list(&self) -> DispatchResult<Vec<Courier>>;

    /// Apply a partial update and return the stored record.
    ///
    /// # Errors
    ///
    /// * `CourierNotFound` - no courier with `update.id`
    /// * `Conflict` - the new phone belongs to another courier
    async fn update(&self, update: &CourierUpdate) -> DispatchResult<Courier>;

    /// Least-loaded available courier, ties broken by lowest id.
    ///
    /// This is a plain read. Assignment must use
    /// [`DeliveryTransaction::lock_available_courier`] instead so the
    /// selection is reserved until commit.
    async fn find_available(&self) -> DispatchResult<Option<Courier>>;

    /// # Errors
    ///
    /// * `CourierNotFound` - no courier with `id`
    async fn set_status(&self, id: i64, status: CourierStatus) -> DispatchResult<()>;

    /// Flip every busy courier holding an active delivery whose deadline is
    /// before `now` back to available, and mark those deliveries expired.
    ///
    /// Must be one atomic statement or transaction. Returns the number of
    /// couriers released.
    async fn release_expired(&self, now: DateTime<Utc>) -> DispatchResult<u64>;
}

/// Delivery ledger.
#[async_trait]
pub trait DeliveryRepository: Send + Sync {
    /// Open a unit of work spanning couriers and deliveries.
    async fn begin(&self) -> DispatchResult<Box<dyn DeliveryTransaction>>;

    /// Latest delivery for the order, whatever its state.
    async fn get_by_order(&self, order_id: &str) -> DispatchResult<Option<Delivery>>;

    /// Active deliveries ordered by deadline.
    async fn list_active(&self) -> DispatchResult<Vec<Delivery>>;
}

/// One open unit of work. Dropping it without `commit` rolls back.
#[async_trait]
pub trait DeliveryTransaction: Send {
    /// Select the least-loaded available courier (fewest active
    /// deliveries, then lowest id) and reserve it against concurrent
    /// transactions until this one ends.
    async fn lock_available_courier(&mut self) -> DispatchResult<Option<Courier>>;

    /// # Errors
    ///
    /// * `CourierNotFound` - no courier with `id`
    async fn set_courier_status(&mut self, id: i64, status: CourierStatus) -> DispatchResult<()>;

    async fn get_courier(&mut self, id: i64) -> DispatchResult<Option<Courier>>;

    /// # Errors
    ///
    /// * `Conflict` - a delivery for the order already exists
    async fn create(&mut self, delivery: &NewDelivery) -> DispatchResult<Delivery>;

    /// Latest delivery for the order, whatever its state.
    async fn get_by_order(&mut self, order_id: &str) -> DispatchResult<Option<Delivery>>;

    /// Remove the active delivery for the order and return it.
    ///
    /// # Errors
    ///
    /// * `DeliveryNotFound` - no active delivery for the order
    async fn delete_by_order(&mut self, order_id: &str) -> DispatchResult<Delivery>;

    /// Stamp the active delivery for the order as completed and return it.
    ///
    /// # Errors
    ///
    /// * `DeliveryNotFound` - no active delivery for the order
    async fn mark_completed(
        &mut self,
        order_id: &str,
        at: DateTime<Utc>,
    ) -> DispatchResult<Delivery>;

    async fn commit(self: Box<Self>) -> DispatchResult<()>;
}
