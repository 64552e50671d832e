//! In-process store with the same transactional contract as PostgreSQL.
//!
//! All state sits behind one async mutex. A transaction owns the guard for
//! its whole lifetime and works on a staged copy, so transactions are
//! serialized and nothing is visible until `commit` writes the copy back.

pub mod memory_courier_repository;
pub mod memory_delivery_repository;

pub use memory_courier_repository::InMemoryCourierRepository;
pub use memory_delivery_repository::InMemoryDeliveryRepository;

use chrono::{DateTime, Utc};
use dispatch_core::{
    models::{Courier, CourierStatus, Delivery, NewCourier, NewDelivery},
    DispatchError, DispatchResult,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared handle; clones see the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn courier_repository(&self) -> InMemoryCourierRepository {
        InMemoryCourierRepository::new(self.clone())
    }

    pub fn delivery_repository(&self) -> InMemoryDeliveryRepository {
        InMemoryDeliveryRepository::new(self.clone())
    }

    pub(crate) fn state(&self) -> &Arc<Mutex<MemoryState>> {
        &self.state
    }

    /// Copy of every delivery row, for assertions.
    pub async fn deliveries(&self) -> Vec<Delivery> {
        self.state.lock().await.deliveries.values().cloned().collect()
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct MemoryState {
    couriers: BTreeMap<i64, Courier>,
    deliveries: BTreeMap<i64, Delivery>,
    next_courier_id: i64,
    next_delivery_id: i64,
}

impl MemoryState {
    pub(crate) fn insert_courier(&mut self, new: &NewCourier) -> DispatchResult<Courier> {
        if self.couriers.values().any(|c| c.phone == new.phone) {
            return Err(DispatchError::Conflict(format!(
                "courier with phone {} already exists",
                new.phone
            )));
        }
        self.next_courier_id += 1;
        let now = Utc::now();
        let courier = Courier {
            id: self.next_courier_id,
            name: new.name.clone(),
            phone: new.phone.clone(),
            status: CourierStatus::Available,
            transport_type: new.transport_type.clone(),
            created_at: now,
            updated_at: now,
        };
        self.couriers.insert(courier.id, courier.clone());
        Ok(courier)
    }

    pub(crate) fn courier(&self, id: i64) -> Option<&Courier> {
        self.couriers.get(&id)
    }

    pub(crate) fn courier_mut(&mut self, id: i64) -> DispatchResult<&mut Courier> {
        self.couriers
            .get_mut(&id)
            .ok_or(DispatchError::CourierNotFound { id })
    }

    pub(crate) fn couriers(&self) -> impl Iterator<Item = &Courier> {
        self.couriers.values()
    }

    pub(crate) fn phone_taken_by_other(&self, phone: &str, id: i64) -> bool {
        self.couriers.values().any(|c| c.phone == phone && c.id != id)
    }

    pub(crate) fn set_status(&mut self, id: i64, status: CourierStatus) -> DispatchResult<()> {
        let courier = self.courier_mut(id)?;
        courier.status = status;
        courier.updated_at = Utc::now();
        Ok(())
    }

    fn load_of(&self, courier_id: i64) -> usize {
        self.deliveries
            .values()
            .filter(|d| d.courier_id == courier_id && d.is_active())
            .count()
    }

    /// Fewest active deliveries, then lowest id.
    pub(crate) fn least_loaded_available(&self) -> Option<Courier> {
        self.couriers
            .values()
            .filter(|c| c.is_available())
            .min_by_key(|c| (self.load_of(c.id), c.id))
            .cloned()
    }

    pub(crate) fn insert_delivery(&mut self, new: &NewDelivery) -> DispatchResult<Delivery> {
        if self.delivery_by_order(&new.order_id).is_some() {
            return Err(DispatchError::Conflict(format!(
                "delivery for order {} already exists",
                new.order_id
            )));
        }
        self.next_delivery_id += 1;
        let delivery = Delivery {
            id: self.next_delivery_id,
            courier_id: new.courier_id,
            order_id: new.order_id.clone(),
            assigned_at: new.assigned_at,
            deadline: new.deadline,
            completed_at: None,
            expired_at: None,
        };
        self.deliveries.insert(delivery.id, delivery.clone());
        Ok(delivery)
    }

    pub(crate) fn delivery_by_order(&self, order_id: &str) -> Option<&Delivery> {
        self.deliveries.values().find(|d| d.order_id == order_id)
    }

    fn active_delivery_id(&self, order_id: &str) -> Option<i64> {
        self.deliveries
            .values()
            .find(|d| d.order_id == order_id && d.is_active())
            .map(|d| d.id)
    }

    pub(crate) fn remove_active_delivery(&mut self, order_id: &str) -> DispatchResult<Delivery> {
        self.active_delivery_id(order_id)
            .and_then(|id| self.deliveries.remove(&id))
            .ok_or_else(|| DispatchError::delivery_not_found(order_id))
    }

    pub(crate) fn complete_active_delivery(
        &mut self,
        order_id: &str,
        at: DateTime<Utc>,
    ) -> DispatchResult<Delivery> {
        let id = self
            .active_delivery_id(order_id)
            .ok_or_else(|| DispatchError::delivery_not_found(order_id))?;
        let delivery = self
            .deliveries
            .get_mut(&id)
            .ok_or_else(|| DispatchError::delivery_not_found(order_id))?;
        delivery.completed_at = Some(at);
        Ok(delivery.clone())
    }

    pub(crate) fn active_deliveries(&self) -> Vec<Delivery> {
        let mut active: Vec<Delivery> = self
            .deliveries
            .values()
            .filter(|d| d.is_active())
            .cloned()
            .collect();
        active.sort_by_key(|d| d.deadline);
        active
    }

    pub(crate) fn release_expired(&mut self, now: DateTime<Utc>) -> u64 {
        let mut expired_couriers = Vec::new();
        for delivery in self.deliveries.values_mut() {
            if delivery.is_overdue(now) {
                delivery.expired_at = Some(now);
                expired_couriers.push(delivery.courier_id);
            }
        }

        let mut released = 0;
        for id in expired_couriers {
            if let Some(courier) = self.couriers.get_mut(&id) {
                if courier.status == CourierStatus::Busy {
                    courier.status = CourierStatus::Available;
                    courier.updated_at = now;
                    released += 1;
                }
            }
        }
        released
    }
}
