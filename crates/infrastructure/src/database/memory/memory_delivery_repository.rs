use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dispatch_core::{
    models::{Courier, CourierStatus, Delivery, NewDelivery},
    traits::{DeliveryRepository, DeliveryTransaction},
    DispatchResult,
};
use tokio::sync::OwnedMutexGuard;

use super::{MemoryState, MemoryStore};

/// In-memory delivery ledger
#[derive(Debug, Clone)]
pub struct InMemoryDeliveryRepository {
    store: MemoryStore,
}

impl InMemoryDeliveryRepository {
    pub fn new(store: MemoryStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl DeliveryRepository for InMemoryDeliveryRepository {
    async fn begin(&self) -> DispatchResult<Box<dyn DeliveryTransaction>> {
        let guard = self.store.state().clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(InMemoryTransaction { guard, staged }))
    }

    async fn get_by_order(&self, order_id: &str) -> DispatchResult<Option<Delivery>> {
        Ok(self
            .store
            .state()
            .lock()
            .await
            .delivery_by_order(order_id)
            .cloned())
    }

    async fn list_active(&self) -> DispatchResult<Vec<Delivery>> {
        Ok(self.store.state().lock().await.active_deliveries())
    }
}

/// Holds the store lock until dropped; `staged` replaces the shared state
/// on commit.
pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
}

#[async_trait]
impl DeliveryTransaction for InMemoryTransaction {
    async fn lock_available_courier(&mut self) -> DispatchResult<Option<Courier>> {
        Ok(self.staged.least_loaded_available())
    }

    async fn set_courier_status(&mut self, id: i64, status: CourierStatus) -> DispatchResult<()> {
        self.staged.set_status(id, status)
    }

    async fn get_courier(&mut self, id: i64) -> DispatchResult<Option<Courier>> {
        Ok(self.staged.courier(id).cloned())
    }

    async fn create(&mut self, delivery: &NewDelivery) -> DispatchResult<Delivery> {
        self.staged.insert_delivery(delivery)
    }

    async fn get_by_order(&mut self, order_id: &str) -> DispatchResult<Option<Delivery>> {
        Ok(self.staged.delivery_by_order(order_id).cloned())
    }

    async fn delete_by_order(&mut self, order_id: &str) -> DispatchResult<Delivery> {
        self.staged.remove_active_delivery(order_id)
    }

    async fn mark_completed(
        &mut self,
        order_id: &str,
        at: DateTime<Utc>,
    ) -> DispatchResult<Delivery> {
        self.staged.complete_active_delivery(order_id, at)
    }

    async fn commit(self: Box<Self>) -> DispatchResult<()> {
        let InMemoryTransaction { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use dispatch_core::{models::NewCourier, traits::CourierRepository, DispatchError};

    async fn seeded() -> (MemoryStore, Courier) {
        let store = MemoryStore::new();
        let courier = store
            .courier_repository()
            .create(&NewCourier {
                name: "Anna".into(),
                phone: "+70000000001".into(),
                transport_type: "scooter".into(),
            })
            .await
            .unwrap();
        (store, courier)
    }

    fn new_delivery(courier_id: i64, order_id: &str) -> NewDelivery {
        let now = Utc::now();
        NewDelivery {
            courier_id,
            order_id: order_id.to_string(),
            assigned_at: now,
            deadline: now + Duration::minutes(15),
        }
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let (store, courier) = seeded().await;
        let repo = store.delivery_repository();

        {
            let mut tx = repo.begin().await.unwrap();
            tx.create(&new_delivery(courier.id, "order-1")).await.unwrap();
            tx.set_courier_status(courier.id, CourierStatus::Busy).await.unwrap();
        }

        assert!(repo.get_by_order("order-1").await.unwrap().is_none());
        let courier = store.courier_repository().get_by_id(courier.id).await.unwrap().unwrap();
        assert_eq!(courier.status, CourierStatus::Available);
    }

    #[tokio::test]
    async fn test_commit_publishes_changes() {
        let (store, courier) = seeded().await;
        let repo = store.delivery_repository();

        let mut tx = repo.begin().await.unwrap();
        tx.create(&new_delivery(courier.id, "order-1")).await.unwrap();
        tx.commit().await.unwrap();

        assert!(repo.get_by_order("order-1").await.unwrap().is_some());
        assert_eq!(repo.list_active().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_completed_delivery_is_retained_but_inactive() {
        let (store, courier) = seeded().await;
        let repo = store.delivery_repository();

        let mut tx = repo.begin().await.unwrap();
        tx.create(&new_delivery(courier.id, "order-1")).await.unwrap();
        tx.mark_completed("order-1", Utc::now()).await.unwrap();
        let err = tx.delete_by_order("order-1").await.unwrap_err();
        assert!(matches!(err, DispatchError::DeliveryNotFound { .. }));
        tx.commit().await.unwrap();

        let stored = repo.get_by_order("order-1").await.unwrap().unwrap();
        assert!(stored.is_completed());
        assert!(repo.list_active().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_order_is_conflict() {
        let (store, courier) = seeded().await;
        let repo = store.delivery_repository();

        let mut tx = repo.begin().await.unwrap();
        tx.create(&new_delivery(courier.id, "order-1")).await.unwrap();
        let err = tx.create(&new_delivery(courier.id, "order-1")).await.unwrap_err();
        assert!(matches!(err, DispatchError::Conflict(_)));
    }
}
