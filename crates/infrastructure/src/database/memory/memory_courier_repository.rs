use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dispatch_core::{
    models::{Courier, CourierStatus, CourierUpdate, NewCourier},
    traits::CourierRepository,
    DispatchError, DispatchResult,
};
use tracing::debug;

use super::MemoryStore;

/// In-memory courier directory
#[derive(Debug, Clone)]
pub struct InMemoryCourierRepository {
    store: MemoryStore,
}

impl InMemoryCourierRepository {
    pub fn new(store: MemoryStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CourierRepository for InMemoryCourierRepository {
    async fn create(&self, courier: &NewCourier) -> DispatchResult<Courier> {
        let created = self.store.state().lock().await.insert_courier(courier)?;
        debug!(courier_id = created.id, "courier created");
        Ok(created)
    }

    async fn get_by_id(&self, id: i64) -> DispatchResult<Option<Courier>> {
        Ok(self.store.state().lock().await.courier(id).cloned())
    }

    async fn list(&self) -> DispatchResult<Vec<Courier>> {
        Ok(self.store.state().lock().await.couriers().cloned().collect())
    }

    async fn update(&self, update: &CourierUpdate) -> DispatchResult<Courier> {
        let mut state = self.store.state().lock().await;
        if let Some(phone) = &update.phone {
            if state.phone_taken_by_other(phone, update.id) {
                return Err(DispatchError::Conflict(format!(
                    "courier with phone {phone} already exists"
                )));
            }
        }
        let courier = state.courier_mut(update.id)?;
        update.apply_to(courier);
        courier.updated_at = Utc::now();
        Ok(courier.clone())
    }

    async fn find_available(&self) -> DispatchResult<Option<Courier>> {
        Ok(self.store.state().lock().await.least_loaded_available())
    }

    async fn set_status(&self, id: i64, status: CourierStatus) -> DispatchResult<()> {
        self.store.state().lock().await.set_status(id, status)
    }

    async fn release_expired(&self, now: DateTime<Utc>) -> DispatchResult<u64> {
        Ok(self.store.state().lock().await.release_expired(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use dispatch_core::{models::NewDelivery, traits::DeliveryRepository};

    fn new_courier(phone: &str, transport: &str) -> NewCourier {
        NewCourier {
            name: format!("courier {phone}"),
            phone: phone.to_string(),
            transport_type: transport.to_string(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_phone_is_conflict() {
        let repo = MemoryStore::new().courier_repository();
        repo.create(&new_courier("+70000000001", "car")).await.unwrap();

        let err = repo
            .create(&new_courier("+70000000001", "scooter"))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_missing_courier_is_not_found() {
        let repo = MemoryStore::new().courier_repository();
        let err = repo
            .update(&CourierUpdate {
                id: 99,
                name: Some("x".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::CourierNotFound { id: 99 }));
    }

    #[tokio::test]
    async fn test_find_available_prefers_least_loaded_then_lowest_id() {
        let store = MemoryStore::new();
        let couriers = store.courier_repository();
        let deliveries = store.delivery_repository();

        let first = couriers.create(&new_courier("+70000000001", "car")).await.unwrap();
        let second = couriers.create(&new_courier("+70000000002", "car")).await.unwrap();

        assert_eq!(couriers.find_available().await.unwrap().unwrap().id, first.id);

        // An active delivery counts as load even on an available row.
        let now = Utc::now();
        let mut tx = deliveries.begin().await.unwrap();
        tx.create(&NewDelivery {
            courier_id: first.id,
            order_id: "old".into(),
            assigned_at: now - Duration::hours(1),
            deadline: now - Duration::minutes(30),
        })
        .await
        .unwrap();
        tx.commit().await.unwrap();
        assert_eq!(couriers.find_available().await.unwrap().unwrap().id, second.id);

        // Once expired it is no longer held.
        couriers.release_expired(now).await.unwrap();
        assert_eq!(couriers.find_available().await.unwrap().unwrap().id, first.id);
    }

    #[tokio::test]
    async fn test_release_expired_is_idempotent() {
        let store = MemoryStore::new();
        let couriers = store.courier_repository();
        let deliveries = store.delivery_repository();
        let courier = couriers.create(&new_courier("+70000000001", "car")).await.unwrap();

        let now = Utc::now();
        let mut tx = deliveries.begin().await.unwrap();
        tx.create(&NewDelivery {
            courier_id: courier.id,
            order_id: "late".into(),
            assigned_at: now - Duration::minutes(10),
            deadline: now - Duration::minutes(5),
        })
        .await
        .unwrap();
        tx.set_courier_status(courier.id, CourierStatus::Busy).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(couriers.release_expired(now).await.unwrap(), 1);
        assert_eq!(couriers.release_expired(now).await.unwrap(), 0);

        let courier = couriers.get_by_id(courier.id).await.unwrap().unwrap();
        assert_eq!(courier.status, CourierStatus::Available);
        assert!(deliveries.list_active().await.unwrap().is_empty());
    }
}
