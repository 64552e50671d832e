use std::sync::Arc;

use dispatch_core::{
    models::Courier,
    traits::{CourierRepository, DeliveryRepository},
};
use dispatch_infrastructure::MemoryStore;

use crate::builders::CourierBuilder;

/// In-memory repositories sharing one store.
pub struct TestStore {
    pub store: MemoryStore,
    pub couriers: Arc<dyn CourierRepository>,
    pub deliveries: Arc<dyn DeliveryRepository>,
}

impl TestStore {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        Self {
            couriers: Arc::new(store.courier_repository()),
            deliveries: Arc::new(store.delivery_repository()),
            store,
        }
    }

    /// Register `count` available couriers using `transport_type`.
    pub async fn seed_couriers(&self, count: usize, transport_type: &str) -> Vec<Courier> {
        let mut seeded = Vec::with_capacity(count);
        for n in 0..count {
            let courier = CourierBuilder::new()
                .with_name(&format!("courier-{n}"))
                .with_phone(&format!("+7900{n:07}"))
                .with_transport(transport_type)
                .build_new();
            seeded.push(
                self.couriers
                    .create(&courier)
                    .await
                    .expect("seeding courier"),
            );
        }
        seeded
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}
