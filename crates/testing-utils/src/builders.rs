//! Test data builders with sensible defaults.

use chrono::{DateTime, Duration, Utc};
use dispatch_core::models::{Courier, CourierStatus, Delivery, NewCourier, OrderEvent, OrderSummary};

/// Builder for `Courier` rows and `NewCourier` payloads
pub struct CourierBuilder {
    courier: Courier,
}

impl CourierBuilder {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            courier: Courier {
                id: 1,
                name: "Test Courier".to_string(),
                phone: "+70000000000".to_string(),
                status: CourierStatus::Available,
                transport_type: "on_foot".to_string(),
                created_at: now,
                updated_at: now,
            },
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.courier.id = id;
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.courier.name = name.to_string();
        self
    }

    pub fn with_phone(mut self, phone: &str) -> Self {
        self.courier.phone = phone.to_string();
        self
    }

    pub fn with_transport(mut self, transport_type: &str) -> Self {
        self.courier.transport_type = transport_type.to_string();
        self
    }

    pub fn busy(mut self) -> Self {
        self.courier.status = CourierStatus::Busy;
        self
    }

    pub fn build(self) -> Courier {
        self.courier
    }

    /// Registration payload carrying the same fields.
    pub fn build_new(self) -> NewCourier {
        NewCourier {
            name: self.courier.name,
            phone: self.courier.phone,
            transport_type: self.courier.transport_type,
        }
    }
}

impl Default for CourierBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `Delivery` rows
pub struct DeliveryBuilder {
    delivery: Delivery,
}

impl DeliveryBuilder {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            delivery: Delivery {
                id: 1,
                courier_id: 1,
                order_id: "order-1".to_string(),
                assigned_at: now,
                deadline: now + Duration::minutes(30),
                completed_at: None,
                expired_at: None,
            },
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.delivery.id = id;
        self
    }

    pub fn with_courier(mut self, courier_id: i64) -> Self {
        self.delivery.courier_id = courier_id;
        self
    }

    pub fn with_order(mut self, order_id: &str) -> Self {
        self.delivery.order_id = order_id.to_string();
        self
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.delivery.deadline = deadline;
        self
    }

    pub fn completed_at(mut self, at: DateTime<Utc>) -> Self {
        self.delivery.completed_at = Some(at);
        self
    }

    pub fn build(self) -> Delivery {
        self.delivery
    }
}

impl Default for DeliveryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn order_summary(id: &str, created_at: DateTime<Utc>) -> OrderSummary {
    OrderSummary {
        id: id.to_string(),
        created_at,
    }
}

pub fn order_event(order_id: &str, status: &str) -> OrderEvent {
    OrderEvent {
        order_id: order_id.to_string(),
        status: Some(status.to_string()),
        created_at: None,
    }
}
