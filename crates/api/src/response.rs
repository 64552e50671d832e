use axum::{http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use dispatch_core::{Assignment, Delivery};
use serde::{Deserialize, Serialize};

/// Body of a successful assignment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssignmentResponse {
    pub courier_id: i64,
    pub order_id: String,
    pub transport_type: String,
    pub delivery_deadline: DateTime<Utc>,
}

impl From<Assignment> for AssignmentResponse {
    fn from(assignment: Assignment) -> Self {
        Self {
            courier_id: assignment.courier.id,
            order_id: assignment.delivery.order_id,
            transport_type: assignment.courier.transport_type,
            delivery_deadline: assignment.delivery.deadline,
        }
    }
}

/// Body returned when a delivery is released.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReleaseResponse {
    pub order_id: String,
    pub status: String,
    pub courier_id: i64,
}

impl ReleaseResponse {
    pub fn new(delivery: Delivery, status: &str) -> Self {
        Self {
            order_id: delivery.order_id,
            status: status.to_string(),
            courier_id: delivery.courier_id,
        }
    }
}

pub fn success<T: Serialize>(data: T) -> impl IntoResponse {
    (StatusCode::OK, Json(data))
}

pub fn created<T: Serialize>(data: T) -> impl IntoResponse {
    (StatusCode::CREATED, Json(data))
}

pub fn no_content() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use dispatch_core::{Courier, CourierStatus};

    #[test]
    fn test_assignment_response_fields() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let assignment = Assignment {
            delivery: Delivery {
                id: 1,
                courier_id: 7,
                order_id: "o-1".into(),
                assigned_at: at,
                deadline: at + chrono::Duration::minutes(5),
                completed_at: None,
                expired_at: None,
            },
            courier: Courier {
                id: 7,
                name: "Ivan".into(),
                phone: "+79990000000".into(),
                status: CourierStatus::Busy,
                transport_type: "car".into(),
                created_at: at,
                updated_at: at,
            },
        };

        let body = serde_json::to_value(AssignmentResponse::from(assignment)).unwrap();
        assert_eq!(body["courier_id"], 7);
        assert_eq!(body["order_id"], "o-1");
        assert_eq!(body["transport_type"], "car");
        assert_eq!(body["delivery_deadline"], "2024-05-01T10:05:00Z");
    }
}
