use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order status as reported by the upstream order source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderStatus {
    Created,
    Cancelled,
    Completed,
    /// Any value the dispatcher has no transition for. Carries the raw text.
    Unrecognized(String),
}

impl OrderStatus {
    /// Case-insensitive; accepts both `cancelled` and `canceled`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "created" => OrderStatus::Created,
            "cancelled" | "canceled" => OrderStatus::Cancelled,
            "completed" => OrderStatus::Completed,
            _ => OrderStatus::Unrecognized(raw.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Completed)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Created => f.write_str("created"),
            OrderStatus::Cancelled => f.write_str("cancelled"),
            OrderStatus::Completed => f.write_str("completed"),
            OrderStatus::Unrecognized(raw) => write!(f, "unrecognized({raw})"),
        }
    }
}

/// One entry of the upstream "orders since" feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderSummary {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

/// Order change notification from the event feed. Only `order_id` is
/// trusted; the status is always re-resolved upstream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderEvent {
    pub order_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl OrderEvent {
    pub fn new(order_id: impl Into<String>) -> Self {
        Self {
            order_id: order_id.into(),
            status: None,
            created_at: None,
        }
    }
}
