use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Binding of one order to one courier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Delivery {
    pub id: i64,
    pub courier_id: i64,
    pub order_id: String,
    pub assigned_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub expired_at: Option<DateTime<Utc>>,
}

/// A delivery that has not been stored yet.
#[derive(Debug, Clone)]
pub struct NewDelivery {
    pub courier_id: i64,
    pub order_id: String,
    pub assigned_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
}

impl Delivery {
    /// Neither completed nor reclaimed by the sweeper.
    pub fn is_active(&self) -> bool {
        self.completed_at.is_none() && self.expired_at.is_none()
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && self.deadline < now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn delivery(deadline: DateTime<Utc>) -> Delivery {
        Delivery {
            id: 1,
            courier_id: 1,
            order_id: "order-1".to_string(),
            assigned_at: deadline - Duration::minutes(5),
            deadline,
            completed_at: None,
            expired_at: None,
        }
    }

    #[test]
    fn test_overdue_only_while_active() {
        let now = Utc::now();
        let mut d = delivery(now - Duration::seconds(1));
        assert!(d.is_overdue(now));

        d.completed_at = Some(now);
        assert!(!d.is_active());
        assert!(!d.is_overdue(now));
    }
}
