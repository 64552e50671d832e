use chrono::{DateTime, Duration, Utc};
use dispatch_core::models::TransportMode;

/// Time a courier gets to deliver, by transport.
pub fn delivery_budget(transport_type: &str) -> Duration {
    match TransportMode::parse(transport_type) {
        TransportMode::Car => Duration::minutes(5),
        TransportMode::Scooter => Duration::minutes(15),
        TransportMode::OnFoot | TransportMode::Other => Duration::minutes(30),
    }
}

pub fn deadline_for(transport_type: &str, assigned_at: DateTime<Utc>) -> DateTime<Utc> {
    assigned_at + delivery_budget(transport_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_per_transport() {
        assert_eq!(delivery_budget("car"), Duration::minutes(5));
        assert_eq!(delivery_budget("scooter"), Duration::minutes(15));
        assert_eq!(delivery_budget("on_foot"), Duration::minutes(30));
        assert_eq!(delivery_budget("bicycle"), Duration::minutes(30));
        assert_eq!(delivery_budget(""), Duration::minutes(30));
    }

    #[test]
    fn test_budget_ignores_case() {
        assert_eq!(delivery_budget("CAR"), Duration::minutes(5));
        assert_eq!(delivery_budget(" Scooter "), Duration::minutes(15));
    }

    #[test]
    fn test_deadline_is_offset_from_assignment() {
        let at = Utc::now();
        assert_eq!(deadline_for("car", at), at + Duration::minutes(5));
    }
}
