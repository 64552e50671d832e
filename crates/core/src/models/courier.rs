use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A courier known to the directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Courier {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub status: CourierStatus,
    pub transport_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Courier availability
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CourierStatus {
    Available,
    Busy,
}

impl CourierStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourierStatus::Available => "available",
            CourierStatus::Busy => "busy",
        }
    }
}

impl fmt::Display for CourierStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CourierStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "available" => Ok(CourierStatus::Available),
            "busy" => Ok(CourierStatus::Busy),
            other => Err(format!("invalid courier status: {other}")),
        }
    }
}

impl sqlx::Type<sqlx::Postgres> for CourierStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        sqlx::postgres::PgTypeInfo::with_name("VARCHAR")
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <&str as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for CourierStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(s.parse::<CourierStatus>()?)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Postgres> for CourierStatus {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <&str as sqlx::Encode<sqlx::Postgres>>::encode(self.as_str(), buf)
    }
}

/// Transport modes the deadline policy distinguishes. Anything else falls
/// into `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    Car,
    Scooter,
    OnFoot,
    Other,
}

impl TransportMode {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "car" => TransportMode::Car,
            "scooter" => TransportMode::Scooter,
            "on_foot" => TransportMode::OnFoot,
            _ => TransportMode::Other,
        }
    }
}

/// Payload for registering a courier. New couriers always start
/// `available`; status only moves through dispatch and expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCourier {
    pub name: String,
    pub phone: String,
    #[serde(default = "default_transport")]
    pub transport_type: String,
}

fn default_transport() -> String {
    "on_foot".to_string()
}

impl NewCourier {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name must not be empty".to_string());
        }
        if self.phone.trim().is_empty() {
            return Err("phone must not be empty".to_string());
        }
        if self.transport_type.trim().is_empty() {
            return Err("transport_type must not be empty".to_string());
        }
        Ok(())
    }
}

/// Partial update; absent fields are left untouched. Status is not
/// updatable here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CourierUpdate {
    pub id: i64,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub transport_type: Option<String>,
}

impl CourierUpdate {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err("name must not be empty".to_string());
            }
        }
        if let Some(phone) = &self.phone {
            if phone.trim().is_empty() {
                return Err("phone must not be empty".to_string());
            }
        }
        Ok(())
    }

    pub fn apply_to(&self, courier: &mut Courier) {
        if let Some(name) = &self.name {
            courier.name = name.clone();
        }
        if let Some(phone) = &self.phone {
            courier.phone = phone.clone();
        }
        if let Some(transport) = &self.transport_type {
            courier.transport_type = transport.clone();
        }
    }
}

impl Courier {
    pub fn is_available(&self) -> bool {
        self.status == CourierStatus::Available
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_mode_parsing() {
        assert_eq!(TransportMode::parse("car"), TransportMode::Car);
        assert_eq!(TransportMode::parse(" Scooter "), TransportMode::Scooter);
        assert_eq!(TransportMode::parse("on_foot"), TransportMode::OnFoot);
        assert_eq!(TransportMode::parse("bicycle"), TransportMode::Other);
    }

    #[test]
    fn test_new_courier_validation() {
        let mut courier = NewCourier {
            name: "Ivan".to_string(),
            phone: "+79991234567".to_string(),
            transport_type: "car".to_string(),
        };
        assert!(courier.validate().is_ok());

        courier.phone = "  ".to_string();
        assert!(courier.validate().is_err());

        courier.phone = "123".to_string();
        courier.name = String::new();
        assert!(courier.validate().is_err());
    }

    #[test]
    fn test_update_applies_only_present_fields() {
        let now = Utc::now();
        let mut courier = Courier {
            id: 1,
            name: "Old".to_string(),
            phone: "+70000000000".to_string(),
            status: CourierStatus::Available,
            transport_type: "car".to_string(),
            created_at: now,
            updated_at: now,
        };
        let update = CourierUpdate {
            id: 1,
            name: Some("New".to_string()),
            ..Default::default()
        };
        update.apply_to(&mut courier);
        assert_eq!(courier.name, "New");
        assert_eq!(courier.transport_type, "car");
    }

    #[test]
    fn test_payloads_ignore_status() {
        let new: NewCourier =
            serde_json::from_str(r#"{"name":"Ivan","phone":"1","status":"busy"}"#).unwrap();
        assert_eq!(new.transport_type, "on_foot");

        let now = Utc::now();
        let mut courier = Courier {
            id: 1,
            name: "Ivan".to_string(),
            phone: "1".to_string(),
            status: CourierStatus::Busy,
            transport_type: "car".to_string(),
            created_at: now,
            updated_at: now,
        };
        let update: CourierUpdate =
            serde_json::from_str(r#"{"id":1,"status":"available"}"#).unwrap();
        update.apply_to(&mut courier);
        assert_eq!(courier.status, CourierStatus::Busy);
    }

    #[test]
    fn test_status_serde_is_lowercase() {
        let json = serde_json::to_string(&CourierStatus::Busy).unwrap();
        assert_eq!(json, "\"busy\"");
        assert_eq!("AVAILABLE".parse::<CourierStatus>().unwrap(), CourierStatus::Available);
    }
}
