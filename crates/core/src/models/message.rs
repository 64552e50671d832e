use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

use super::OrderEvent;

/// Transport envelope handed out by a `MessageQueue`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    pub retry_count: i32,
    pub correlation_id: Option<String>,
}

impl Message {
    pub fn new(payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            payload,
            timestamp: Utc::now(),
            retry_count: 0,
            correlation_id: None,
        }
    }

    pub fn order_event(event: &OrderEvent) -> Self {
        let payload = serde_json::to_value(event).unwrap_or(serde_json::Value::Null);
        Self::new(payload).with_correlation_id(event.order_id.clone())
    }

    pub fn with_correlation_id(mut self, correlation_id: String) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    pub fn increment_retry(&mut self) {
        self.retry_count += 1;
    }

    /// Decode the payload into a typed body.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.payload)
    }

    pub fn serialize_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_event_message_decodes_back() {
        let event = OrderEvent::new("order-7");
        let message = Message::order_event(&event);
        assert_eq!(message.correlation_id.as_deref(), Some("order-7"));
        assert_eq!(message.decode::<OrderEvent>().unwrap(), event);
    }

    #[test]
    fn test_decode_rejects_foreign_payload() {
        let message = Message::new(serde_json::Value::String("garbage".into()));
        assert!(message.decode::<OrderEvent>().is_err());
    }
}
