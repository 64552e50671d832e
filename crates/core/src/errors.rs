use thiserror::Error;

/// Dispatch error taxonomy shared by every crate in the workspace.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("no courier available")]
    NoCourierAvailable,

    #[error("delivery not found for order: {order_id}")]
    DeliveryNotFound { order_id: String },

    #[error("delivery for order {order_id} is already closed")]
    DeliveryAlreadyClosed { order_id: String },

    #[error("courier not found: {id}")]
    CourierNotFound { id: i64 },

    #[error("order not found upstream: {order_id}")]
    OrderNotFound { order_id: String },

    #[error("transient network error: {0}")]
    TransientNetwork(String),

    #[error("upstream rejected request: {0}")]
    UpstreamRejected(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("message queue error: {0}")]
    MessageQueue(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl DispatchError {
    /// Only transient network failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DispatchError::TransientNetwork(_))
    }

    /// True for the "target entity is absent" family.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DispatchError::DeliveryNotFound { .. }
                | DispatchError::CourierNotFound { .. }
                | DispatchError::OrderNotFound { .. }
        )
    }

    pub fn delivery_not_found(order_id: impl Into<String>) -> Self {
        DispatchError::DeliveryNotFound {
            order_id: order_id.into(),
        }
    }
}

impl From<serde_json::Error> for DispatchError {
    fn from(err: serde_json::Error) -> Self {
        DispatchError::Serialization(err.to_string())
    }
}

/// Crate-wide result alias.
pub type DispatchResult<T> = std::result::Result<T, DispatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_errors_are_retryable() {
        assert!(DispatchError::TransientNetwork("reset".into()).is_retryable());
        assert!(!DispatchError::UpstreamRejected("400".into()).is_retryable());
        assert!(!DispatchError::Cancelled.is_retryable());
        assert!(!DispatchError::OrderNotFound {
            order_id: "x".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_not_found_family() {
        assert!(DispatchError::delivery_not_found("o-1").is_not_found());
        assert!(DispatchError::CourierNotFound { id: 7 }.is_not_found());
        assert!(!DispatchError::NoCourierAvailable.is_not_found());
    }
}
