use crate::validation::{ConfigValidator, ValidationUtils};
use serde::{Deserialize, Serialize};

/// Upstream order service client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub base_url: String,
    /// Total attempts per call, the first one included.
    pub max_attempts: u32,
    /// First backoff delay; doubles on every retry.
    pub base_delay_ms: u64,
    pub request_timeout_seconds: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8081".to_string(),
            max_attempts: 4,
            base_delay_ms: 100,
            request_timeout_seconds: 5,
        }
    }
}

impl ConfigValidator for GatewayConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        ValidationUtils::validate_url(&self.base_url, "gateway.base_url", &["http", "https"])?;
        ValidationUtils::validate_count(self.max_attempts as u64, "gateway.max_attempts", 20)?;
        ValidationUtils::validate_count(self.base_delay_ms, "gateway.base_delay_ms", 60_000)?;
        ValidationUtils::validate_interval_seconds(
            self.request_timeout_seconds,
            "gateway.request_timeout_seconds",
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.max_attempts, 4);
        assert_eq!(config.base_delay_ms, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_gateway_validation() {
        let mut config = GatewayConfig::default();
        config.base_url = "orders.local".to_string();
        assert!(config.validate().is_err());

        let mut config = GatewayConfig::default();
        config.max_attempts = 0;
        assert!(config.validate().is_err());
    }
}
