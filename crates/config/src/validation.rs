use std::net::SocketAddr;

use crate::{ConfigError, ConfigResult};

/// Trait for configuration validation
pub trait ConfigValidator {
    fn validate(&self) -> ConfigResult<()>;
}

/// General validation utilities
pub struct ValidationUtils;

impl ValidationUtils {
    pub fn validate_not_empty(value: &str, field_name: &str) -> ConfigResult<()> {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "{field_name} cannot be empty"
            )));
        }
        Ok(())
    }

    /// Interval in seconds, between 1 second and 1 hour.
    pub fn validate_interval_seconds(seconds: u64, field_name: &str) -> ConfigResult<()> {
        if seconds == 0 {
            return Err(ConfigError::Validation(format!(
                "{field_name} must be greater than 0"
            )));
        }
        if seconds > 3600 {
            return Err(ConfigError::Validation(format!(
                "{field_name} must be less than or equal to 3600"
            )));
        }
        Ok(())
    }

    pub fn validate_count(count: u64, field_name: &str, max: u64) -> ConfigResult<()> {
        if count == 0 {
            return Err(ConfigError::Validation(format!(
                "{field_name} must be greater than 0"
            )));
        }
        if count > max {
            return Err(ConfigError::Validation(format!(
                "{field_name} must be less than or equal to {max}"
            )));
        }
        Ok(())
    }

    /// Parse `url` and require one of the given schemes.
    pub fn validate_url(url: &str, field_name: &str, schemes: &[&str]) -> ConfigResult<()> {
        Self::validate_not_empty(url, field_name)?;
        let parsed = url::Url::parse(url)
            .map_err(|e| ConfigError::Validation(format!("{field_name} is not a valid URL: {e}")))?;
        if !schemes.contains(&parsed.scheme()) {
            return Err(ConfigError::Validation(format!(
                "{field_name} must use one of the schemes {schemes:?}, got {}",
                parsed.scheme()
            )));
        }
        Ok(())
    }

    pub fn validate_bind_address(address: &str, field_name: &str) -> ConfigResult<()> {
        address.parse::<SocketAddr>().map_err(|e| {
            ConfigError::Validation(format!("{field_name} is not a valid socket address: {e}"))
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_not_empty() {
        assert!(ValidationUtils::validate_not_empty("test", "field").is_ok());
        assert!(ValidationUtils::validate_not_empty("", "field").is_err());
        assert!(ValidationUtils::validate_not_empty("   ", "field").is_err());
    }

    #[test]
    fn test_validate_interval_seconds() {
        assert!(ValidationUtils::validate_interval_seconds(10, "interval").is_ok());
        assert!(ValidationUtils::validate_interval_seconds(3600, "interval").is_ok());
        assert!(ValidationUtils::validate_interval_seconds(0, "interval").is_err());
        assert!(ValidationUtils::validate_interval_seconds(3601, "interval").is_err());
    }

    #[test]
    fn test_validate_count() {
        assert!(ValidationUtils::validate_count(4, "attempts", 20).is_ok());
        assert!(ValidationUtils::validate_count(0, "attempts", 20).is_err());
        assert!(ValidationUtils::validate_count(21, "attempts", 20).is_err());
    }

    #[test]
    fn test_validate_url() {
        let http = ["http", "https"];
        assert!(ValidationUtils::validate_url("http://localhost:8081", "url", &http).is_ok());
        assert!(ValidationUtils::validate_url("https://orders.example.com", "url", &http).is_ok());
        assert!(ValidationUtils::validate_url("amqp://localhost:5672", "url", &http).is_err());
        assert!(ValidationUtils::validate_url("localhost:8081", "url", &http).is_err());
        assert!(ValidationUtils::validate_url("", "url", &http).is_err());
    }

    #[test]
    fn test_validate_bind_address() {
        assert!(ValidationUtils::validate_bind_address("0.0.0.0:8080", "api").is_ok());
        assert!(ValidationUtils::validate_bind_address("localhost", "api").is_err());
    }
}
