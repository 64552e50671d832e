use crate::validation::{ConfigValidator, ValidationUtils};
use serde::{Deserialize, Serialize};

/// Background loops of the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    pub sweeper_enabled: bool,
    pub sweep_interval_seconds: u64,
    pub poller_enabled: bool,
    pub poll_interval_seconds: u64,
    pub consumer_enabled: bool,
    /// Idle wait between consume calls when the queue is empty.
    pub consumer_poll_interval_ms: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            sweeper_enabled: true,
            sweep_interval_seconds: 10,
            poller_enabled: true,
            poll_interval_seconds: 5,
            consumer_enabled: false,
            consumer_poll_interval_ms: 500,
        }
    }
}

impl ConfigValidator for DispatcherConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        ValidationUtils::validate_interval_seconds(
            self.sweep_interval_seconds,
            "dispatcher.sweep_interval_seconds",
        )?;
        ValidationUtils::validate_interval_seconds(
            self.poll_interval_seconds,
            "dispatcher.poll_interval_seconds",
        )?;
        ValidationUtils::validate_count(
            self.consumer_poll_interval_ms,
            "dispatcher.consumer_poll_interval_ms",
            60_000,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatcher_config_defaults() {
        let config = DispatcherConfig::default();
        assert_eq!(config.sweep_interval_seconds, 10);
        assert_eq!(config.poll_interval_seconds, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_dispatcher_config_validation() {
        let mut invalid_config = DispatcherConfig::default();
        invalid_config.sweep_interval_seconds = 0;
        assert!(invalid_config.validate().is_err());

        let mut invalid_config = DispatcherConfig::default();
        invalid_config.consumer_poll_interval_ms = 0;
        assert!(invalid_config.validate().is_err());
    }
}
