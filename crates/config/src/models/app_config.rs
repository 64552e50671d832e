use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{
    api_observability::{ApiConfig, ObservabilityConfig},
    database::DatabaseConfig,
    dispatcher::DispatcherConfig,
    gateway::GatewayConfig,
    message_queue::MessageQueueConfig,
};
use crate::{validation::ConfigValidator, ConfigError, ConfigResult};

/// Environment variable prefix; nested keys are separated by `__`, e.g.
/// `DISPATCH_GATEWAY__BASE_URL`.
pub const ENV_PREFIX: &str = "DISPATCH";

const DEFAULT_CONFIG_PATHS: [&str; 3] = [
    "config/dispatch.toml",
    "dispatch.toml",
    "/etc/courier-dispatch/config.toml",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub message_queue: MessageQueueConfig,
    pub dispatcher: DispatcherConfig,
    pub gateway: GatewayConfig,
    pub api: ApiConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Built-in defaults, overlaid by the TOML file (explicit path or the
    /// first default path that exists), overlaid by `DISPATCH_*` variables.
    pub fn load(config_path: Option<&str>) -> ConfigResult<Self> {
        let defaults = ConfigBuilder::try_from(&Self::default())?;
        let mut builder = ConfigBuilder::builder().add_source(defaults);

        match config_path {
            Some(path) => {
                if !Path::new(path).exists() {
                    return Err(ConfigError::File(format!("config file not found: {path}")));
                }
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            }
            None => {
                if let Some(path) = DEFAULT_CONFIG_PATHS.iter().find(|p| Path::new(p).exists()) {
                    builder = builder.add_source(File::new(path, FileFormat::Toml));
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(toml_str: &str) -> ConfigResult<Self> {
        let config: AppConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl ConfigValidator for AppConfig {
    fn validate(&self) -> ConfigResult<()> {
        self.database.validate()?;
        self.message_queue.validate()?;
        self.dispatcher.validate()?;
        self.gateway.validate()?;
        self.api.validate()?;
        self.observability.validate()?;
        Ok(())
    }
}
