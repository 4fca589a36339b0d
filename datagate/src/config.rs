use gateway::{GatewayConfig, ValidationError};
use serde::Deserialize;
use std::fs::File;
use std::path::Path;

#[derive(Deserialize, Debug, PartialEq)]
pub struct MetricsConfig {
    pub statsd_host: String,
    pub statsd_port: u16,
    #[serde(default = "default_metrics_prefix")]
    pub prefix: String,
}

fn default_metrics_prefix() -> String {
    "datagate".to_string()
}

#[derive(Deserialize, Debug, PartialEq)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG` when set.
    #[serde(default = "default_log_level")]
    pub level: String,
    pub sentry_dsn: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Deserialize, Debug, Default)]
pub struct Config {
    #[serde(default)]
    pub gateway: GatewayConfig,
    pub logging: Option<LoggingConfig>,
    pub metrics: Option<MetricsConfig>,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let data = serde_yaml::from_reader(file)?;

        Ok(data)
    }

    /// Loads the optional config file, applies `DATAGATE_*` overrides and validates.
    pub fn load<F>(path: Option<&Path>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        config.gateway.apply_env_overrides(env)?;
        config.gateway.validate()?;

        Ok(config)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    ValidationError(#[from] ValidationError),
}
