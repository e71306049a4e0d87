use serde::Deserialize;

use crate::errors::ConfigError;
use crate::logging::LogFormat;

/// Configuration for log output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// `EnvFilter` directive, e.g. `info` or `synckit=debug,warn`
    pub level: String,
    pub format: LogFormat,
}

/// Partial logging configuration for loading from files
#[derive(Deserialize, Debug, Default)]
pub struct PartialLogConfig {
    pub level: Option<String>,
    pub format: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl LogConfig {
    pub fn from_partial(partial: Option<PartialLogConfig>) -> Result<Self, ConfigError> {
        let partial = partial.unwrap_or_default();
        let format = match partial.format.as_deref() {
            None => LogFormat::Pretty,
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                field: "logging.format".to_string(),
                value: raw.to_string(),
            })?,
        };
        Ok(Self {
            level: partial.level.unwrap_or_else(|| "info".to_string()),
            format,
        })
    }
}
