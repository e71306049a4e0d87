use serde::Deserialize;
use std::{collections::HashMap, path::PathBuf};

use crate::errors::ConfigError;
use crate::infrastructure::container::Environment;

use super::{
    collections_config::{CollectionsConfig, PartialCollectionsConfig},
    loader::ConfigLoader,
    logging_config::{LogConfig, PartialLogConfig},
    service_config::{PartialServiceConfig, ServiceConfig},
};

// Configuration location constants
pub const USER_CONFIG_PATH: &str = "synckit";
pub const CONFIG_FILE_NAME: &str = "config.toml";

// Environment overrides
pub const ENV_ENVIRONMENT: &str = "SYNCKIT_ENVIRONMENT";
pub const ENV_LOG: &str = "SYNCKIT_LOG";

/// Main Application Configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    pub service: ServiceConfig,
    pub logging: LogConfig,
    pub collections: CollectionsConfig,
}

/// Partial Application Configuration for loading from files
#[derive(Deserialize, Debug, Default)]
pub struct PartialAppConfig {
    service: Option<PartialServiceConfig>,
    logging: Option<PartialLogConfig>,
    collections: Option<PartialCollectionsConfig>,
}

impl AppConfig {
    /// Load configuration from the user config directory and environment
    pub fn load() -> Result<Self, ConfigError> {
        ConfigLoader::new().load_config()
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: PathBuf) -> Result<Self, ConfigError> {
        ConfigLoader::with_file(path).load_config()
    }

    /// Create AppConfig from partial config and environment
    pub fn from_partial_and_env(
        partial: Option<PartialAppConfig>,
        env_map: HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let partial = partial.unwrap_or_default();

        let mut service = ServiceConfig::from_partial(partial.service);
        let mut logging = LogConfig::from_partial(partial.logging)?;
        let collections = CollectionsConfig::from_partial(partial.collections);

        if let Some(raw) = env_map.get(ENV_ENVIRONMENT) {
            service.environment = raw.parse::<Environment>().map_err(|_| ConfigError::InvalidValue {
                field: ENV_ENVIRONMENT.to_string(),
                value: raw.clone(),
            })?;
        }
        if let Some(level) = env_map.get(ENV_LOG) {
            logging.level = level.clone();
        }

        Ok(AppConfig {
            service,
            logging,
            collections,
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, name) in [
            ("collections.writer_thread_name", &self.collections.writer_thread_name),
            ("collections.notifier_thread_name", &self.collections.notifier_thread_name),
        ] {
            if name.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: name.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogFormat;

    fn parse(raw: &str) -> PartialAppConfig {
        toml::from_str(raw).unwrap()
    }

    #[test]
    fn test_defaults_when_file_is_empty() {
        let config = AppConfig::from_partial_and_env(Some(parse("")), HashMap::new()).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.service.environment, Environment::Production);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_sections_are_read() {
        let raw = r#"
            [service]
            environment = "test"
            type_id_keys = true

            [logging]
            level = "debug"
            format = "compact"

            [collections]
            writer_thread_name = "inbox-writer"
        "#;
        let config = AppConfig::from_partial_and_env(Some(parse(raw)), HashMap::new()).unwrap();

        assert_eq!(config.service.environment, Environment::Test);
        assert!(config.service.type_id_keys);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert_eq!(config.collections.writer_thread_name, "inbox-writer");
        assert_eq!(config.collections.notifier_thread_name, "synckit-notify");
    }

    #[test]
    fn test_environment_variables_override_file() {
        let raw = r#"
            [service]
            environment = "development"
        "#;
        let env_map = HashMap::from([
            (ENV_ENVIRONMENT.to_string(), "staging".to_string()),
            (ENV_LOG.to_string(), "warn".to_string()),
        ]);
        let config = AppConfig::from_partial_and_env(Some(parse(raw)), env_map).unwrap();
        assert_eq!(config.service.environment, Environment::Staging);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let env_map = HashMap::from([(ENV_ENVIRONMENT.to_string(), "moon".to_string())]);
        let err = AppConfig::from_partial_and_env(None, env_map).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let raw = r#"
            [logging]
            format = "xml"
        "#;
        let err = AppConfig::from_partial_and_env(Some(parse(raw)), HashMap::new()).unwrap_err();
        assert_eq!(format!("{}", err), "Invalid value 'xml' for 'logging.format'");
    }

    #[test]
    fn test_validate_rejects_blank_thread_names() {
        let mut config = AppConfig::default();
        assert!(config.validate().is_ok());
        config.collections.writer_thread_name = "  ".to_string();
        assert!(config.validate().is_err());
    }
}
