use serde::Deserialize;

use crate::infrastructure::container::Environment;

/// Configuration for the service container
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Environment the composition root registers services for
    #[serde(default)]
    pub environment: Environment,

    /// Key services by their compile-time type id instead of their short name
    #[serde(default)]
    pub type_id_keys: bool,
}

/// Partial service configuration for loading from files
#[derive(Deserialize, Debug, Default)]
pub struct PartialServiceConfig {
    pub environment: Option<Environment>,
    pub type_id_keys: Option<bool>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            type_id_keys: false,
        }
    }
}

impl ServiceConfig {
    /// Create ServiceConfig from partial config with defaults
    pub fn from_partial(partial: Option<PartialServiceConfig>) -> Self {
        let partial = partial.unwrap_or_default();
        Self {
            environment: partial.environment.unwrap_or_default(),
            type_id_keys: partial.type_id_keys.unwrap_or(false),
        }
    }
}
