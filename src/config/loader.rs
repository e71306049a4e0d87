use std::{collections::HashMap, env, fs, path::PathBuf};

use crate::errors::ConfigError;

use super::app_config::{
    AppConfig, PartialAppConfig, CONFIG_FILE_NAME, ENV_ENVIRONMENT, ENV_LOG, USER_CONFIG_PATH,
};

/// Configuration loader responsible for loading config from files and environment
pub struct ConfigLoader {
    file: Option<PathBuf>,
    read_env: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new config loader using the user config directory
    pub fn new() -> Self {
        Self {
            file: None,
            read_env: true,
        }
    }

    /// Create a config loader for an explicit file (also used for testing)
    pub fn with_file(file: PathBuf) -> Self {
        Self {
            file: Some(file),
            read_env: true,
        }
    }

    /// Skip environment variable overrides
    pub fn without_env(mut self) -> Self {
        self.read_env = false;
        self
    }

    /// Load complete application configuration
    pub fn load_config(&self) -> Result<AppConfig, ConfigError> {
        let partial = match self.config_path() {
            Some(path) if path.exists() => Some(self.load_partial_config(&path)?),
            Some(path) => {
                tracing::info!("配置文件 {:?} 不存在，使用默认配置", path);
                None
            }
            None => {
                tracing::warn!("无法确定用户配置目录，使用默认配置");
                None
            }
        };

        let config = AppConfig::from_partial_and_env(partial, self.collect_env_vars())?;
        config.validate()?;
        Ok(config)
    }

    /// Path of the configuration file this loader reads
    pub fn config_path(&self) -> Option<PathBuf> {
        match &self.file {
            Some(file) => Some(file.clone()),
            None => dirs::config_dir().map(|dir| dir.join(USER_CONFIG_PATH).join(CONFIG_FILE_NAME)),
        }
    }

    fn load_partial_config(&self, path: &PathBuf) -> Result<PartialAppConfig, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string_lossy().to_string(), e))?;
        let partial = toml::from_str(&content)
            .map_err(|e| ConfigError::TomlParse(path.to_string_lossy().to_string(), e))?;
        tracing::debug!("已加载配置文件: {:?}", path);
        Ok(partial)
    }

    fn collect_env_vars(&self) -> HashMap<String, String> {
        if !self.read_env {
            return HashMap::new();
        }
        [ENV_ENVIRONMENT, ENV_LOG]
            .into_iter()
            .filter_map(|key| env::var(key).ok().map(|value| (key.to_string(), value)))
            .collect()
    }
}
