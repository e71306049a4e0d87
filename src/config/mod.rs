pub mod app_config;
pub mod collections_config;
pub mod loader;
pub mod logging_config;
pub mod service_config;

// Re-export commonly used types
pub use app_config::AppConfig;
pub use collections_config::CollectionsConfig;
pub use loader::ConfigLoader;
pub use logging_config::LogConfig;
pub use service_config::ServiceConfig;

// Re-export constants
pub use app_config::{CONFIG_FILE_NAME, ENV_ENVIRONMENT, ENV_LOG, USER_CONFIG_PATH};
