pub mod collections;
pub mod config;
pub mod errors;
pub mod infrastructure;
pub mod logging;

// Re-export commonly used items for convenience
pub use collections::{Notifier, SynchronizedVec, ThreadNotifier};
pub use config::AppConfig;
pub use errors::{AppError, ContainerError, SequenceError};
pub use infrastructure::{Environment, ServiceContainer, ServiceType};
