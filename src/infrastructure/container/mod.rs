//! Container module

pub mod environment;
pub mod key;
pub mod registry;

pub use environment::Environment;
pub use key::{short_type_name, KeyStrategy, ServiceKey, TypeDescriptor, TypeIdKey, TypeNameKey};
pub use registry::{ContainerStats, ServiceContainer};

// Lifecycle enum kept at container module level so the registry can reference it via `super::ServiceLifetime`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceLifetime {
    /// Stored by `register`, replaced by every later `register`
    Registered,
    /// Stored by `singleton`, reused until unregistered or the environment changes
    Singleton,
}
