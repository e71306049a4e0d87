use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Container error: {0}")]
    Container(#[from] ContainerError),
    #[error("Sequence error: {0}")]
    Sequence(#[from] SequenceError),
    #[error("Logging initialization failed: {0}")]
    Logging(String),
    #[error("Application error: {0}")]
    Generic(String), // For simple string-based errors
}

/// Errors surfaced by the service container.
///
/// Only one failure is recoverable: asking for a service that was never
/// registered (or whose entry holds a different type under the same key).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContainerError {
    #[error("unregistered dependency: {type_name}")]
    Unregistered { type_name: String },
}

impl ContainerError {
    pub fn unregistered(type_name: impl Into<String>) -> Self {
        ContainerError::Unregistered {
            type_name: type_name.into(),
        }
    }

    /// The short name of the service that could not be resolved.
    pub fn type_name(&self) -> &str {
        match self {
            ContainerError::Unregistered { type_name } => type_name,
        }
    }
}

/// Contract violations and setup failures of [`crate::collections::SynchronizedVec`].
#[derive(Debug, Error)]
pub enum SequenceError {
    #[error("{operation}: index {index} out of bounds for length {len}")]
    IndexOutOfBounds {
        operation: &'static str,
        index: usize,
        len: usize,
    },
    #[error("{operation}: write panicked: {message}")]
    WriterPanicked {
        operation: &'static str,
        message: String,
    },
    #[error("{operation}: notifier panicked while posting completion: {message}")]
    NotifierPanicked {
        operation: &'static str,
        message: String,
    },
    #[error("failed to spawn thread '{0}': {1}")]
    Spawn(String, #[source] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read file '{0}': {1}")]
    FileRead(String, #[source] std::io::Error),
    #[error("Failed to parse TOML from file '{0}': {1}")]
    TomlParse(String, #[source] toml::de::Error),
    #[error("Invalid value '{value}' for '{field}'")]
    InvalidValue { field: String, value: String },
    #[error("Other Config Error: {0}")]
    Other(String),
}

pub fn config_error(msg: impl Into<String>) -> ConfigError {
    ConfigError::Other(msg.into())
}

/// Extracts a readable message from a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
