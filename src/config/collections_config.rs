use serde::Deserialize;

/// Configuration for thread-safe collections
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CollectionsConfig {
    /// Name of the thread each container applies its writes on
    #[serde(default = "default_writer_thread_name")]
    pub writer_thread_name: String,

    /// Name of the thread completion callbacks are delivered on
    #[serde(default = "default_notifier_thread_name")]
    pub notifier_thread_name: String,
}

/// Partial collections configuration for loading from files
#[derive(Deserialize, Debug, Default)]
pub struct PartialCollectionsConfig {
    pub writer_thread_name: Option<String>,
    pub notifier_thread_name: Option<String>,
}

impl Default for CollectionsConfig {
    fn default() -> Self {
        Self {
            writer_thread_name: default_writer_thread_name(),
            notifier_thread_name: default_notifier_thread_name(),
        }
    }
}

impl CollectionsConfig {
    /// Create CollectionsConfig from partial config with defaults
    pub fn from_partial(partial: Option<PartialCollectionsConfig>) -> Self {
        let partial = partial.unwrap_or_default();
        Self {
            writer_thread_name: partial
                .writer_thread_name
                .unwrap_or_else(default_writer_thread_name),
            notifier_thread_name: partial
                .notifier_thread_name
                .unwrap_or_else(default_notifier_thread_name),
        }
    }
}

fn default_writer_thread_name() -> String {
    crate::collections::synchronized_vec::DEFAULT_WRITER_THREAD.to_string()
}

fn default_notifier_thread_name() -> String {
    "synckit-notify".to_string()
}
