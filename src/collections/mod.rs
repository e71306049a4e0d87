//! Thread-safe collections.

pub mod notifier;
pub mod synchronized_vec;

pub use notifier::{Callback, Notifier, TaskNotifier, ThreadNotifier};
pub use synchronized_vec::{Completion, SequenceOptions, SynchronizedVec};
