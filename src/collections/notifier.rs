//! Execution contexts for write-completion callbacks.
//!
//! A [`SynchronizedVec`](super::SynchronizedVec) never runs caller callbacks on
//! its writer thread. Once a mutation commits, the callback is posted to a
//! [`Notifier`], which owns its own execution context and runs callbacks in
//! the order they were posted.

use std::panic::AssertUnwindSafe;
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};

use lazy_static::lazy_static;

use crate::errors::{panic_message, SequenceError};

/// A callback posted to a notifier.
pub type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Default name of the process-wide callback thread.
pub const MAIN_NOTIFIER_THREAD: &str = "synckit-main";

lazy_static! {
    static ref MAIN_NOTIFIER: Arc<ThreadNotifier> = Arc::new(
        ThreadNotifier::spawn(MAIN_NOTIFIER_THREAD)
            .unwrap_or_else(|e| panic!("cannot start main notifier: {e}"))
    );
}

/// A context that runs posted callbacks, one at a time, in FIFO order.
pub trait Notifier: Send + Sync {
    fn post(&self, callback: Callback);
}

fn run_guarded(context: &str, callback: Callback) {
    if let Err(payload) = std::panic::catch_unwind(AssertUnwindSafe(callback)) {
        tracing::error!(
            context,
            panic = %panic_message(payload.as_ref()),
            "completion callback panicked"
        );
    }
}

/// Notifier backed by a dedicated OS thread.
pub struct ThreadNotifier {
    name: String,
    tx: Option<mpsc::Sender<Callback>>,
    handle: Option<JoinHandle<()>>,
}

impl ThreadNotifier {
    /// Spawn a new callback thread with the given name.
    pub fn spawn(name: &str) -> Result<Self, SequenceError> {
        let (tx, rx) = mpsc::channel::<Callback>();
        let thread_name = name.to_string();
        let handle = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                while let Ok(callback) = rx.recv() {
                    run_guarded(&thread_name, callback);
                }
                tracing::debug!(thread = %thread_name, "notifier thread stopped");
            })
            .map_err(|e| SequenceError::Spawn(name.to_string(), e))?;

        Ok(Self {
            name: name.to_string(),
            tx: Some(tx),
            handle: Some(handle),
        })
    }

    /// The process-wide default context, playing the role of the UI-owning thread.
    ///
    /// Started lazily on first use; panics if the thread cannot be spawned.
    pub fn main() -> Arc<dyn Notifier> {
        MAIN_NOTIFIER.clone()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Notifier for ThreadNotifier {
    fn post(&self, callback: Callback) {
        let sent = self
            .tx
            .as_ref()
            .map(|tx| tx.send(callback).is_ok())
            .unwrap_or(false);
        if !sent {
            tracing::warn!(thread = %self.name, "notifier closed; dropping callback");
        }
    }
}

impl Drop for ThreadNotifier {
    fn drop(&mut self) {
        // Closing the channel lets the thread drain what is queued and exit.
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                tracing::error!(thread = %self.name, "notifier thread panicked");
            }
        }
    }
}

/// Notifier backed by a single tokio task, for hosts that already run a runtime.
pub struct TaskNotifier {
    tx: tokio::sync::mpsc::UnboundedSender<Callback>,
}

impl TaskNotifier {
    /// Spawn the callback task on `handle`.
    pub fn spawn(handle: &tokio::runtime::Handle) -> Self {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Callback>();
        handle.spawn(async move {
            while let Some(callback) = rx.recv().await {
                run_guarded("task-notifier", callback);
            }
        });
        Self { tx }
    }

    /// Spawn on the runtime of the calling context.
    ///
    /// Panics when called outside of a tokio runtime.
    pub fn current() -> Self {
        Self::spawn(&tokio::runtime::Handle::current())
    }
}

impl Notifier for TaskNotifier {
    fn post(&self, callback: Callback) {
        if self.tx.send(callback).is_err() {
            tracing::warn!("notifier task closed; dropping callback");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_thread_notifier_runs_in_order_on_its_thread() {
        let notifier = ThreadNotifier::spawn("notifier-order-test").unwrap();
        let (tx, rx) = mpsc::channel();
        for i in 0..20 {
            let tx = tx.clone();
            notifier.post(Box::new(move || {
                let name = thread::current().name().map(str::to_string);
                tx.send((i, name)).unwrap();
            }));
        }

        for expected in 0..20 {
            let (i, name) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
            assert_eq!(i, expected);
            assert_eq!(name.as_deref(), Some("notifier-order-test"));
        }
    }

    #[test]
    fn test_thread_notifier_survives_panicking_callback() {
        let notifier = ThreadNotifier::spawn("notifier-panic-test").unwrap();
        let (tx, rx) = mpsc::channel();
        notifier.post(Box::new(|| panic!("callback failure")));
        notifier.post(Box::new(move || tx.send("still alive").unwrap()));

        assert_eq!(
            rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            "still alive"
        );
    }

    #[test]
    fn test_drop_drains_pending_callbacks() {
        let (tx, rx) = mpsc::channel();
        {
            let notifier = ThreadNotifier::spawn("notifier-drain-test").unwrap();
            for i in 0..5 {
                let tx = tx.clone();
                notifier.post(Box::new(move || tx.send(i).unwrap()));
            }
        }
        let received: Vec<i32> = rx.try_iter().collect();
        assert_eq!(received, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_task_notifier_preserves_order() {
        let notifier = TaskNotifier::current();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        for i in 0..10 {
            let tx = tx.clone();
            notifier.post(Box::new(move || {
                tx.send(i).unwrap();
            }));
        }

        for expected in 0..10 {
            assert_eq!(rx.recv().await, Some(expected));
        }
    }
}
