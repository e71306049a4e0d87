//! A thread-safe, ordered, mutable sequence.
//!
//! Reads run on the calling thread under a shared lock and block until every
//! write enqueued before them has been applied. Writes are queued to a
//! dedicated writer thread and applied one at a time, in enqueue order, under
//! the exclusive lock; the caller returns as soon as the write is queued.
//! Optional completion callbacks are posted to a [`Notifier`] after the write
//! commits.
//!
//! Closures passed to reads run while the shared lock is held, and the
//! `remove_where` predicate runs on the writer thread under the exclusive
//! lock. Neither may call back into the same container.

use std::fmt;
use std::ops::{AddAssign, SubAssign};
use std::panic::AssertUnwindSafe;
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex, RwLock};

use super::notifier::{Callback, Notifier, ThreadNotifier};
use crate::config::CollectionsConfig;
use crate::errors::{panic_message, SequenceError};

/// Completion handler receiving what a write removed.
pub type Completion<A> = Box<dyn FnOnce(A) + Send + 'static>;

type Apply<T> = Box<dyn FnOnce(&mut Vec<T>) -> Result<Option<Callback>, SequenceError> + Send>;

pub const DEFAULT_WRITER_THREAD: &str = "synckit-writer";

/// Construction options shared by a container and the containers derived from it.
#[derive(Clone)]
pub struct SequenceOptions {
    pub writer_thread_name: String,
    pub notifier: Arc<dyn Notifier>,
}

impl Default for SequenceOptions {
    fn default() -> Self {
        Self {
            writer_thread_name: DEFAULT_WRITER_THREAD.to_string(),
            notifier: ThreadNotifier::main(),
        }
    }
}

impl SequenceOptions {
    /// Build options from configuration, starting a dedicated notifier thread.
    pub fn from_config(config: &CollectionsConfig) -> Result<Self, SequenceError> {
        let notifier = ThreadNotifier::spawn(&config.notifier_thread_name)?;
        Ok(Self {
            writer_thread_name: config.writer_thread_name.clone(),
            notifier: Arc::new(notifier),
        })
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }
}

struct WriteJob<T> {
    operation: &'static str,
    apply: Apply<T>,
}

struct WriteQueue<T> {
    tx: Option<mpsc::Sender<WriteJob<T>>>,
    /// Number of writes handed to the writer thread so far.
    enqueued: u64,
}

struct Shared<T> {
    items: RwLock<Vec<T>>,
    /// Number of writes the writer thread has finished (applied or rejected).
    applied: Mutex<u64>,
    applied_cv: Condvar,
    violation: Mutex<Option<Arc<SequenceError>>>,
}

impl<T> Shared<T> {
    fn mark_applied(&self) {
        let mut applied = self.applied.lock();
        *applied += 1;
        self.applied_cv.notify_all();
    }

    fn wait_for(&self, target: u64) {
        let mut applied = self.applied.lock();
        while *applied < target {
            self.applied_cv.wait(&mut applied);
        }
    }

    fn record_violation(&self, err: SequenceError) {
        let mut violation = self.violation.lock();
        if violation.is_none() {
            *violation = Some(Arc::new(err));
        }
    }
}

/// A thread-safe vector with blocking reads and queued, ordered writes.
pub struct SynchronizedVec<T> {
    shared: Arc<Shared<T>>,
    queue: Mutex<WriteQueue<T>>,
    options: SequenceOptions,
    writer: Option<JoinHandle<()>>,
}

impl<T: Send + Sync + 'static> SynchronizedVec<T> {
    /// Create an empty container using the default options.
    ///
    /// # Panics
    /// Panics if the writer thread cannot be spawned.
    pub fn new() -> Self {
        Self::with_options(Vec::new(), SequenceOptions::default())
    }

    /// # Panics
    /// Panics if the writer thread cannot be spawned.
    pub fn with_options(items: Vec<T>, options: SequenceOptions) -> Self {
        Self::try_with_options(items, options).unwrap_or_else(|e| panic!("{e}"))
    }

    pub fn try_with_options(items: Vec<T>, options: SequenceOptions) -> Result<Self, SequenceError> {
        let shared = Arc::new(Shared {
            items: RwLock::new(items),
            applied: Mutex::new(0),
            applied_cv: Condvar::new(),
            violation: Mutex::new(None),
        });
        let (tx, rx) = mpsc::channel::<WriteJob<T>>();

        let writer = {
            let shared = shared.clone();
            let notifier = options.notifier.clone();
            thread::Builder::new()
                .name(options.writer_thread_name.clone())
                .spawn(move || run_writer(shared, rx, notifier))
                .map_err(|e| SequenceError::Spawn(options.writer_thread_name.clone(), e))?
        };

        Ok(Self {
            shared,
            queue: Mutex::new(WriteQueue {
                tx: Some(tx),
                enqueued: 0,
            }),
            options,
            writer: Some(writer),
        })
    }

    /// The contract violation recorded by the writer thread, if any.
    pub fn violation(&self) -> Option<Arc<SequenceError>> {
        self.shared.violation.lock().clone()
    }

    fn ensure_healthy(&self) {
        let violation = self.shared.violation.lock().as_ref().map(|e| e.to_string());
        if let Some(message) = violation {
            panic!("synchronized vec poisoned by an earlier write: {message}");
        }
    }

    fn enqueue<F>(&self, operation: &'static str, apply: F)
    where
        F: FnOnce(&mut Vec<T>) -> Result<Option<Callback>, SequenceError> + Send + 'static,
    {
        self.ensure_healthy();
        let mut queue = self.queue.lock();
        let job = WriteJob {
            operation,
            apply: Box::new(apply),
        };
        let sent = queue
            .tx
            .as_ref()
            .map(|tx| tx.send(job).is_ok())
            .unwrap_or(false);
        if sent {
            queue.enqueued += 1;
        } else {
            tracing::warn!(operation, "write queue closed; write dropped");
        }
    }

    fn read<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        let target = self.queue.lock().enqueued;
        self.shared.wait_for(target);
        self.ensure_healthy();
        let items = self.shared.items.read();
        f(&items)
    }

    fn derive(&self, items: Vec<T>) -> Self {
        Self::with_options(items, self.options.clone())
    }

    /// Block until every write enqueued so far has been applied.
    pub fn flush(&self) {
        let target = self.queue.lock().enqueued;
        self.shared.wait_for(target);
        self.ensure_healthy();
    }

    // ---- reads ----

    pub fn count(&self) -> usize {
        self.read(|items| items.len())
    }

    pub fn len(&self) -> usize {
        self.count()
    }

    pub fn is_empty(&self) -> bool {
        self.read(|items| items.is_empty())
    }

    pub fn first_where<P>(&self, mut predicate: P) -> Option<T>
    where
        P: FnMut(&T) -> bool,
        T: Clone,
    {
        self.read(|items| items.iter().find(|item| predicate(*item)).cloned())
    }

    /// Elements matching `predicate`, in order, as a new container.
    pub fn filter<P>(&self, mut predicate: P) -> Self
    where
        P: FnMut(&T) -> bool,
        T: Clone,
    {
        let kept = self.read(|items| items.iter().filter(|item| predicate(*item)).cloned().collect());
        self.derive(kept)
    }

    pub fn index_where<P>(&self, predicate: P) -> Option<usize>
    where
        P: FnMut(&T) -> bool,
    {
        self.read(|items| items.iter().position(predicate))
    }

    /// A sorted copy of the elements as a new container.
    pub fn sorted_by<F>(&self, compare: F) -> Self
    where
        F: FnMut(&T, &T) -> std::cmp::Ordering,
        T: Clone,
    {
        let mut sorted = self.to_vec();
        sorted.sort_by(compare);
        self.derive(sorted)
    }

    pub fn map<U, F>(&self, transform: F) -> Vec<U>
    where
        F: FnMut(&T) -> U,
    {
        self.read(|items| items.iter().map(transform).collect())
    }

    pub fn filter_map<U, F>(&self, transform: F) -> Vec<U>
    where
        F: FnMut(&T) -> Option<U>,
    {
        self.read(|items| items.iter().filter_map(transform).collect())
    }

    pub fn for_each<F>(&self, body: F)
    where
        F: FnMut(&T),
    {
        self.read(|items| items.iter().for_each(body))
    }

    pub fn contains_where<P>(&self, predicate: P) -> bool
    where
        P: FnMut(&T) -> bool,
    {
        self.read(|items| items.iter().any(predicate))
    }

    // ---- writes ----

    pub fn append(&self, element: T) {
        self.enqueue("append", move |items| {
            items.push(element);
            Ok(None)
        });
    }

    pub fn extend<I>(&self, elements: I)
    where
        I: IntoIterator<Item = T>,
    {
        let elements: Vec<T> = elements.into_iter().collect();
        self.enqueue("extend", move |items| {
            items.extend(elements);
            Ok(None)
        });
    }

    /// Insert at `index`; `index == len` appends. An index past the end is a
    /// contract violation and poisons the container.
    pub fn insert(&self, element: T, index: usize) {
        self.enqueue("insert", move |items| {
            if index > items.len() {
                return Err(SequenceError::IndexOutOfBounds {
                    operation: "insert",
                    index,
                    len: items.len(),
                });
            }
            items.insert(index, element);
            Ok(None)
        });
    }

    /// Replace the element at `index`. An invalid index poisons the container.
    pub fn set(&self, index: usize, element: T) {
        self.enqueue("set", move |items| {
            let len = items.len();
            let slot = items.get_mut(index).ok_or(SequenceError::IndexOutOfBounds {
                operation: "set",
                index,
                len,
            })?;
            *slot = element;
            Ok(None)
        });
    }

    /// Remove the element at `index` and hand it to `on_complete`.
    /// An invalid index poisons the container.
    pub fn remove_at(&self, index: usize, on_complete: Option<Completion<T>>) {
        self.enqueue("remove_at", move |items| {
            if index >= items.len() {
                return Err(SequenceError::IndexOutOfBounds {
                    operation: "remove_at",
                    index,
                    len: items.len(),
                });
            }
            let removed = items.remove(index);
            Ok(on_complete.map(|done| -> Callback { Box::new(move || done(removed)) }))
        });
    }

    /// Remove every element matching `predicate`, preserving the order of the rest.
    pub fn remove_where<P>(&self, mut predicate: P, on_complete: Option<Completion<Vec<T>>>)
    where
        P: FnMut(&T) -> bool + Send + 'static,
    {
        self.enqueue("remove_where", move |items| {
            // Evaluate the predicate fully before touching storage, so a
            // panicking predicate leaves the sequence unchanged.
            let hits: Vec<bool> = items.iter().map(|item| predicate(item)).collect();
            let mut removed = Vec::new();
            if hits.contains(&true) {
                let mut kept = Vec::with_capacity(items.len());
                for (item, hit) in items.drain(..).zip(hits) {
                    if hit {
                        removed.push(item);
                    } else {
                        kept.push(item);
                    }
                }
                *items = kept;
            }
            Ok(on_complete.map(|done| -> Callback { Box::new(move || done(removed)) }))
        });
    }

    pub fn remove_all(&self, on_complete: Option<Completion<Vec<T>>>) {
        self.enqueue("remove_all", move |items| {
            let removed = std::mem::take(items);
            Ok(on_complete.map(|done| -> Callback { Box::new(move || done(removed)) }))
        });
    }
}

impl<T: Clone + Send + Sync + 'static> SynchronizedVec<T> {
    pub fn first(&self) -> Option<T> {
        self.read(|items| items.first().cloned())
    }

    pub fn last(&self) -> Option<T> {
        self.read(|items| items.last().cloned())
    }

    /// The element at `index`, or `None` when out of bounds.
    pub fn get(&self, index: usize) -> Option<T> {
        self.read(|items| items.get(index).cloned())
    }

    /// A snapshot of the current elements.
    pub fn to_vec(&self) -> Vec<T> {
        self.read(|items| items.to_vec())
    }
}

impl<T: PartialEq + Send + Sync + 'static> SynchronizedVec<T> {
    pub fn contains(&self, element: &T) -> bool {
        self.read(|items| items.contains(element))
    }

    pub fn index_of(&self, element: &T) -> Option<usize> {
        self.read(|items| items.iter().position(|item| item == element))
    }

    /// Remove the first element equal to `element`; no-op when absent.
    /// `on_complete` runs either way.
    pub fn remove(&self, element: T, on_complete: Option<Callback>) {
        self.enqueue("remove", move |items| {
            if let Some(index) = items.iter().position(|item| *item == element) {
                items.remove(index);
            }
            Ok(on_complete)
        });
    }
}

fn run_writer<T>(shared: Arc<Shared<T>>, rx: mpsc::Receiver<WriteJob<T>>, notifier: Arc<dyn Notifier>) {
    while let Ok(WriteJob { operation, apply }) = rx.recv() {
        let outcome = {
            let mut items = shared.items.write();
            std::panic::catch_unwind(AssertUnwindSafe(|| apply(&mut items))).unwrap_or_else(|payload| {
                Err(SequenceError::WriterPanicked {
                    operation,
                    message: panic_message(payload.as_ref()),
                })
            })
        };

        let outcome = match outcome {
            Ok(Some(callback)) => std::panic::catch_unwind(AssertUnwindSafe(|| notifier.post(callback)))
                .map_err(|payload| SequenceError::NotifierPanicked {
                    operation,
                    message: panic_message(payload.as_ref()),
                }),
            Ok(None) => Ok(()),
            Err(err) => Err(err),
        };
        if let Err(err) = outcome {
            tracing::error!(operation, error = %err, "rejected write to synchronized vec");
            shared.record_violation(err);
        }
        shared.mark_applied();
    }
    tracing::debug!("synchronized vec writer stopped");
}

impl<T> Drop for SynchronizedVec<T> {
    fn drop(&mut self) {
        // Close the queue, let the writer drain it, then release the storage.
        self.queue.get_mut().tx.take();
        if let Some(writer) = self.writer.take() {
            // Dropped from inside a write job or callback on the writer
            // itself; the thread exits once the queue is drained.
            if writer.thread().id() == thread::current().id() {
                return;
            }
            if writer.join().is_err() {
                tracing::error!("synchronized vec writer panicked during shutdown");
            }
        }
    }
}

impl<T: Send + Sync + 'static> Default for SynchronizedVec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync + 'static> From<Vec<T>> for SynchronizedVec<T> {
    fn from(items: Vec<T>) -> Self {
        Self::with_options(items, SequenceOptions::default())
    }
}

impl<T: Send + Sync + 'static> FromIterator<T> for SynchronizedVec<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<T>>())
    }
}

impl<T: fmt::Debug + Send + Sync + 'static> fmt::Debug for SynchronizedVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.read(|items| f.debug_list().entries(items.iter()).finish())
    }
}

impl<T: Send + Sync + 'static> AddAssign<T> for SynchronizedVec<T> {
    fn add_assign(&mut self, element: T) {
        self.append(element);
    }
}

impl<T: Send + Sync + 'static> AddAssign<Vec<T>> for SynchronizedVec<T> {
    fn add_assign(&mut self, elements: Vec<T>) {
        self.extend(elements);
    }
}

impl<T: PartialEq + Send + Sync + 'static> SubAssign<T> for SynchronizedVec<T> {
    fn sub_assign(&mut self, element: T) {
        self.remove(element, None);
    }
}
