//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. It holds a value and
//! tracks which computations depend on it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read within a reactive context (effect/computed), the
//!    signal registers that context as a subscriber, and the subscriber
//!    records the signal so it can detach later.
//!
//! 2. When a signal is written with a value different from the current one,
//!    the version is bumped and every subscriber is re-executed.
//!
//! 3. Writes with an equal value do nothing at all.
//!
//! Propagation is synchronous: `set` returns once every triggered execution,
//! including transitive ones, has finished.
//!
//! # Snapshotting
//!
//! Re-executing a subscriber detaches it from this signal and, if it reads
//! the signal again, re-attaches it. The subscriber set is therefore copied
//! before iterating, and the lock is never held while a subscriber runs.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use smallvec::SmallVec;
use tracing::trace;

use super::context::ReactiveContext;
use super::subscriber::{Subscriber, SubscriberSet};
use crate::error::Result;

/// Counter for generating unique signal IDs.
static SIGNAL_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique signal ID.
fn next_signal_id() -> u64 {
    SIGNAL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// A reactive signal holding a value of type T.
///
/// Cloning a signal creates another handle to the same cell.
///
/// # Example
///
/// ```rust
/// use signals_core::reactive::Signal;
///
/// let count = Signal::new(0);
/// count.set(5);
/// assert_eq!(count.get(), 5);
/// assert_eq!(count.version(), 1);
/// ```
pub struct Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Unique identifier for this signal.
    id: u64,

    value: Arc<RwLock<T>>,

    /// Bumped once per write that changed the value.
    version: Arc<AtomicU64>,

    /// Subscribers whose latest execution read this signal.
    subscribers: Arc<SubscriberSet>,
}

impl<T> Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new signal with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            id: next_signal_id(),
            value: Arc::new(RwLock::new(value)),
            version: Arc::new(AtomicU64::new(0)),
            subscribers: Arc::default(),
        }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Number of value changes so far.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Get the current value.
    ///
    /// If called within a reactive context, this also registers the
    /// current computation as a subscriber.
    pub fn get(&self) -> T {
        self.track();
        self.value.read().clone()
    }

    /// Inspect the current value, tracking the read like [`Signal::get`].
    ///
    /// `f` sees a clone and runs after the lock is released, so it may write
    /// to this signal or to anything that writes back to it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.get())
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T {
        self.value.read().clone()
    }

    /// Inspect the current value without tracking dependencies.
    ///
    /// Like [`Signal::with`], `f` never runs under the lock.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.get_untracked())
    }

    /// Get the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Register the current subscriber, if any, in both directions.
    fn track(&self) {
        let Some(subscriber) = ReactiveContext::current_subscriber() else {
            return;
        };
        if subscriber.is_disposed() {
            return;
        }

        let inserted = self
            .subscribers
            .lock()
            .insert(subscriber.id(), Arc::downgrade(&subscriber))
            .is_none();

        if inserted {
            subscriber.track(&self.subscribers);
        }
    }
}

impl<T> Signal<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    /// Set a new value and notify subscribers.
    ///
    /// Nothing happens if the new value equals the current one.
    ///
    /// # Panics
    ///
    /// Panics if a propagation depth limit is configured and the writes
    /// triggered by this one exceed it. Use [`Signal::try_set`] to get the
    /// error instead. Inside an effect the failure is passed on to the
    /// outermost write rather than panicking in place.
    pub fn set(&self, value: T) {
        if let Err(err) = self.try_set(value) {
            ReactiveContext::raise(err);
        }
    }

    /// Set a new value, returning any propagation failure.
    ///
    /// Propagation stops at the first subscriber that fails.
    pub fn try_set(&self, value: T) -> Result<()> {
        if let Some(err) = ReactiveContext::take_error() {
            return Err(err);
        }

        {
            let mut guard = self.value.write();
            if *guard == value {
                return Ok(());
            }
            *guard = value;
        }

        let version = self.version.fetch_add(1, Ordering::AcqRel) + 1;
        self.notify_subscribers(version)
    }

    /// Update the value using a function.
    ///
    /// This is useful for updates that depend on the current value.
    /// `f` runs without the lock held; if it writes back to this signal, the
    /// value it returns still replaces whatever it wrote.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let current = self.get_untracked();
        self.set(f(&current));
    }

    /// Re-execute a snapshot of the current subscribers.
    fn notify_subscribers(&self, version: u64) -> Result<()> {
        let snapshot: SmallVec<[Weak<Subscriber>; 8]> =
            self.subscribers.lock().values().cloned().collect();

        if snapshot.is_empty() {
            return Ok(());
        }

        trace!(
            signal = self.id,
            version,
            subscribers = snapshot.len(),
            "propagating signal change"
        );

        for subscriber in snapshot {
            if let Some(subscriber) = subscriber.upgrade() {
                subscriber.execute()?;
            }
        }

        Ok(())
    }
}

impl<T> Clone for Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            value: Arc::clone(&self.value),
            version: Arc::clone(&self.version),
            subscribers: Arc::clone(&self.subscribers),
        }
    }
}

impl<T> Debug for Signal<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.id)
            .field("value", &self.get_untracked())
            .field("version", &self.version())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
