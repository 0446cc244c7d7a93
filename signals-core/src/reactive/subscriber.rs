//! Subscriber types for the reactive system.
//!
//! A Subscriber represents any computation that depends on reactive values:
//! an effect, or the effect hidden inside a computed value.
//!
//! A subscriber keeps weak back-references to the subscriber sets of every
//! signal it read during its last execution. They exist purely so the
//! subscriber can detach itself before re-running or when it is disposed;
//! they never keep a signal alive.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;
use smallvec::SmallVec;
use tracing::warn;

use super::context::ReactiveContext;
use super::runtime::Runtime;
use crate::error::{ReactiveError, Result};

/// The dependents of a single signal, in no particular order.
///
/// Signals only hold weak references: ownership of live subscribers belongs
/// to the [`Runtime`].
pub(crate) type SubscriberSet = Mutex<IndexMap<SubscriberId, Weak<Subscriber>>>;

/// Unique identifier for a subscriber.
///
/// Each subscriber gets a unique ID when created. Signals key their
/// subscriber sets by this ID, which is what keeps a subscriber from being
/// registered twice on the same signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A reactive consumer that re-runs its body when a dependency changes.
pub struct Subscriber {
    id: SubscriberId,

    /// The body to run on every execution.
    run: Box<dyn Fn() + Send + Sync>,

    /// Subscriber sets this subscriber is currently registered in.
    dependencies: Mutex<SmallVec<[Weak<SubscriberSet>; 4]>>,

    disposed: AtomicBool,

    /// Number of completed executions.
    run_count: AtomicUsize,
}

impl Subscriber {
    /// Create a new subscriber with the given body.
    ///
    /// The body does not run until [`Subscriber::execute`] is called.
    pub fn new<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            id: SubscriberId::new(),
            run: Box::new(run),
            dependencies: Mutex::new(SmallVec::new()),
            disposed: AtomicBool::new(false),
            run_count: AtomicUsize::new(0),
        }
    }

    /// Get the subscriber's unique ID.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Re-run the subscriber body.
    ///
    /// The previous dependencies are dropped first, then the body runs with
    /// this subscriber as the current one so that every signal it reads
    /// registers a fresh dependency. The previous current subscriber is
    /// restored afterwards, even if the body panics.
    ///
    /// A disposed subscriber does nothing. If a propagation depth limit is
    /// configured and this execution would exceed it, the body is not run and
    /// [`ReactiveError::CyclicDependency`] is returned.
    pub fn execute(self: &Arc<Self>) -> Result<()> {
        if let Some(err) = ReactiveContext::take_error() {
            return Err(err);
        }
        if self.is_disposed() {
            return Ok(());
        }

        let depth = ReactiveContext::depth();
        if let Some(max_depth) = Runtime::config().max_depth {
            if depth >= max_depth {
                warn!(subscriber = %self.id, depth, "propagation depth limit exceeded");
                return Err(ReactiveError::CyclicDependency {
                    subscriber: self.id,
                    depth,
                });
            }
        }

        self.cleanup();
        {
            let _ctx = ReactiveContext::enter(Arc::clone(self));
            (self.run)();
        }
        self.run_count.fetch_add(1, Ordering::Relaxed);

        // Set by a nested write that hit the depth limit.
        match ReactiveContext::take_error() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Record that this subscriber was just added to `set`.
    ///
    /// Callers only invoke this when the subscriber was newly inserted, so
    /// each set is recorded at most once per execution.
    pub(crate) fn track(&self, set: &Arc<SubscriberSet>) {
        self.dependencies.lock().push(Arc::downgrade(set));
    }

    /// Detach from every recorded dependency and forget them.
    pub(crate) fn cleanup(&self) {
        let dependencies = std::mem::take(&mut *self.dependencies.lock());
        for dependency in dependencies {
            if let Some(set) = dependency.upgrade() {
                set.lock().swap_remove(&self.id);
            }
        }
    }

    /// Permanently stop this subscriber.
    ///
    /// Calling this more than once is a no-op. Outside the crate, go through
    /// [`Effect::dispose`](super::Effect::dispose) so the arena entry is
    /// released too.
    pub(crate) fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
        self.cleanup();
    }

    /// Check if the subscriber has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Get the number of completed executions.
    pub fn run_count(&self) -> usize {
        self.run_count.load(Ordering::Relaxed)
    }

    /// Get the number of signals this subscriber currently depends on.
    pub fn dependency_count(&self) -> usize {
        self.dependencies
            .lock()
            .iter()
            .filter(|dependency| dependency.strong_count() > 0)
            .count()
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicI32;

    fn registered(set: &Arc<SubscriberSet>, subscriber: &Arc<Subscriber>) {
        set.lock()
            .insert(subscriber.id(), Arc::downgrade(subscriber));
        subscriber.track(set);
    }

    #[test]
    fn subscriber_ids_are_unique() {
        let id1 = SubscriberId::new();
        let id2 = SubscriberId::new();
        let id3 = SubscriberId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn subscriber_id_display() {
        let id = SubscriberId::new();
        assert_eq!(id.to_string(), format!("#{}", id.raw()));
    }

    #[test]
    fn execute_runs_body_and_counts() {
        let called = Arc::new(AtomicI32::new(0));
        let called_clone = called.clone();

        let subscriber = Arc::new(Subscriber::new(move || {
            called_clone.fetch_add(1, Ordering::SeqCst);
        }));

        assert_eq!(subscriber.run_count(), 0);
        subscriber.execute().unwrap();
        subscriber.execute().unwrap();

        assert_eq!(called.load(Ordering::SeqCst), 2);
        assert_eq!(subscriber.run_count(), 2);
    }

    #[test]
    fn body_sees_itself_as_current() {
        let seen = Arc::new(Mutex::new(None));
        let seen_clone = seen.clone();

        let subscriber = Arc::new(Subscriber::new(move || {
            *seen_clone.lock() = ReactiveContext::current_subscriber().map(|s| s.id());
        }));
        subscriber.execute().unwrap();

        assert_eq!(*seen.lock(), Some(subscriber.id()));
        assert!(ReactiveContext::current_subscriber().is_none());
    }

    #[test]
    fn cleanup_detaches_from_every_set() {
        let subscriber = Arc::new(Subscriber::new(|| {}));
        let a: Arc<SubscriberSet> = Arc::default();
        let b: Arc<SubscriberSet> = Arc::default();

        registered(&a, &subscriber);
        registered(&b, &subscriber);
        assert_eq!(subscriber.dependency_count(), 2);

        subscriber.cleanup();

        assert!(a.lock().is_empty());
        assert!(b.lock().is_empty());
        assert_eq!(subscriber.dependency_count(), 0);
    }

    #[test]
    fn cleanup_leaves_other_subscribers_in_place() {
        let set: Arc<SubscriberSet> = Arc::default();
        let first = Arc::new(Subscriber::new(|| {}));
        let middle = Arc::new(Subscriber::new(|| {}));
        let last = Arc::new(Subscriber::new(|| {}));
        for subscriber in [&first, &middle, &last] {
            registered(&set, subscriber);
        }

        middle.cleanup();

        let remaining = set.lock();
        assert_eq!(remaining.len(), 2);
        assert!(remaining.contains_key(&first.id()));
        assert!(remaining.contains_key(&last.id()));
        assert!(!remaining.contains_key(&middle.id()));
    }

    #[test]
    fn execute_drops_previous_dependencies() {
        let subscriber = Arc::new(Subscriber::new(|| {}));
        let set: Arc<SubscriberSet> = Arc::default();
        registered(&set, &subscriber);

        // The body reads nothing, so nothing is re-registered.
        subscriber.execute().unwrap();
        assert!(set.lock().is_empty());
    }

    #[test]
    fn dropped_sets_are_not_counted() {
        let subscriber = Arc::new(Subscriber::new(|| {}));
        let set: Arc<SubscriberSet> = Arc::default();
        registered(&set, &subscriber);

        drop(set);
        assert_eq!(subscriber.dependency_count(), 0);
        subscriber.cleanup();
    }

    #[test]
    fn disposed_subscriber_does_not_run() {
        let called = Arc::new(AtomicI32::new(0));
        let called_clone = called.clone();
        let subscriber = Arc::new(Subscriber::new(move || {
            called_clone.fetch_add(1, Ordering::SeqCst);
        }));
        let set: Arc<SubscriberSet> = Arc::default();
        registered(&set, &subscriber);

        subscriber.dispose();
        subscriber.dispose();
        assert!(subscriber.is_disposed());
        assert!(set.lock().is_empty());

        subscriber.execute().unwrap();
        assert_eq!(called.load(Ordering::SeqCst), 0);
    }
}
