//! Effect Implementation
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately to establish
//!    initial dependencies.
//!
//! 2. When any dependency changes to a different value, the effect re-runs
//!    synchronously, inside the write that changed it.
//!
//! 3. Before re-running, the effect detaches from all of its old
//!    dependencies and tracks new ones during execution. Dependencies are
//!    therefore dynamic: a branch that is not taken is not subscribed to.
//!
//! # Lifetime
//!
//! The [`Effect`] handle is a disposer. Dropping it does not stop the
//! effect; the [`Runtime`] keeps it alive until [`Effect::dispose`] is
//! called.
//!
//! # Re-entrancy
//!
//! An effect that writes to a signal it depends on re-runs itself from
//! inside that write. Without a configured depth limit nothing stops this
//! recursion; it ends only when a write produces an equal value.

use std::sync::Arc;

use tracing::debug;

use super::context::ReactiveContext;
use super::runtime::Runtime;
use super::subscriber::{Subscriber, SubscriberId};
use crate::error::Result;

/// A side-effecting computation that runs when dependencies change.
///
/// # Example
///
/// ```rust
/// use std::sync::atomic::{AtomicI32, Ordering};
/// use std::sync::Arc;
/// use signals_core::reactive::{Effect, Signal};
///
/// let count = Signal::new(0);
/// let seen = Arc::new(AtomicI32::new(-1));
///
/// let count_clone = count.clone();
/// let seen_clone = seen.clone();
/// let effect = Effect::new(move || {
///     seen_clone.store(count_clone.get(), Ordering::SeqCst);
/// });
///
/// count.set(5);
/// assert_eq!(seen.load(Ordering::SeqCst), 5);
///
/// effect.dispose();
/// count.set(6);
/// assert_eq!(seen.load(Ordering::SeqCst), 5);
/// ```
#[derive(Clone)]
pub struct Effect {
    subscriber: Arc<Subscriber>,
}

impl Effect {
    /// Create a new effect with the given function.
    ///
    /// The function runs immediately to establish initial dependencies.
    ///
    /// # Panics
    ///
    /// Panics if a propagation depth limit is configured and the first run
    /// exceeds it. See [`Effect::try_new`].
    pub fn new<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let effect = Self::register(run);
        if let Err(err) = effect.subscriber.execute() {
            effect.dispose();
            ReactiveContext::raise(err);
        }
        effect
    }

    /// Create a new effect, returning any failure of its first run.
    ///
    /// A failed effect is disposed before the error is returned.
    pub fn try_new<F>(run: F) -> Result<Self>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let effect = Self::register(run);
        if let Err(err) = effect.subscriber.execute() {
            effect.dispose();
            return Err(err);
        }
        Ok(effect)
    }

    fn register<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let subscriber = Arc::new(Subscriber::new(run));
        Runtime::register(Arc::clone(&subscriber));
        debug!(effect = %subscriber.id(), "effect created");
        Self { subscriber }
    }

    /// Get the subscriber ID for this effect.
    pub fn id(&self) -> SubscriberId {
        self.subscriber.id()
    }

    /// Dispose of the effect.
    ///
    /// The effect detaches from every signal it depends on and will not run
    /// again, even if a write already in progress was about to run it.
    /// Calling this more than once is a no-op.
    pub fn dispose(&self) {
        if let Some(subscriber) = Runtime::unregister(self.id()) {
            subscriber.dispose();
            debug!(effect = %subscriber.id(), runs = subscriber.run_count(), "effect disposed");
        }
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.subscriber.is_disposed()
    }

    /// Get the number of times the effect has run.
    pub fn run_count(&self) -> usize {
        self.subscriber.run_count()
    }

    /// Get the number of signals the effect currently depends on.
    pub fn dependency_count(&self) -> usize {
        self.subscriber.dependency_count()
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.id())
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
