//! Computed Implementation
//!
//! A Computed is a read-only derived value. It is built from two pieces:
//!
//! - an inner [`Signal`] holding the latest result, and
//! - an [`Effect`] that re-evaluates the computation and writes the result
//!   into that signal whenever one of its dependencies changes.
//!
//! Readers only ever see the signal side, so reading a computed from another
//! effect subscribes to it exactly like reading a signal, and changes
//! propagate along signal -> computed -> effect chains.
//!
//! Because the inner signal only notifies when its value actually changes,
//! a recomputation that produces an equal result does not wake downstream
//! readers.
//!
//! Computation is eager: the effect runs during construction and again on
//! every upstream change, whether or not anybody reads the result. Dropping
//! the last handle disposes the effect.

use std::fmt::Debug;
use std::sync::Arc;

use super::effect::Effect;
use super::signal::Signal;
use super::subscriber::SubscriberId;
use crate::error::Result;

/// Disposes the inner effect once no handle refers to it.
struct Owner(Effect);

impl Drop for Owner {
    fn drop(&mut self) {
        self.0.dispose();
    }
}

/// A derived value that recomputes when its dependencies change.
///
/// Cloning a computed creates another handle to the same derived cell.
/// When the last handle is dropped the computation stops and its
/// subscriptions are released, as if [`Computed::dispose`] had been called.
/// A computed read inside another computation stays alive as long as that
/// computation holds a handle to it.
///
/// # Example
///
/// ```rust
/// use signals_core::reactive::{Computed, Signal};
///
/// let count = Signal::new(1);
/// let count_clone = count.clone();
/// let doubled = Computed::new(move || count_clone.get() * 2);
///
/// assert_eq!(doubled.get(), 2);
/// count.set(5);
/// assert_eq!(doubled.get(), 10);
/// ```
pub struct Computed<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    /// `None` only until the first run of `effect`, which happens in `new`.
    value: Signal<Option<T>>,

    owner: Arc<Owner>,
}

impl<T> Computed<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    /// Create a new computed value.
    ///
    /// The computation runs once immediately.
    ///
    /// # Panics
    ///
    /// Panics under the same conditions as [`Effect::new`].
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let value = Signal::new(None);
        let target = value.clone();
        let effect = Effect::new(move || {
            target.set(Some(compute()));
        });

        Self::from_parts(value, effect)
    }

    /// Create a new computed value, returning any failure of its first run.
    pub fn try_new<F>(compute: F) -> Result<Self>
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let value = Signal::new(None);
        let target = value.clone();
        let effect = Effect::try_new(move || {
            target.set(Some(compute()));
        })?;

        Ok(Self::from_parts(value, effect))
    }

    fn from_parts(value: Signal<Option<T>>, effect: Effect) -> Self {
        Self {
            value,
            owner: Arc::new(Owner(effect)),
        }
    }

    /// Get the id of the effect that recomputes this value.
    pub fn id(&self) -> SubscriberId {
        self.owner.0.id()
    }

    /// Get the current value.
    ///
    /// If called within a reactive context, the caller is subscribed to
    /// this computed value.
    ///
    /// # Panics
    ///
    /// Panics if the first computation never completed, which can only
    /// happen when [`Computed::new`] was called inside an effect and hit the
    /// propagation depth limit.
    pub fn get(&self) -> T {
        self.value
            .get()
            .expect("computed value is produced during construction")
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T {
        self.value
            .get_untracked()
            .expect("computed value is produced during construction")
    }

    /// Number of times the derived value has changed, including the first
    /// computation.
    pub fn version(&self) -> u64 {
        self.value.version()
    }

    /// Stop recomputing.
    ///
    /// The last computed value stays readable. Calling this more than once
    /// is a no-op.
    pub fn dispose(&self) {
        self.owner.0.dispose();
    }

    /// Check if the computation has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.owner.0.is_disposed()
    }
}

impl<T> Clone for Computed<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            owner: Arc::clone(&self.owner),
        }
    }
}

impl<T> Debug for Computed<T>
where
    T: Clone + Send + Sync + PartialEq + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Computed")
            .field("value", &self.value.get_untracked())
            .field("version", &self.version())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
