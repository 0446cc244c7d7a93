//! Signals Core
//!
//! This crate provides a minimal fine-grained reactive runtime.
//! It implements:
//!
//! - Reactive primitives (signals, computed values, effects)
//! - Automatic dependency discovery with dynamic re-subscription
//! - Synchronous change propagation
//!
//! # Architecture
//!
//! The crate is organized into two modules:
//!
//! - `reactive`: Core reactive primitives and dependency tracking
//! - `error`: Errors surfaced by the runtime
//!
//! The free functions at the crate root mirror the three constructors most
//! callers need.
//!
//! # Example
//!
//! ```rust
//! use std::sync::atomic::{AtomicI32, Ordering};
//! use std::sync::Arc;
//! use signals_core::{computed, effect, signal};
//!
//! // Create a signal
//! let count = signal(0);
//!
//! // Create a derived value
//! let count_clone = count.clone();
//! let doubled = computed(move || count_clone.get() * 2);
//!
//! // Create an effect
//! let seen = Arc::new(AtomicI32::new(0));
//! let seen_clone = seen.clone();
//! let doubled_clone = doubled.clone();
//! let dispose = effect(move || {
//!     seen_clone.store(doubled_clone.get(), Ordering::SeqCst);
//! });
//!
//! // Update the signal; the effect runs before `set` returns
//! count.set(5);
//! assert_eq!(seen.load(Ordering::SeqCst), 10);
//!
//! dispose.dispose();
//! ```

pub mod error;
pub mod reactive;

pub use error::{ReactiveError, Result};
pub use reactive::{untrack, Computed, Effect, Signal};

/// Create a signal holding `initial`.
pub fn signal<T>(initial: T) -> Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    Signal::new(initial)
}

/// Create an effect and run it once.
///
/// The returned handle disposes the effect; dropping it does not.
pub fn effect<F>(run: F) -> Effect
where
    F: Fn() + Send + Sync + 'static,
{
    Effect::new(run)
}

/// Create a computed value and compute it once.
pub fn computed<T, F>(compute: F) -> Computed<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
    F: Fn() -> T + Send + Sync + 'static,
{
    Computed::new(compute)
}
