//! Reactive Primitives
//!
//! This module implements the core reactive system: signals, computed values
//! and effects.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. When a signal's value is read
//! within a tracking context (an effect, or the effect inside a computed), the
//! signal automatically registers that context as a dependent. When the
//! signal's value changes, all dependents re-run before `set` returns.
//!
//! ## Computed
//!
//! A Computed is a read-only derived value. It wraps a signal together with
//! an effect that keeps the signal up to date.
//!
//! ## Effects
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change. Every run rediscovers its dependencies from scratch.
//!
//! # Implementation Notes
//!
//! The reactive system uses a thread-local tracking context to automatically
//! detect dependencies. When a signal is read, we check if there is an active
//! tracking context and, if so, register the dependency.
//!
//! Propagation is synchronous and unscheduled: there is no batching and no
//! topological ordering. A computed that depends on two signals written one
//! after the other recomputes twice and may briefly observe the first write
//! without the second.

mod signal;
mod context;
mod subscriber;
mod computed;
mod effect;
mod runtime;

pub use signal::Signal;
pub use context::{untrack, ReactiveContext};
pub use subscriber::{Subscriber, SubscriberId};
pub use computed::Computed;
pub use effect::Effect;
pub use runtime::{Runtime, RuntimeConfig};
