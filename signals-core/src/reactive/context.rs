//! Reactive Context
//!
//! The reactive context tracks which computation is currently running.
//! This enables automatic dependency tracking: when a signal is read,
//! the current computation is registered as a dependent.
//!
//! # Implementation
//!
//! We use a thread-local stack to track the currently executing computation.
//! Entering a context pushes an entry onto the stack and returns a guard;
//! dropping the guard pops it again. Because the pop happens in `Drop`, the
//! previous computation is restored on every exit path, including unwinding
//! out of a panicking effect.
//!
//! An entry may also be empty, which is how [`untrack`] hides the current
//! computation from reads performed inside it.
//!
//! Propagation is synchronous and re-entrant, so the stack depth is also the
//! number of nested executions. The optional depth limit uses it, together
//! with a per-thread slot holding an error that is waiting to surface at the
//! outermost write.

use std::cell::{Cell, RefCell};
use std::sync::Arc;

use super::subscriber::{Subscriber, SubscriberId};
use crate::error::ReactiveError;

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<ContextEntry>> = RefCell::new(Vec::new());

    /// Number of entries on the stack that carry a subscriber.
    static DEPTH: Cell<usize> = Cell::new(0);

    /// Error raised by a nested write, waiting for the outermost caller.
    static PENDING_ERROR: RefCell<Option<ReactiveError>> = RefCell::new(None);
}

/// An entry in the reactive context stack.
struct ContextEntry {
    /// The running computation, or `None` inside an untracked scope.
    subscriber: Option<Arc<Subscriber>>,
}

/// Guard that pops the context when dropped.
pub struct ReactiveContext {
    subscriber_id: Option<SubscriberId>,
}

impl ReactiveContext {
    /// Enter a new reactive context for the given subscriber.
    ///
    /// While this context is active, any signals that are read will
    /// register the subscriber as a dependent.
    pub fn enter(subscriber: Arc<Subscriber>) -> Self {
        let subscriber_id = Some(subscriber.id());
        CONTEXT_STACK.with(|stack| {
            stack.borrow_mut().push(ContextEntry {
                subscriber: Some(subscriber),
            });
        });
        DEPTH.with(|depth| depth.set(depth.get() + 1));

        Self { subscriber_id }
    }

    /// Enter a context in which reads are not tracked.
    pub fn enter_untracked() -> Self {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow_mut()
                .push(ContextEntry { subscriber: None });
        });

        Self {
            subscriber_id: None,
        }
    }

    /// Check if reads are currently being tracked.
    pub fn is_active() -> bool {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .is_some_and(|entry| entry.subscriber.is_some())
        })
    }

    /// Get the subscriber reads are currently attributed to, if any.
    pub fn current_subscriber() -> Option<Arc<Subscriber>> {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .and_then(|entry| entry.subscriber.clone())
        })
    }

    /// Number of subscriber executions currently nested on this thread.
    pub fn depth() -> usize {
        DEPTH.with(Cell::get)
    }

    /// Hold `err` until the enclosing execution finishes.
    ///
    /// Only the first error is kept.
    pub(crate) fn defer_error(err: ReactiveError) {
        PENDING_ERROR.with(|pending| {
            pending.borrow_mut().get_or_insert(err);
        });
    }

    /// Take the pending error, if any.
    pub(crate) fn take_error() -> Option<ReactiveError> {
        PENDING_ERROR.with(|pending| pending.borrow_mut().take())
    }

    /// Surface an error from an infallible entry point.
    ///
    /// Inside an execution the error is deferred so it unwinds through the
    /// enclosing propagation. At the outermost level there is no caller left
    /// to hand it to.
    ///
    /// # Panics
    ///
    /// Panics with the error message when no execution is in progress.
    pub(crate) fn raise(err: ReactiveError) {
        if Self::depth() > 0 {
            Self::defer_error(err);
        } else {
            panic!("{err}");
        }
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        let popped = CONTEXT_STACK.with(|stack| stack.borrow_mut().pop());

        if let Some(entry) = popped {
            // Verify we're popping the right context.
            debug_assert_eq!(
                entry.subscriber.as_ref().map(|s| s.id()),
                self.subscriber_id,
                "ReactiveContext mismatch"
            );

            if entry.subscriber.is_some() {
                let remaining = DEPTH.with(|depth| {
                    let remaining = depth.get().saturating_sub(1);
                    depth.set(remaining);
                    remaining
                });

                // A panic abandons the propagation, and its pending error with it.
                if remaining == 0 && std::thread::panicking() {
                    PENDING_ERROR.with(|pending| pending.borrow_mut().take());
                }
            }
        }
    }
}

/// Run `f` without tracking any signal it reads.
///
/// The current subscriber is restored afterwards.
pub fn untrack<R>(f: impl FnOnce() -> R) -> R {
    let _ctx = ReactiveContext::enter_untracked();
    f()
}
