//! Tests for the optional propagation depth limit.
//!
//! The limit is process-wide, so these tests live in their own binary where
//! every test installs the same configuration.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use signals_core::reactive::{Effect, ReactiveContext, Runtime, RuntimeConfig, Signal};
use signals_core::ReactiveError;

const MAX_DEPTH: usize = 8;

fn configure() {
    Runtime::configure(RuntimeConfig::with_max_depth(MAX_DEPTH)).unwrap();
}

fn assert_context_is_clean() {
    assert!(ReactiveContext::current_subscriber().is_none());
    assert_eq!(ReactiveContext::depth(), 0);
}

#[test]
fn self_feeding_effect_is_rejected() {
    configure();
    let s = Signal::new(0u64);

    let s_clone = s.clone();
    let result = Effect::try_new(move || {
        let value = s_clone.get();
        s_clone.set(value + 1);
    });

    match result {
        Err(ReactiveError::CyclicDependency { depth, .. }) => assert_eq!(depth, MAX_DEPTH),
        other => panic!("expected a cyclic dependency, got {other:?}"),
    }
    assert_context_is_clean();

    // The failed effect was disposed and no longer listens.
    assert_eq!(s.subscriber_count(), 0);
    assert_eq!(s.get(), MAX_DEPTH as u64);
}

#[test]
fn mutual_writes_fail_at_the_outermost_try_set() {
    configure();
    let a = Signal::new(0u64);
    let b = Signal::new(0u64);

    let (a1, b1) = (a.clone(), b.clone());
    let _forward = Effect::new(move || {
        let value = a1.get();
        if value > 0 {
            b1.set(value + 1);
        }
    });

    let (a2, b2) = (a.clone(), b.clone());
    let _backward = Effect::new(move || {
        let value = b2.get();
        if value > 0 {
            a2.set(value + 1);
        }
    });

    let err = a.try_set(1).unwrap_err();
    assert!(matches!(err, ReactiveError::CyclicDependency { .. }));
    assert!(err.to_string().contains("cyclic dependency"));
    assert_context_is_clean();

    // Nothing is left pending for the next write.
    let c = Signal::new(0);
    assert!(c.try_set(1).is_ok());
}

#[test]
#[should_panic(expected = "cyclic dependency")]
fn infallible_set_panics_on_cycle() {
    configure();
    let s = Signal::new(0u64);

    let s_clone = s.clone();
    let _effect = Effect::new(move || {
        let value = s_clone.get();
        if value > 0 {
            s_clone.set(value + 1);
        }
    });

    s.set(1);
}

#[test]
fn bounded_recursion_within_limit_succeeds() {
    configure();
    let s = Signal::new(0usize);
    let runs = Arc::new(AtomicUsize::new(0));

    let s_clone = s.clone();
    let runs_clone = runs.clone();
    let effect = Effect::try_new(move || {
        runs_clone.fetch_add(1, Ordering::SeqCst);
        let value = s_clone.get();
        if value < MAX_DEPTH - 1 {
            s_clone.set(value + 1);
        }
    })
    .unwrap();

    assert_eq!(s.get(), MAX_DEPTH - 1);
    assert_eq!(runs.load(Ordering::SeqCst), MAX_DEPTH);
    assert!(!effect.is_disposed());
}
