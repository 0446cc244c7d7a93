//! Error types for the reactive runtime.

use thiserror::Error;

use crate::reactive::SubscriberId;

/// Errors surfaced by the reactive runtime.
///
/// Almost every operation in the core is infallible. The exceptions are the
/// optional propagation depth guard and configuration loading.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactiveError {
    /// A subscriber was asked to execute while `depth` executions were
    /// already nested on this thread, exceeding the configured maximum.
    ///
    /// This almost always means a signal is written by one of its own
    /// (transitive) readers.
    #[error("cyclic dependency: subscriber {subscriber} re-entered at depth {depth}")]
    CyclicDependency {
        subscriber: SubscriberId,
        depth: usize,
    },

    /// The runtime configuration could not be parsed or is invalid.
    #[error("invalid runtime configuration: {0}")]
    Config(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = ReactiveError> = std::result::Result<T, E>;
