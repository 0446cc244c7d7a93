//! Reactive Runtime
//!
//! The runtime owns every live subscriber and holds the process-wide
//! configuration.
//!
//! # Ownership
//!
//! Signals reference their subscribers weakly and subscribers reference the
//! signals they depend on weakly, so neither side keeps the other alive. The
//! strong reference to each effect lives here, in an arena keyed by
//! [`SubscriberId`], from construction until the effect is disposed. This
//! is what lets an effect keep running after its handle is dropped.
//!
//! # Thread Safety
//!
//! The arena is a concurrent map so that handles can be moved across
//! threads. The tracking context itself is thread-local (see
//! [`ReactiveContext`](super::ReactiveContext)).

use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Deserialize;
use tracing::debug;

use super::context::ReactiveContext;
use super::subscriber::{Subscriber, SubscriberId};
use crate::error::{ReactiveError, Result};

/// Runtime configuration.
///
/// The default is fully unbounded propagation: a signal written by one of its
/// own readers recurses until it settles or the stack runs out.
///
/// # Example
///
/// ```rust
/// use signals_core::reactive::RuntimeConfig;
///
/// let config = RuntimeConfig::from_json(r#"{ "max_depth": 64 }"#).unwrap();
/// assert_eq!(config.max_depth, Some(64));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Maximum number of nested subscriber executions on one thread.
    ///
    /// An execution that would go deeper fails with
    /// [`ReactiveError::CyclicDependency`] instead of recursing.
    pub max_depth: Option<usize>,
}

impl RuntimeConfig {
    /// Configuration with a propagation depth limit.
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            max_depth: Some(max_depth),
        }
    }

    /// Parse a configuration from JSON and validate it.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ReactiveError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == Some(0) {
            return Err(ReactiveError::Config(
                "max_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// The global reactive runtime.
pub struct Runtime;

// Live subscribers, owned until disposal.
static SUBSCRIBERS: OnceLock<DashMap<SubscriberId, Arc<Subscriber>>> = OnceLock::new();
static CONFIG: OnceLock<RwLock<RuntimeConfig>> = OnceLock::new();

fn get_subscribers() -> &'static DashMap<SubscriberId, Arc<Subscriber>> {
    SUBSCRIBERS.get_or_init(DashMap::new)
}

fn get_config() -> &'static RwLock<RuntimeConfig> {
    CONFIG.get_or_init(|| RwLock::new(RuntimeConfig::default()))
}

impl Runtime {
    /// Install a new configuration for the whole process.
    pub fn configure(config: RuntimeConfig) -> Result<()> {
        config.validate()?;
        *get_config().write() = config;
        debug!(max_depth = ?config.max_depth, "runtime configured");
        Ok(())
    }

    /// Get the active configuration.
    pub fn config() -> RuntimeConfig {
        *get_config().read()
    }

    /// Take ownership of a subscriber until it is unregistered.
    pub(crate) fn register(subscriber: Arc<Subscriber>) {
        get_subscribers().insert(subscriber.id(), subscriber);
    }

    /// Release a subscriber, returning it if it was still registered.
    pub(crate) fn unregister(id: SubscriberId) -> Option<Arc<Subscriber>> {
        get_subscribers().remove(&id).map(|(_, subscriber)| subscriber)
    }

    /// Check whether a subscriber is still alive.
    pub fn is_registered(id: SubscriberId) -> bool {
        get_subscribers().contains_key(&id)
    }

    /// Number of live subscribers across all threads.
    pub fn subscriber_count() -> usize {
        get_subscribers().len()
    }

    /// Get the ID of the subscriber currently being tracked, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        ReactiveContext::current_subscriber().map(|subscriber| subscriber.id())
    }

    /// Check if we're inside a tracked computation.
    pub fn is_tracking() -> bool {
        ReactiveContext::is_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_registers_and_unregisters() {
        let subscriber = Arc::new(Subscriber::new(|| {}));
        let id = subscriber.id();

        Runtime::register(subscriber);
        assert!(Runtime::is_registered(id));

        let released = Runtime::unregister(id).map(|s| s.id());
        assert_eq!(released, Some(id));
        assert!(!Runtime::is_registered(id));

        // Second release finds nothing
        assert!(Runtime::unregister(id).is_none());
    }

    #[test]
    fn runtime_reports_current_subscriber() {
        let subscriber = Arc::new(Subscriber::new(|| {}));
        assert!(!Runtime::is_tracking());

        let _ctx = ReactiveContext::enter(subscriber.clone());
        assert!(Runtime::is_tracking());
        assert_eq!(Runtime::current_subscriber(), Some(subscriber.id()));
    }

    #[test]
    fn default_config_is_unbounded() {
        assert_eq!(RuntimeConfig::default().max_depth, None);
        assert!(RuntimeConfig::default().validate().is_ok());
    }

    #[test]
    fn config_from_json() {
        let config = RuntimeConfig::from_json(r#"{ "max_depth": 32 }"#).unwrap();
        assert_eq!(config, RuntimeConfig::with_max_depth(32));

        let empty = RuntimeConfig::from_json("{}").unwrap();
        assert_eq!(empty, RuntimeConfig::default());
    }

    #[test]
    fn config_rejects_zero_depth() {
        let err = RuntimeConfig::from_json(r#"{ "max_depth": 0 }"#).unwrap_err();
        assert!(matches!(err, ReactiveError::Config(_)));

        let err = Runtime::configure(RuntimeConfig::with_max_depth(0)).unwrap_err();
        assert!(matches!(err, ReactiveError::Config(_)));
    }

    #[test]
    fn config_rejects_unknown_fields() {
        let err = RuntimeConfig::from_json(r#"{ "depth": 3 }"#).unwrap_err();
        assert!(matches!(err, ReactiveError::Config(_)));
    }
}
