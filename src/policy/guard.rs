//! Policy Guard
//!
//! Runs eviction policy hooks so that a panicking or slow policy cannot
//! corrupt the store or stall it silently.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use tracing::{error, warn};

use super::{EvictionPolicy, ExpiredDecision, LruDecision};
use crate::cache::CachedRecord;

/// Holds the optional policy binding and invokes its hooks.
pub(crate) struct PolicyGuard {
    policy: RwLock<Option<Arc<dyn EvictionPolicy>>>,
    slow_threshold: Duration,
}

impl PolicyGuard {
    pub(crate) fn new(slow_threshold: Duration) -> Self {
        Self {
            policy: RwLock::new(None),
            slow_threshold,
        }
    }

    pub(crate) fn bind(&self, policy: Option<Arc<dyn EvictionPolicy>>) {
        *self.policy.write().unwrap_or_else(PoisonError::into_inner) = policy;
    }

    /// The currently bound policy, cloned out so no lock is held while calling it.
    pub(crate) fn current(&self) -> Option<Arc<dyn EvictionPolicy>> {
        self.policy
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // == Decisions ==
    pub(crate) fn should_evict_lru(&self, key: &str, record: &CachedRecord) -> LruDecision {
        match self.current() {
            Some(policy) => self.invoke("should_evict_lru", key, LruDecision::Allow, || {
                policy.should_evict_lru(key, record)
            }),
            None => LruDecision::Allow,
        }
    }

    pub(crate) fn should_evict_expired(&self, key: &str, record: &CachedRecord) -> ExpiredDecision {
        match self.current() {
            Some(policy) => self.invoke("should_evict_expired", key, ExpiredDecision::Evict, || {
                policy.should_evict_expired(key, record)
            }),
            None => ExpiredDecision::Evict,
        }
    }

    // == Notifications ==
    pub(crate) fn will_evict_lru(&self, key: &str, record: &CachedRecord) {
        if let Some(policy) = self.current() {
            self.invoke("will_evict_lru", key, (), || policy.will_evict_lru(key, record));
        }
    }

    pub(crate) fn did_evict_lru(&self, key: &str, record: &CachedRecord) {
        if let Some(policy) = self.current() {
            self.invoke("did_evict_lru", key, (), || policy.did_evict_lru(key, record));
        }
    }

    pub(crate) fn will_evict_expired(&self, key: &str, record: &CachedRecord) {
        if let Some(policy) = self.current() {
            self.invoke("will_evict_expired", key, (), || {
                policy.will_evict_expired(key, record)
            });
        }
    }

    pub(crate) fn did_evict_expired(&self, key: &str, record: &CachedRecord) {
        if let Some(policy) = self.current() {
            self.invoke("did_evict_expired", key, (), || {
                policy.did_evict_expired(key, record)
            });
        }
    }

    // == Invoke ==
    /// Runs one hook, falling back to `fallback` if it panics.
    fn invoke<T>(&self, hook: &str, key: &str, fallback: T, call: impl FnOnce() -> T) -> T {
        let started = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(call));
        let elapsed = started.elapsed();

        if elapsed > self.slow_threshold {
            warn!(
                "Eviction policy hook {} for key '{}' took {:?} (threshold {:?})",
                hook, key, elapsed, self.slow_threshold
            );
        }

        match outcome {
            Ok(value) => value,
            Err(_) => {
                error!(
                    "Eviction policy hook {} panicked for key '{}'; using default",
                    hook, key
                );
                fallback
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    struct Panicky;

    impl EvictionPolicy for Panicky {
        fn should_evict_lru(&self, _key: &str, _record: &CachedRecord) -> LruDecision {
            panic!("policy bug");
        }

        fn should_evict_expired(&self, _key: &str, _record: &CachedRecord) -> ExpiredDecision {
            panic!("policy bug");
        }

        fn will_evict_lru(&self, _key: &str, _record: &CachedRecord) {
            panic!("policy bug");
        }
    }

    struct Stubborn;

    impl EvictionPolicy for Stubborn {
        fn should_evict_lru(&self, _key: &str, _record: &CachedRecord) -> LruDecision {
            LruDecision::Reject
        }

        fn should_evict_expired(&self, _key: &str, _record: &CachedRecord) -> ExpiredDecision {
            ExpiredDecision::DeferByLifetime
        }
    }

    fn record() -> CachedRecord {
        CachedRecord::new(vec![0u8; 8], ChronoDuration::seconds(1))
    }

    #[test]
    fn test_unbound_guard_uses_defaults() {
        let guard = PolicyGuard::new(Duration::from_secs(1));
        assert!(guard.current().is_none());
        assert_eq!(guard.should_evict_lru("k", &record()), LruDecision::Allow);
        assert_eq!(
            guard.should_evict_expired("k", &record()),
            ExpiredDecision::Evict
        );
    }

    #[test]
    fn test_bound_policy_is_consulted() {
        let guard = PolicyGuard::new(Duration::from_secs(1));
        guard.bind(Some(Arc::new(Stubborn)));

        assert_eq!(guard.should_evict_lru("k", &record()), LruDecision::Reject);
        assert_eq!(
            guard.should_evict_expired("k", &record()),
            ExpiredDecision::DeferByLifetime
        );

        guard.bind(None);
        assert_eq!(guard.should_evict_lru("k", &record()), LruDecision::Allow);
    }

    #[test]
    fn test_panicking_hooks_fall_back_to_defaults() {
        let guard = PolicyGuard::new(Duration::from_secs(1));
        guard.bind(Some(Arc::new(Panicky)));

        assert_eq!(guard.should_evict_lru("k", &record()), LruDecision::Allow);
        assert_eq!(
            guard.should_evict_expired("k", &record()),
            ExpiredDecision::Evict
        );
        guard.will_evict_lru("k", &record());
    }
}
