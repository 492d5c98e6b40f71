//! Eviction Policy Module
//!
//! The delegate an embedding cache binds to negotiate evictions.
//!
//! # Hooks
//! - `should_evict_lru` / `will_evict_lru` / `did_evict_lru` - capacity pressure
//! - `should_evict_expired` / `will_evict_expired` / `did_evict_expired` - expiration
//!
//! Every hook has a default, so an implementation only overrides what it
//! cares about. Hooks are always called outside the store lock and may call
//! back into the cache.

mod guard;

pub(crate) use guard::PolicyGuard;

use crate::cache::CachedRecord;

// == LRU Decision ==
/// Answer to "may this least-recently-read entry be evicted?".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LruDecision {
    #[default]
    Allow,
    Reject,
}

// == Expired Decision ==
/// Answer to "may this expired entry be evicted?".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpiredDecision {
    #[default]
    Evict,
    /// Keep the entry and push its expiration back by its own lifetime
    DeferByLifetime,
}

// == Eviction Policy ==
/// Authority consulted by the sweep before each eviction.
///
/// Implementations may be called concurrently from sweeps and from
/// opportunistic expiration on read. A hook that blocks stalls the sweep
/// that called it, not readers or writers.
pub trait EvictionPolicy: Send + Sync {
    /// Decides whether an entry under capacity pressure may be evicted.
    fn should_evict_lru(&self, _key: &str, _record: &CachedRecord) -> LruDecision {
        LruDecision::Allow
    }

    fn will_evict_lru(&self, _key: &str, _record: &CachedRecord) {}

    fn did_evict_lru(&self, _key: &str, _record: &CachedRecord) {}

    /// Decides whether an expired entry is evicted or kept for another lifetime.
    fn should_evict_expired(&self, _key: &str, _record: &CachedRecord) -> ExpiredDecision {
        ExpiredDecision::Evict
    }

    fn will_evict_expired(&self, _key: &str, _record: &CachedRecord) {}

    fn did_evict_expired(&self, _key: &str, _record: &CachedRecord) {}
}
