//! Memory Cache Module
//!
//! Public handle to the memory tier. Synchronous operations block only on
//! the store lock; the `*_async` variants run on the runtime's blocking pool
//! and deliver their result to a completion callback exactly once.

use std::fmt;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use super::store::CacheCore;
use super::{CacheStats, CachedRecord, SweepReport};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::policy::EvictionPolicy;
use crate::tasks::TimerState;

// == Memory Cache ==
/// Size-bounded in-memory cache with TTL and LRU eviction.
///
/// Clones share the same store. The pressure timer is cancelled once the
/// last handle (and every in-flight async operation) is gone.
#[derive(Clone)]
pub struct MemoryCache {
    core: Arc<CacheCore>,
}

impl MemoryCache {
    // == Constructors ==
    /// Creates a cache on the current tokio runtime.
    ///
    /// Fails with `NoRuntime` outside a runtime context and with
    /// `InvalidConfig` for unusable parameters.
    pub fn new(config: Config) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| CacheError::NoRuntime(e.to_string()))?;
        Self::with_runtime(config, runtime)
    }

    /// Creates a cache whose timer and async operations run on `runtime`.
    pub fn with_runtime(config: Config, runtime: Handle) -> Result<Self> {
        Ok(Self {
            core: CacheCore::new(config, runtime)?,
        })
    }

    /// Creates a cache with `memory_capacity` bytes and default settings.
    pub fn with_capacity(memory_capacity: u64) -> Result<Self> {
        Self::new(Config::with_capacity(memory_capacity))
    }

    pub(crate) fn core(&self) -> &Arc<CacheCore> {
        &self.core
    }

    // == Policy ==
    /// Binds (or unbinds, with `None`) the eviction policy.
    pub fn set_policy(&self, policy: Option<Arc<dyn EvictionPolicy>>) {
        self.core.policy.bind(policy);
    }

    pub fn policy(&self) -> Option<Arc<dyn EvictionPolicy>> {
        self.core.policy.current()
    }

    // == Read ==
    /// Returns the live record for `key`, refreshing its last-read time.
    ///
    /// Returns `None` for an empty key, a missing key, or an expired record.
    pub fn read(&self, key: &str) -> Option<Arc<CachedRecord>> {
        self.core.read(key)
    }

    // == Write ==
    /// Stores `record` under `key`. Returns `false` if the write was rejected.
    pub fn write(&self, record: CachedRecord, key: &str) -> bool {
        self.core.try_write(record, key).is_ok()
    }

    /// Stores `record` under `key`, reporting why a rejected write was refused.
    pub fn try_write(&self, record: CachedRecord, key: &str) -> Result<Arc<CachedRecord>> {
        self.core.try_write(record, key)
    }

    // == Remove ==
    /// Removes `key`, returning the record it held.
    pub fn remove(&self, key: &str) -> Option<Arc<CachedRecord>> {
        self.core.remove(key)
    }

    // == Clear ==
    pub fn clear(&self) {
        self.core.clear();
    }

    // == Sweep ==
    /// Runs a sweep now on the calling thread.
    pub fn sweep(&self) -> SweepReport {
        self.core.sweep()
    }

    // == Async Variants ==
    /// Reads on the blocking pool and hands `(key, record)` to `completion`.
    pub fn read_async<F>(&self, key: impl Into<String>, completion: F) -> JoinHandle<()>
    where
        F: FnOnce(&str, Option<Arc<CachedRecord>>) + Send + 'static,
    {
        let core = Arc::clone(&self.core);
        let key = key.into();
        self.core.runtime().spawn_blocking(move || {
            let record = core.read(&key);
            completion(&key, record);
        })
    }

    /// Writes on the blocking pool; `completion` gets the stored record, or
    /// `None` if the write was rejected.
    pub fn write_async<F>(
        &self,
        record: CachedRecord,
        key: impl Into<String>,
        completion: F,
    ) -> JoinHandle<()>
    where
        F: FnOnce(&str, Option<Arc<CachedRecord>>) + Send + 'static,
    {
        let core = Arc::clone(&self.core);
        let key = key.into();
        self.core.runtime().spawn_blocking(move || {
            let stored = core.try_write(record, &key).ok();
            completion(&key, stored);
        })
    }

    /// Removes on the blocking pool; `completion` gets the removed record.
    pub fn remove_async<F>(&self, key: impl Into<String>, completion: F) -> JoinHandle<()>
    where
        F: FnOnce(&str, Option<Arc<CachedRecord>>) + Send + 'static,
    {
        let core = Arc::clone(&self.core);
        let key = key.into();
        self.core.runtime().spawn_blocking(move || {
            let removed = core.remove(&key);
            completion(&key, removed);
        })
    }

    pub fn clear_async<F>(&self, completion: F) -> JoinHandle<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let core = Arc::clone(&self.core);
        self.core.runtime().spawn_blocking(move || {
            core.clear();
            completion();
        })
    }

    // == Gauges ==
    /// True if `key` holds an unexpired record. Does not count as a read.
    pub fn contains(&self, key: &str) -> bool {
        self.core.contains(key)
    }

    pub fn len(&self) -> usize {
        self.core.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of the sizes of all stored records, in bytes.
    pub fn current_usage(&self) -> u64 {
        self.core.current_usage()
    }

    pub fn memory_capacity(&self) -> u64 {
        self.core.memory_capacity()
    }

    /// Usage at which least-recently-read entries become eviction candidates.
    pub fn max_pressure(&self) -> u64 {
        self.core.max_pressure()
    }

    pub fn timer_state(&self) -> TimerState {
        self.core.timer_state()
    }

    pub fn stats(&self) -> CacheStats {
        self.core.stats()
    }
}

impl fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryCache")
            .field("memory_capacity", &self.memory_capacity())
            .field("current_usage", &self.current_usage())
            .field("entries", &self.len())
            .finish()
    }
}
