//! Cache Store Module
//!
//! Concurrent key -> record storage with size accounting and last-read
//! tracking. Every mutation happens inside one critical section on the
//! store's `RwLock`; reads that only refresh the last-read stamp share the
//! lock with each other.

use std::collections::{HashMap, HashSet};
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak,
};

use chrono::Utc;
use tokio::runtime::Handle;
use tracing::{debug, info, trace};

use super::recency::{oldest_first, AccessClock, LastRead};
use super::stats::{CacheStats, StatsRecorder};
use super::{CachedRecord, StoragePolicy};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::policy::PolicyGuard;
use crate::tasks::{PressureTimer, TimerState};

// == Slot ==
/// A stored record and the stamp of its last read.
#[derive(Debug)]
struct Slot {
    record: Arc<CachedRecord>,
    last_read: LastRead,
}

#[derive(Debug, Default)]
struct StoreState {
    entries: HashMap<String, Slot>,
    current_usage: u64,
}

impl StoreState {
    fn take(&mut self, key: &str) -> Option<Arc<CachedRecord>> {
        let slot = self.entries.remove(key)?;
        self.current_usage = self.current_usage.saturating_sub(slot.record.size());
        Some(slot.record)
    }
}

// == Expiration Claim ==
/// Exclusive right to negotiate the expiration of one key.
///
/// Released when dropped.
pub(crate) struct ExpirationClaim<'a> {
    core: &'a CacheCore,
    key: String,
}

impl Drop for ExpirationClaim<'_> {
    fn drop(&mut self) {
        self.core.expiring().remove(&self.key);
    }
}

// == Cache Core ==
/// Shared state behind every `MemoryCache` handle.
pub(crate) struct CacheCore {
    config: Config,
    max_pressure: u64,
    state: RwLock<StoreState>,
    /// Keys whose expiration is being negotiated with the policy
    expiring: Mutex<HashSet<String>>,
    clock: AccessClock,
    pub(crate) stats: StatsRecorder,
    pub(crate) policy: PolicyGuard,
    pub(crate) timer: PressureTimer,
    runtime: Handle,
    this: Weak<CacheCore>,
}

impl CacheCore {
    // == Constructor ==
    /// Validates the config and spawns the (paused) pressure timer.
    pub(crate) fn new(config: Config, runtime: Handle) -> Result<Arc<Self>> {
        config.validate()?;
        info!(
            "Memory cache initialized: capacity={} bytes, max_pressure={} bytes, sweep_interval={:?}",
            config.memory_capacity,
            config.max_pressure(),
            config.sweep_interval
        );

        Ok(Arc::new_cyclic(|this| Self {
            max_pressure: config.max_pressure(),
            state: RwLock::new(StoreState::default()),
            expiring: Mutex::new(HashSet::new()),
            clock: AccessClock::new(),
            stats: StatsRecorder::new(),
            policy: PolicyGuard::new(config.slow_policy_threshold),
            timer: PressureTimer::spawn(&runtime, this.clone(), config.sweep_interval),
            runtime,
            this: this.clone(),
            config,
        }))
    }

    fn read_state(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn expiring(&self) -> MutexGuard<'_, HashSet<String>> {
        self.expiring.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claims `key` for an expiration pass. `None` if another pass holds it.
    pub(crate) fn claim_expiration(&self, key: &str) -> Option<ExpirationClaim<'_>> {
        if !self.expiring().insert(key.to_string()) {
            return None;
        }
        Some(ExpirationClaim {
            core: self,
            key: key.to_string(),
        })
    }

    pub(crate) fn runtime(&self) -> &Handle {
        &self.runtime
    }

    // == Read ==
    /// Returns the live record for `key` and refreshes its last-read stamp.
    ///
    /// Expired records are hidden and handed to the expiration path in the
    /// background.
    pub(crate) fn read(&self, key: &str) -> Option<Arc<CachedRecord>> {
        if key.is_empty() {
            return None;
        }

        let now = Utc::now();
        let (record, expired) = {
            let state = self.read_state();
            match state.entries.get(key) {
                None => (None, false),
                Some(slot) if slot.record.is_expired_at(now) => (None, true),
                Some(slot) => {
                    slot.last_read.touch(self.clock.tick());
                    (Some(Arc::clone(&slot.record)), false)
                }
            }
        };

        match record {
            Some(record) => {
                self.stats.record_hit();
                Some(record)
            }
            None => {
                self.stats.record_miss();
                if expired {
                    self.schedule_expiration(key);
                }
                None
            }
        }
    }

    /// Looks up a record without touching recency or stats.
    pub(crate) fn peek(&self, key: &str) -> Option<Arc<CachedRecord>> {
        self.read_state()
            .entries
            .get(key)
            .map(|slot| Arc::clone(&slot.record))
    }

    fn schedule_expiration(&self, key: &str) {
        // A pass already in flight will settle this record
        if self.expiring().contains(key) {
            return;
        }
        let Some(core) = self.this.upgrade() else {
            return;
        };
        let key = key.to_string();
        trace!("Scheduling expiration of '{}' after expired read", key);
        self.runtime.spawn_blocking(move || {
            core.expire_one(&key);
        });
    }

    // == Write ==
    /// Stores `record` under `key`, replacing any previous record.
    ///
    /// If the write leaves usage above capacity, a sweep runs before returning.
    pub(crate) fn try_write(&self, record: CachedRecord, key: &str) -> Result<Arc<CachedRecord>> {
        if let Err(e) = self.admit(&record, key) {
            self.stats.record_rejected_write();
            debug!("Write rejected: {}", e);
            return Err(e);
        }

        let record = Arc::new(record);
        let usage = {
            let mut state = self.write_state();
            let was_empty = state.entries.is_empty();
            let slot = Slot {
                record: Arc::clone(&record),
                last_read: LastRead::new(self.clock.tick()),
            };
            if let Some(old) = state.entries.insert(key.to_string(), slot) {
                state.current_usage = state.current_usage.saturating_sub(old.record.size());
            }
            state.current_usage = state.current_usage.saturating_add(record.size());
            if was_empty {
                self.timer.resume();
            }
            state.current_usage
        };
        self.stats.record_write();
        trace!("Stored '{}' ({} bytes), usage now {}", key, record.size(), usage);

        if usage > self.config.memory_capacity {
            debug!(
                "Usage {} exceeds capacity {} after writing '{}', sweeping",
                usage, self.config.memory_capacity, key
            );
            self.sweep();
        }

        Ok(record)
    }

    fn admit(&self, record: &CachedRecord, key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(CacheError::EmptyKey);
        }
        if record.storage_policy() == StoragePolicy::NotAllowed {
            return Err(CacheError::StorageNotAllowed(key.to_string()));
        }
        if record.size() > self.config.memory_capacity {
            return Err(CacheError::CapacityExceeded {
                size: record.size(),
                capacity: self.config.memory_capacity,
            });
        }
        Ok(())
    }

    // == Remove ==
    /// Removes `key`, returning the record it held.
    pub(crate) fn remove(&self, key: &str) -> Option<Arc<CachedRecord>> {
        if key.is_empty() {
            return None;
        }
        let mut state = self.write_state();
        let removed = state.take(key);
        if removed.is_some() && state.entries.is_empty() {
            self.timer.pause();
        }
        removed
    }

    /// Removes `key` only while it still holds `expected`.
    pub(crate) fn remove_if_same(&self, key: &str, expected: &Arc<CachedRecord>) -> bool {
        let mut state = self.write_state();
        let same = state
            .entries
            .get(key)
            .is_some_and(|slot| Arc::ptr_eq(&slot.record, expected));
        if !same {
            return false;
        }
        state.take(key);
        if state.entries.is_empty() {
            self.timer.pause();
        }
        true
    }

    /// Removes `key` only while it still holds `expected` and usage is at or
    /// above `max_pressure`.
    pub(crate) fn remove_if_pressured(&self, key: &str, expected: &Arc<CachedRecord>) -> bool {
        let mut state = self.write_state();
        if state.current_usage < self.max_pressure {
            return false;
        }
        let same = state
            .entries
            .get(key)
            .is_some_and(|slot| Arc::ptr_eq(&slot.record, expected));
        if !same {
            return false;
        }
        state.take(key);
        if state.entries.is_empty() {
            self.timer.pause();
        }
        true
    }

    /// Swaps in `replacement` only while `key` still holds `expected`.
    ///
    /// The last-read stamp is kept.
    pub(crate) fn replace_if_same(
        &self,
        key: &str,
        expected: &Arc<CachedRecord>,
        replacement: CachedRecord,
    ) -> bool {
        let mut guard = self.write_state();
        let state = &mut *guard;
        let Some(slot) = state.entries.get_mut(key) else {
            return false;
        };
        if !Arc::ptr_eq(&slot.record, expected) {
            return false;
        }
        state.current_usage = state
            .current_usage
            .saturating_sub(slot.record.size())
            .saturating_add(replacement.size());
        slot.record = Arc::new(replacement);
        true
    }

    // == Clear ==
    /// Drops every entry and pauses the timer.
    pub(crate) fn clear(&self) {
        let mut state = self.write_state();
        let dropped = state.entries.len();
        state.entries.clear();
        state.current_usage = 0;
        self.timer.pause();
        debug!("Cleared {} entries", dropped);
    }

    // == Sweep Snapshot ==
    /// Keys ordered least recently read first.
    pub(crate) fn keys_oldest_first(&self) -> Vec<String> {
        let state = self.read_state();
        oldest_first(
            state
                .entries
                .iter()
                .map(|(key, slot)| (key, slot.last_read.get())),
        )
    }

    // == Gauges ==
    pub(crate) fn contains(&self, key: &str) -> bool {
        self.peek(key).is_some_and(|record| !record.is_expired())
    }

    pub(crate) fn len(&self) -> usize {
        self.read_state().entries.len()
    }

    pub(crate) fn current_usage(&self) -> u64 {
        self.read_state().current_usage
    }

    pub(crate) fn memory_capacity(&self) -> u64 {
        self.config.memory_capacity
    }

    pub(crate) fn max_pressure(&self) -> u64 {
        self.max_pressure
    }

    pub(crate) fn timer_state(&self) -> TimerState {
        self.timer.state()
    }

    pub(crate) fn stats(&self) -> CacheStats {
        let (total_entries, current_usage) = {
            let state = self.read_state();
            (state.entries.len(), state.current_usage)
        };
        self.stats
            .snapshot(total_entries, current_usage, self.config.memory_capacity)
    }

    /// Sum of entry sizes recomputed from scratch.
    #[cfg(test)]
    pub(crate) fn recomputed_usage(&self) -> u64 {
        self.read_state()
            .entries
            .values()
            .map(|slot| slot.record.size())
            .sum()
    }
}

impl Drop for CacheCore {
    fn drop(&mut self) {
        self.timer.cancel();
        debug!("Memory cache dropped, pressure timer cancelled");
    }
}
