//! Sweep Module
//!
//! One garbage-collection pass over the store. Keys are visited least
//! recently read first; each key is checked for expiration, then for
//! capacity pressure, and the eviction policy is consulted before anything
//! is removed. No store lock is held while the policy runs.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, trace};

use super::store::CacheCore;
use super::CachedRecord;
use crate::policy::{ExpiredDecision, LruDecision};

// == Sweep Report ==
/// What a single sweep did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Keys still present when their turn came
    pub examined: usize,
    pub expired_evicted: usize,
    pub lru_evicted: usize,
    /// Expired entries given another lifetime
    pub deferred: usize,
    /// LRU candidates the policy kept
    pub lru_rejected: usize,
}

impl SweepReport {
    pub fn evicted(&self) -> usize {
        self.expired_evicted + self.lru_evicted
    }
}

impl CacheCore {
    // == Sweep ==
    /// Runs one full pass over every tracked key.
    ///
    /// The key order is a snapshot; entries written or removed during the
    /// pass are picked up or skipped on a best-effort basis.
    pub(crate) fn sweep(&self) -> SweepReport {
        let mut report = SweepReport::default();

        for key in self.keys_oldest_first() {
            let Some(record) = self.peek(&key) else {
                continue;
            };
            report.examined += 1;

            if record.is_expired_at(Utc::now()) {
                // Skipped while an expired read is already settling this key
                if let Some(_claim) = self.claim_expiration(&key) {
                    self.expire(&key, record, &mut report);
                }
            } else if self.current_usage() >= self.max_pressure() {
                self.relieve_pressure(&key, record, &mut report);
            }
        }

        self.stats.record_sweep();
        debug!(
            "Sweep: examined {}, expired {}, lru {}, deferred {}, lru rejected {}",
            report.examined,
            report.expired_evicted,
            report.lru_evicted,
            report.deferred,
            report.lru_rejected
        );
        report
    }

    // == Expire One ==
    /// Runs the expiration path for a single key, if it is expired.
    ///
    /// Does nothing while another pass is negotiating the same key.
    pub(crate) fn expire_one(&self, key: &str) -> SweepReport {
        let mut report = SweepReport::default();
        let Some(_claim) = self.claim_expiration(key) else {
            trace!("Expiration of '{}' already in flight", key);
            return report;
        };
        if let Some(record) = self.peek(key) {
            if record.is_expired() {
                report.examined = 1;
                self.expire(key, record, &mut report);
            }
        }
        report
    }

    fn expire(&self, key: &str, record: Arc<CachedRecord>, report: &mut SweepReport) {
        match self.policy.should_evict_expired(key, &record) {
            ExpiredDecision::DeferByLifetime => {
                let extended = record.extended_by_lifetime();
                trace!(
                    "Deferring expiration of '{}' to {}",
                    key,
                    extended.expiration()
                );
                if self.replace_if_same(key, &record, extended) {
                    report.deferred += 1;
                    self.stats.record_deferral();
                }
            }
            ExpiredDecision::Evict => {
                self.policy.will_evict_expired(key, &record);
                if self.remove_if_same(key, &record) {
                    report.expired_evicted += 1;
                    self.stats.record_expired_eviction();
                    trace!("Evicted expired '{}'", key);
                    self.policy.did_evict_expired(key, &record);
                }
            }
        }
    }

    fn relieve_pressure(&self, key: &str, record: Arc<CachedRecord>, report: &mut SweepReport) {
        match self.policy.should_evict_lru(key, &record) {
            LruDecision::Reject => {
                report.lru_rejected += 1;
                self.stats.record_lru_rejection();
                trace!("Policy kept LRU candidate '{}'", key);
            }
            LruDecision::Allow => {
                // The policy may have relieved the pressure itself
                if self.current_usage() < self.max_pressure() {
                    trace!("Pressure relieved while consulting policy on '{}'", key);
                    return;
                }
                self.policy.will_evict_lru(key, &record);
                if self.remove_if_pressured(key, &record) {
                    report.lru_evicted += 1;
                    self.stats.record_lru_eviction();
                    trace!("Evicted least recently read '{}'", key);
                    self.policy.did_evict_lru(key, &record);
                }
            }
        }
    }
}
