//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check admission, accounting, expiration and eviction
//! order over arbitrary operation sequences.

use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::runtime::Runtime;

use crate::cache::{CachedRecord, MemoryCache};
use crate::policy::{EvictionPolicy, ExpiredDecision};

// == Test Configuration ==
const TEST_CAPACITY: u64 = 1000;

fn test_runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn sized(size: u64) -> CachedRecord {
    CachedRecord::new(Vec::<u8>::new(), Duration::seconds(300)).with_size(size)
}

// == Strategies ==
/// Generates cache keys from a small alphabet so operations collide
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-e]{1,2}".prop_map(|s| s)
}

#[derive(Debug, Clone)]
enum CacheOp {
    Write { key: String, size: u64 },
    Read { key: String },
    Remove { key: String },
    Clear,
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        6 => (key_strategy(), 0u64..400).prop_map(|(key, size)| CacheOp::Write { key, size }),
        3 => key_strategy().prop_map(|key| CacheOp::Read { key }),
        2 => key_strategy().prop_map(|key| CacheOp::Remove { key }),
        1 => Just(CacheOp::Clear),
    ]
}

struct AlwaysDefer;

impl EvictionPolicy for AlwaysDefer {
    fn should_evict_expired(&self, _key: &str, _record: &CachedRecord) -> ExpiredDecision {
        ExpiredDecision::DeferByLifetime
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // For any sequence of operations, the tracked usage equals the sum of
    // the sizes of the records present, and never exceeds capacity once a
    // write returns.
    #[test]
    fn prop_usage_accounting(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let rt = test_runtime();
        let _guard = rt.enter();
        let cache = MemoryCache::with_capacity(TEST_CAPACITY).unwrap();

        for op in ops {
            match op {
                CacheOp::Write { key, size } => {
                    prop_assert!(cache.write(sized(size), &key));
                }
                CacheOp::Read { key } => {
                    let _ = cache.read(&key);
                }
                CacheOp::Remove { key } => {
                    let _ = cache.remove(&key);
                }
                CacheOp::Clear => cache.clear(),
            }

            prop_assert_eq!(cache.current_usage(), cache.core().recomputed_usage());
            prop_assert!(cache.current_usage() <= TEST_CAPACITY);
        }
    }

    // For any record larger than capacity, the write is rejected and usage
    // is unchanged.
    #[test]
    fn prop_capacity_admission(
        existing in prop::collection::vec((key_strategy(), 0u64..100), 0..5),
        oversize in (TEST_CAPACITY + 1)..(TEST_CAPACITY * 10)
    ) {
        let rt = test_runtime();
        let _guard = rt.enter();
        let cache = MemoryCache::with_capacity(TEST_CAPACITY).unwrap();
        for (key, size) in existing {
            cache.write(sized(size), &key);
        }
        let before = cache.current_usage();
        let entries = cache.len();

        prop_assert!(!cache.write(sized(oversize), "oversize"));
        prop_assert_eq!(cache.current_usage(), before);
        prop_assert_eq!(cache.len(), entries);
    }

    // For any record already past its expiration, reads return nothing even
    // though the entry is still stored.
    #[test]
    fn prop_expired_records_hidden(key in key_strategy(), seconds_ago in 0i64..3600) {
        let rt = test_runtime();
        let _guard = rt.enter();
        let cache = MemoryCache::with_capacity(TEST_CAPACITY).unwrap();

        let record = sized(10).with_expiration(Utc::now() - Duration::seconds(seconds_ago));
        prop_assert!(cache.write(record, &key));
        prop_assert!(cache.core().peek(&key).is_some());

        prop_assert!(cache.read(&key).is_none());
        prop_assert!(!cache.contains(&key));
    }

    // With a policy that always defers, repeated sweeps never remove an
    // expired record and each sweep pushes its expiration back by exactly
    // one lifetime.
    #[test]
    fn prop_defer_by_lifetime(lifetime_secs in 1i64..60, sweeps in 1usize..8) {
        let rt = test_runtime();
        let _guard = rt.enter();
        let cache = MemoryCache::with_capacity(TEST_CAPACITY).unwrap();
        cache.set_policy(Some(Arc::new(AlwaysDefer)));

        let lifetime = Duration::seconds(lifetime_secs);
        // Far enough in the past to stay expired through every sweep
        let start = Utc::now() - Duration::days(1);
        let record = CachedRecord::new(vec![1u8; 8], lifetime).with_expiration(start);
        prop_assert!(cache.write(record, "deferred"));

        for n in 1..=sweeps {
            cache.sweep();
            let current = cache.core().peek("deferred");
            prop_assert!(current.is_some(), "Deferred record was removed");
            let expected = start + lifetime * n as i32;
            prop_assert_eq!(current.unwrap().expiration(), expected);
        }
        prop_assert_eq!(cache.current_usage(), 8);
    }

    // For any set of distinct keys written then read in a chosen order,
    // relieving pressure removes the least recently read key first.
    #[test]
    fn prop_lru_eviction_order(
        read_order in Just(vec!["a", "b", "c", "d"]).prop_shuffle()
    ) {
        let rt = test_runtime();
        let _guard = rt.enter();
        let cache = MemoryCache::with_capacity(TEST_CAPACITY).unwrap();

        for key in ["a", "b", "c", "d"] {
            cache.write(sized(220), key);
        }
        for key in &read_order {
            prop_assert!(cache.read(key).is_some());
        }

        // 880 + 200 > capacity: exactly one eviction brings usage under pressure
        cache.write(sized(200), "e");

        let oldest = read_order[0];
        prop_assert!(!cache.contains(oldest), "'{}' should have been evicted", oldest);
        let survivors: HashMap<&str, bool> = read_order[1..]
            .iter()
            .map(|key| (*key, cache.contains(key)))
            .collect();
        prop_assert!(survivors.values().all(|present| *present), "{:?}", survivors);
        prop_assert_eq!(cache.current_usage(), 860);
    }
}
