//! memtier - the in-memory tier of a two-tier object cache
//!
//! Holds serialized records up to a byte capacity and evicts them on
//! expiration and under LRU pressure, negotiating every eviction with an
//! optional [`EvictionPolicy`].

pub mod cache;
pub mod config;
pub mod error;
pub mod policy;
pub mod tasks;

pub use cache::{CacheStats, CachedRecord, MemoryCache, StoragePolicy, SweepReport};
pub use config::Config;
pub use error::{CacheError, Result};
pub use policy::{EvictionPolicy, ExpiredDecision, LruDecision};
pub use tasks::TimerState;
