//! Cache Module
//!
//! The memory tier: concurrent record storage, last-read bookkeeping and the
//! sweep that evicts expired and least-recently-read records.

mod memory_cache;
mod recency;
mod record;
mod stats;
mod store;
mod sweep;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use memory_cache::MemoryCache;
pub use record::{CachedRecord, StoragePolicy};
pub use stats::CacheStats;
pub use sweep::SweepReport;

pub(crate) use store::CacheCore;
