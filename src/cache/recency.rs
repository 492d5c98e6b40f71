//! Recency Module
//!
//! Last-read bookkeeping for LRU ordering at sweep time.
//!
//! Instead of moving keys around a list on every read, each entry carries a
//! stamp drawn from a monotonic counter. A sweep sorts the stamps once, which
//! is all the ordering the eviction pass needs.

use std::sync::atomic::{AtomicU64, Ordering};

// == Access Clock ==
/// Hands out strictly increasing last-read stamps.
#[derive(Debug)]
pub struct AccessClock {
    next: AtomicU64,
}

impl AccessClock {
    // == Constructor ==
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    // == Tick ==
    /// Returns a stamp later than every stamp handed out before.
    pub fn tick(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for AccessClock {
    fn default() -> Self {
        Self::new()
    }
}

// == Last Read ==
/// Per-entry last-read stamp, refreshable under a shared lock.
#[derive(Debug)]
pub struct LastRead(AtomicU64);

impl LastRead {
    pub fn new(stamp: u64) -> Self {
        Self(AtomicU64::new(stamp))
    }

    /// Moves the stamp forward; a concurrent older stamp never wins.
    pub fn touch(&self, stamp: u64) {
        self.0.fetch_max(stamp, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

// == Oldest First ==
/// Orders keys by last-read stamp, least recently read first.
pub fn oldest_first<'a, I>(stamps: I) -> Vec<String>
where
    I: IntoIterator<Item = (&'a String, u64)>,
{
    let mut ordered: Vec<(u64, &String)> = stamps
        .into_iter()
        .map(|(key, stamp)| (stamp, key))
        .collect();
    ordered.sort_unstable_by_key(|(stamp, _)| *stamp);
    ordered.into_iter().map(|(_, key)| key.clone()).collect()
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_ticks_increase() {
        let clock = AccessClock::new();
        let a = clock.tick();
        let b = clock.tick();
        let c = clock.tick();
        assert!(a < b && b < c);
    }

    #[test]
    fn test_last_read_touch_moves_forward() {
        let last_read = LastRead::new(5);
        last_read.touch(9);
        assert_eq!(last_read.get(), 9);
    }

    #[test]
    fn test_last_read_ignores_older_stamp() {
        let last_read = LastRead::new(9);
        last_read.touch(3);
        assert_eq!(last_read.get(), 9);
    }

    #[test]
    fn test_oldest_first_empty() {
        let stamps: Vec<(&String, u64)> = Vec::new();
        assert!(oldest_first(stamps).is_empty());
    }

    #[test]
    fn test_oldest_first_orders_by_stamp() {
        let (a, b, c) = ("a".to_string(), "b".to_string(), "c".to_string());
        let ordered = oldest_first(vec![(&c, 3), (&a, 1), (&b, 2)]);
        assert_eq!(ordered, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_oldest_first_after_touches() {
        let clock = AccessClock::new();
        let keys = ["a".to_string(), "b".to_string(), "c".to_string()];
        let stamps: Vec<LastRead> = keys.iter().map(|_| LastRead::new(clock.tick())).collect();

        // Read a, then c: b becomes the oldest
        stamps[0].touch(clock.tick());
        stamps[2].touch(clock.tick());

        let ordered = oldest_first(keys.iter().zip(stamps.iter().map(LastRead::get)));
        assert_eq!(ordered, vec!["b", "a", "c"]);
    }
}
