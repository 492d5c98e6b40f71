//! Cached Record Module
//!
//! Defines the opaque value held by the memory cache together with the
//! metadata the eviction engine reads: size, expiration, lifetime and
//! storage policy.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

// == Storage Policy ==
/// Whether a record may be held in the memory tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoragePolicy {
    #[default]
    Allowed,
    NotAllowed,
}

// == Cached Record ==
/// A serialized blob plus the metadata needed to expire and size it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedRecord {
    payload: Arc<[u8]>,
    size: u64,
    expiration: DateTime<Utc>,
    lifetime: Duration,
    storage_policy: StoragePolicy,
}

impl CachedRecord {
    // == Constructor ==
    /// Creates a record that expires `lifetime` from now.
    ///
    /// The size defaults to the payload length.
    ///
    /// # Arguments
    /// * `payload` - The serialized bytes
    /// * `lifetime` - How long the record lives, also the deferral step
    pub fn new(payload: impl Into<Arc<[u8]>>, lifetime: Duration) -> Self {
        let payload = payload.into();
        Self {
            size: payload.len() as u64,
            payload,
            expiration: saturating_add(Utc::now(), lifetime),
            lifetime,
            storage_policy: StoragePolicy::Allowed,
        }
    }

    /// Sets an absolute expiration instead of `now + lifetime`.
    pub fn with_expiration(mut self, expiration: DateTime<Utc>) -> Self {
        self.expiration = expiration;
        self
    }

    /// Declares a size different from the payload length.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn with_storage_policy(mut self, storage_policy: StoragePolicy) -> Self {
        self.storage_policy = storage_policy;
        self
    }

    // == Accessors ==
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Size in bytes charged against the cache capacity.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn expiration(&self) -> DateTime<Utc> {
        self.expiration
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub fn storage_policy(&self) -> StoragePolicy {
        self.storage_policy
    }

    // == Is Expired ==
    /// Checks if the record has expired at `now`.
    ///
    /// A record is expired once `now` reaches its expiration, inclusive.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiration
    }

    /// Checks if the record has expired at the current time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    // == Remaining Lifetime ==
    /// Time left before expiration, zero once expired.
    pub fn remaining_lifetime(&self, now: DateTime<Utc>) -> Duration {
        if self.expiration > now {
            self.expiration - now
        } else {
            Duration::zero()
        }
    }

    // == Extend ==
    /// Returns a copy whose expiration is pushed back by one lifetime.
    ///
    /// The payload is shared, not copied.
    pub fn extended_by_lifetime(&self) -> Self {
        Self {
            expiration: saturating_add(self.expiration, self.lifetime),
            ..self.clone()
        }
    }
}

/// Adds a duration to a timestamp, clamping at the representable range.
fn saturating_add(at: DateTime<Utc>, by: Duration) -> DateTime<Utc> {
    at.checked_add_signed(by).unwrap_or(if by < Duration::zero() {
        DateTime::<Utc>::MIN_UTC
    } else {
        DateTime::<Utc>::MAX_UTC
    })
}
