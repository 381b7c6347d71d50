use chrono::{DateTime, Utc};
use std::time::Duration;

/// A stored value and the moment it was stored. Replaced wholesale on
/// re-fetch, never mutated.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub stored_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl<V> CacheEntry<V> {
    pub fn new(value: V, stored_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            value,
            stored_at,
            ttl,
        }
    }

    /// `now - stored_at < ttl`. A `stored_at` in the future counts as fresh.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match now.signed_duration_since(self.stored_at).to_std() {
            Ok(age) => age < self.ttl,
            Err(_) => true,
        }
    }
}
