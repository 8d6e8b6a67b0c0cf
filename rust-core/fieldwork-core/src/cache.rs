//! # Field Caches
//!
//! Bounded memoization of validated and serialized values, one pair of caches
//! per field instance. Keys are canonical value keys (`Value::cache_key`).

use crate::value::Value;
use moka::sync::Cache;
use std::fmt;

/// Per-field memo of validation and serialization results
///
/// A capacity of zero disables both caches.
#[derive(Clone)]
pub struct FieldCache {
    capacity: u64,
    validated: Option<Cache<String, Value>>,
    serialized: Option<Cache<(String, String), Value>>,
}

impl FieldCache {
    /// Create caches holding at most `capacity` entries each
    #[must_use]
    pub fn new(capacity: u64) -> Self {
        if capacity == 0 {
            return Self::disabled();
        }
        Self {
            capacity,
            validated: Some(Cache::new(capacity)),
            serialized: Some(Cache::new(capacity)),
        }
    }

    /// Caches that never store anything
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            capacity: 0,
            validated: None,
            serialized: None,
        }
    }

    /// Fresh, empty caches with the same capacity
    #[must_use]
    pub fn fresh(&self) -> Self {
        Self::new(self.capacity)
    }

    /// Configured capacity
    #[must_use]
    pub const fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Look up a validated value
    #[must_use]
    pub fn validated(&self, key: &str) -> Option<Value> {
        self.validated.as_ref()?.get(key)
    }

    /// Remember a validated value
    pub fn store_validated(&self, key: String, value: Value) {
        if let Some(cache) = &self.validated {
            cache.insert(key, value);
        }
    }

    /// Look up a serialized value for `format`
    #[must_use]
    pub fn serialized(&self, format: &str, key: &str) -> Option<Value> {
        self.serialized
            .as_ref()?
            .get(&(format.to_string(), key.to_string()))
    }

    /// Remember a serialized value for `format`
    pub fn store_serialized(&self, format: &str, key: String, value: Value) {
        if let Some(cache) = &self.serialized {
            cache.insert((format.to_string(), key), value);
        }
    }

    /// Drop every cached entry
    pub fn clear(&self) {
        if let Some(cache) = &self.validated {
            cache.invalidate_all();
        }
        if let Some(cache) = &self.serialized {
            cache.invalidate_all();
        }
    }
}

impl fmt::Debug for FieldCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldCache")
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}
