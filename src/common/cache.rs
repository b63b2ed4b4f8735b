//! In-memory cache for run-scoped key-value state.
//!
//! Uses moka's high-performance concurrent cache implementation.

use std::collections::HashMap;

use moka::sync::Cache;

/// Thread-safe in-memory cache with configurable capacity.
///
/// Used for storing:
/// - Execution context variables (`MemCache<String, Value>`)
/// - Node results (`MemCache<NodeId, NodeResult>`)
///
/// The cache is backed by moka, which provides thread-safe concurrent
/// access, so observers may read partial progress while a run is active.
#[derive(Clone)]
pub struct MemCache<K, V> {
    variables: Cache<K, V>,
}

impl<K, V> MemCache<K, V>
where
    K: std::hash::Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Allocate a new [`MemCache`].
    pub fn new(capacity: usize) -> Self {
        Self {
            variables: Cache::new(capacity as u64),
        }
    }

    /// Set a value.
    pub fn set(
        &self,
        key: K,
        value: V,
    ) {
        self.variables.insert(key, value);
    }

    /// Get a value through key `&K`.
    pub fn get(
        &self,
        key: &K,
    ) -> Option<V> {
        self.variables.get(key)
    }

    /// Copy the current entries into a plain map.
    pub fn snapshot(&self) -> HashMap<K, V> {
        self.variables.iter().map(|(k, v)| (k.as_ref().clone(), v)).collect()
    }
}
