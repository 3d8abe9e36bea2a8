//! In-memory resolution cache for a single discovery run.

use dashmap::DashMap;
use std::sync::Arc;

/// Thread-safe map from queried name to resolved addresses.
///
/// An empty address list is a confirmed negative answer, distinct from a
/// name that was never queried. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct DnsCache {
    cache: Arc<DashMap<String, Vec<String>>>,
}

impl DnsCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the cached addresses for `name`, or `None` if it was never resolved.
    pub fn get(&self, name: &str) -> Option<Vec<String>> {
        self.cache.get(name).map(|entry| entry.value().clone())
    }

    /// Store the addresses for `name`, replacing any previous answer.
    pub fn set(&self, name: &str, addresses: Vec<String>) {
        self.cache.insert(name.to_string(), addresses);
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
