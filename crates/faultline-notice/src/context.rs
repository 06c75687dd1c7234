//! Process-scoped context store
//!
//! Context set here is merged into every notice built through the store's
//! owner. Clones share the same underlying map.

use faultline_sanitize::Data;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::Arc;

/// Shared key/value context
#[derive(Debug, Clone, Default)]
pub struct ContextStore {
    entries: Arc<RwLock<IndexMap<String, Data>>>,
}

impl ContextStore {
    /// Create an empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge entries, overwriting existing keys
    pub fn merge<I, K, V>(&self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Data>,
    {
        let mut map = self.entries.write();
        for (k, v) in entries {
            map.insert(k.into(), v.into());
        }
    }

    /// Set a single entry
    pub fn set(&self, key: impl Into<String>, value: impl Into<Data>) {
        self.entries.write().insert(key.into(), value.into());
    }

    /// Remove every entry
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Check if the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Copy of the current entries, in insertion order
    #[must_use]
    pub fn snapshot(&self) -> Vec<(String, Data)> {
        self.entries
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
