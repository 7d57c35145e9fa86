//! In-memory storage backend
//!
//! Backed by a [`DashMap`] so a single instance can be shared across tasks
//! through `Arc<dyn Storage>`.

use crate::debug::DebugSink;
use crate::error::StorageResult;
use crate::storage::{check_superuser, Storage, SUPERUSER_AUTHORITY};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::BTreeMap;

/// Volatile key/value store
#[derive(Debug)]
pub struct InMemoryStorage {
    entries: DashMap<String, Value>,
    authorities: Vec<String>,
}

impl InMemoryStorage {
    /// Create empty store whose principal holds the superuser authority
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_authorities([SUPERUSER_AUTHORITY])
    }

    /// Create empty store for a principal with the given authorities
    #[must_use]
    pub fn with_authorities<I, S>(authorities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: DashMap::new(),
            authorities: authorities.into_iter().map(Into::into).collect(),
        }
    }

    /// Seed an entry (builder style)
    #[must_use]
    pub fn with_entry(self, key: impl Into<String>, value: Value) -> Self {
        self.entries.insert(key.into(), value);
        self
    }

    /// Check if key exists
    #[inline]
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Raw value for key
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<Value> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Ordered copy of every entry
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Number of stored keys
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if store is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn get_value(&self, key: &str) -> StorageResult<Option<Value>> {
        Ok(self.raw(key))
    }

    async fn save_value(&self, key: &str, value: Value) -> StorageResult<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn get_keys(&self) -> StorageResult<Vec<String>> {
        let mut keys: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        Ok(keys)
    }

    async fn has_permission(&self, debug: &DebugSink) -> StorageResult<()> {
        check_superuser(&self.authorities, debug)
    }
}
