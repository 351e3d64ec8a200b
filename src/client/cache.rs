//! Query result cache and invalidation events
//!
//! Results of read operations are stored per (operation, model, variables).
//! Mutations never touch the cache directly: the dispatcher emits a
//! [`CacheInvalidation`] and whoever owns the cache decides what to evict.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde_json::Value as JsonValue;

use crate::graphql::{ModelName, Operation};

/// How a read consults the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchPolicy {
    /// Serve from cache when present, otherwise fetch
    CacheFirst,
    /// Serve cache immediately, then always reconcile with the network
    #[default]
    CacheAndNetwork,
    /// Always fetch, still writing the result to the cache
    NetworkOnly,
    /// Never fetch
    CacheOnly,
}

impl FetchPolicy {
    pub fn reads_cache(&self) -> bool {
        !matches!(self, FetchPolicy::NetworkOnly)
    }
}

/// Cache key: operation plus canonical JSON text of its variables.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub operation: Operation,
    pub model: Option<ModelName>,
    variables: String,
}

impl CacheKey {
    pub fn new(operation: Operation, model: Option<&ModelName>, variables: &JsonValue) -> Self {
        Self {
            operation,
            model: model.cloned(),
            // serde_json keeps object keys sorted without `preserve_order`
            variables: variables.to_string(),
        }
    }
}

/// Hint emitted after a successful mutation: results of `refetch` for
/// `model` are probably stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheInvalidation {
    pub model: ModelName,
    pub operation: Operation,
    pub refetch: Vec<Operation>,
}

impl CacheInvalidation {
    /// Reads that every write to a model may affect.
    pub const DEFAULT_REFETCH: [Operation; 6] = [
        Operation::FindMany,
        Operation::FindUnique,
        Operation::FindManyPaginated,
        Operation::Count,
        Operation::Aggregate,
        Operation::GroupBy,
    ];

    pub fn new(model: ModelName, operation: Operation) -> Self {
        Self {
            model,
            operation,
            refetch: Self::DEFAULT_REFETCH.to_vec(),
        }
    }

    pub fn affects(&self, key: &CacheKey) -> bool {
        key.model.as_ref() == Some(&self.model) && self.refetch.contains(&key.operation)
    }
}

/// In-memory store of query results.
#[derive(Debug, Default)]
pub struct QueryCache {
    entries: RwLock<HashMap<CacheKey, JsonValue>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<JsonValue> {
        self.entries.read().get(key).cloned()
    }

    pub fn put(&self, key: CacheKey, value: JsonValue) {
        self.entries.write().insert(key, value);
    }

    /// Drop entries matched by an invalidation; returns how many were removed.
    pub fn apply(&self, invalidation: &CacheInvalidation) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, _| !invalidation.affects(key));
        before - entries.len()
    }

    pub fn evict_model(&self, model: &ModelName) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, _| key.model.as_ref() != Some(model));
        before - entries.len()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(op: Operation, model: &str, vars: JsonValue) -> CacheKey {
        CacheKey::new(op, Some(&ModelName::new(model)), &vars)
    }

    #[test]
    fn test_key_is_order_insensitive() {
        let a = key(Operation::FindMany, "Product", json!({"a": 1, "b": 2}));
        let b = key(Operation::FindMany, "Product", json!({"b": 2, "a": 1}));
        assert_eq!(a, b);
    }

    #[test]
    fn test_apply_invalidation_only_hits_model() {
        let cache = QueryCache::new();
        cache.put(key(Operation::FindMany, "Product", json!({})), json!([1]));
        cache.put(key(Operation::Count, "Product", json!({})), json!(1));
        cache.put(key(Operation::FindMany, "User", json!({})), json!([2]));

        let removed = cache.apply(&CacheInvalidation::new(
            ModelName::new("Product"),
            Operation::CreateOne,
        ));
        assert_eq!(removed, 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&key(Operation::FindMany, "User", json!({}))).is_some());
    }

    #[test]
    fn test_evict_and_clear() {
        let cache = QueryCache::new();
        cache.put(key(Operation::FindMany, "Order", json!({})), json!([]));
        assert_eq!(cache.evict_model(&ModelName::new("Order")), 1);
        cache.put(key(Operation::FindMany, "Order", json!({})), json!([]));
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_policy_reads_cache() {
        assert!(FetchPolicy::default().reads_cache());
        assert!(!FetchPolicy::NetworkOnly.reads_cache());
    }
}
