//! Payload cache for query results.

use armature_graphql_proxy::{GraphQLResponse, OperationKey};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Store of query results keyed by [`OperationKey`].
///
/// Reads are synchronous so a watcher can settle from cache without
/// yielding to the runtime.
pub trait PayloadCache: Send + Sync {
    /// Get the stored result for a key.
    fn get(&self, key: &OperationKey) -> Option<GraphQLResponse>;

    /// Store a result. Later writes replace earlier ones.
    fn set(&self, key: &OperationKey, response: GraphQLResponse);

    /// Remove a stored result.
    fn remove(&self, key: &OperationKey);

    /// Remove all stored results.
    fn clear(&self);
}

impl<C: PayloadCache + ?Sized> PayloadCache for Arc<C> {
    fn get(&self, key: &OperationKey) -> Option<GraphQLResponse> {
        (**self).get(key)
    }

    fn set(&self, key: &OperationKey, response: GraphQLResponse) {
        (**self).set(key, response)
    }

    fn remove(&self, key: &OperationKey) {
        (**self).remove(key)
    }

    fn clear(&self) {
        (**self).clear()
    }
}

/// In-memory payload cache.
///
/// Can be seeded with a snapshot taken elsewhere, e.g. results fetched during
/// server-side rendering and shipped with the page.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPayloadCache {
    data: Arc<RwLock<HashMap<String, GraphQLResponse>>>,
}

impl InMemoryPayloadCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache seeded from a snapshot.
    pub fn seeded(snapshot: HashMap<String, GraphQLResponse>) -> Self {
        Self {
            data: Arc::new(RwLock::new(snapshot)),
        }
    }

    /// Merge a snapshot into the cache.
    pub fn seed(&self, snapshot: HashMap<String, GraphQLResponse>) {
        self.data.write().extend(snapshot);
    }

    /// Copy of all stored results.
    pub fn snapshot(&self) -> HashMap<String, GraphQLResponse> {
        self.data.read().clone()
    }

    /// Number of stored results.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl PayloadCache for InMemoryPayloadCache {
    fn get(&self, key: &OperationKey) -> Option<GraphQLResponse> {
        self.data.read().get(key.as_str()).cloned()
    }

    fn set(&self, key: &OperationKey, response: GraphQLResponse) {
        self.data.write().insert(key.as_str().to_string(), response);
    }

    fn remove(&self, key: &OperationKey) {
        self.data.write().remove(key.as_str());
    }

    fn clear(&self) {
        self.data.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use armature_graphql_proxy::OperationKind;
    use serde_json::json;

    fn key(id: &str) -> OperationKey {
        OperationKey::build(OperationKind::Query, "filmById", Some(&json!({ "id": id })))
    }

    #[test]
    fn test_set_and_get() {
        let cache = InMemoryPayloadCache::new();
        assert!(cache.get(&key("1")).is_none());

        cache.set(&key("1"), GraphQLResponse::from_data(json!({ "title": "A" })));
        assert_eq!(
            cache.get(&key("1")).unwrap().data,
            Some(json!({ "title": "A" }))
        );
        assert!(cache.get(&key("2")).is_none());
    }

    #[test]
    fn test_last_write_wins() {
        let cache = InMemoryPayloadCache::new();
        cache.set(&key("1"), GraphQLResponse::from_data(json!(1)));
        cache.set(&key("1"), GraphQLResponse::from_data(json!(2)));

        assert_eq!(cache.get(&key("1")).unwrap().data, Some(json!(2)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_seed_and_snapshot() {
        let source = InMemoryPayloadCache::new();
        source.set(&key("1"), GraphQLResponse::from_data(json!("one")));

        let target = InMemoryPayloadCache::seeded(source.snapshot());
        assert_eq!(target.get(&key("1")).unwrap().data, Some(json!("one")));

        target.remove(&key("1"));
        assert!(target.is_empty());
        assert_eq!(source.len(), 1);
    }

    #[test]
    fn test_concurrent_writers() {
        let cache = InMemoryPayloadCache::new();

        std::thread::scope(|scope| {
            for i in 0..8 {
                let cache = cache.clone();
                scope.spawn(move || {
                    cache.set(&key(&i.to_string()), GraphQLResponse::from_data(json!(i)));
                });
            }
        });

        assert_eq!(cache.len(), 8);
    }

    #[test]
    fn test_clones_share_storage() {
        let cache = InMemoryPayloadCache::new();
        let shared = cache.clone();
        shared.set(&key("1"), GraphQLResponse::from_data(json!(true)));

        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(shared.is_empty());
    }
}
