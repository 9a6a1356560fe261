//! Minimal in-memory keyed store shared by every reference repository
//! adapter in this crate. Production deployments swap these out for real
//! relational-store adapters behind the same trait; this type only exists
//! to make the subsystems independently testable.

use std::collections::HashMap;
use tokio::sync::RwLock;

/// A concurrency-safe `id -> T` map.
pub struct InMemoryStore<T> {
    items: RwLock<HashMap<String, T>>,
}

impl<T> Default for InMemoryStore<T> {
    fn default() -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
        }
    }
}

impl<T: Clone> InMemoryStore<T> {
    /// Construct an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a single item by id.
    pub async fn get(&self, id: &str) -> Option<T> {
        self.items.read().await.get(id).cloned()
    }

    /// Insert or overwrite an item.
    pub async fn put(&self, id: String, item: T) {
        self.items.write().await.insert(id, item);
    }

    /// Remove an item, returning whether one was present.
    pub async fn delete(&self, id: &str) -> bool {
        self.items.write().await.remove(id).is_some()
    }

    /// Snapshot every stored item.
    pub async fn all(&self) -> Vec<T> {
        self.items.read().await.values().cloned().collect()
    }

    /// Remove every item for which `keep` returns `false`, returning the
    /// number removed.
    pub async fn retain(&self, mut keep: impl FnMut(&T) -> bool) -> usize {
        let mut guard = self.items.write().await;
        let before = guard.len();
        guard.retain(|_, v| keep(v));
        before - guard.len()
    }

    /// Number of stored items.
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    /// Whether the store holds no items.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
