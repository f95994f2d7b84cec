//! Document store abstraction
//!
//! The rate limiter, the generation cache, user profiles and game rooms all
//! live in an external key-value document store. This module defines the
//! contract (get, set, set-with-merge) and an in-memory implementation used by
//! the standalone binary and the tests.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A stored document: a JSON object
pub type Document = Map<String, Value>;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Document serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Expected a JSON object for {0}")]
    NotAnObject(String),

    #[error("Failed to read seed file: {0}")]
    Seed(#[from] std::io::Error),
}

/// Key-value document API. Implementations must be safe to share across
/// concurrent requests.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document, `None` if absent
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    /// Replace a document
    async fn set(&self, collection: &str, id: &str, doc: Document) -> StoreResult<()>;

    /// Merge fields into a document, creating it if needed. Fields present in
    /// `fields` override, all others are left untouched.
    async fn set_merge(&self, collection: &str, id: &str, fields: Document) -> StoreResult<()>;
}

/// Read a document and deserialize it
pub async fn get_typed<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: &str,
    id: &str,
) -> StoreResult<Option<T>> {
    match store.get(collection, id).await? {
        Some(doc) => Ok(Some(serde_json::from_value(Value::Object(doc))?)),
        None => Ok(None),
    }
}

/// Serialize a value into a document
pub fn to_document<T: Serialize>(value: &T) -> StoreResult<Document> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::NotAnObject(std::any::type_name::<T>().to_string())),
    }
}

type CollectionMap = HashMap<String, HashMap<String, Document>>;

/// In-process store. Nothing is persisted across restarts.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<CollectionMap>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a JSON snapshot of the form
    /// `{ "<collection>": { "<id>": { ...document... } } }`
    pub fn from_snapshot(snapshot: Value) -> StoreResult<Self> {
        let Value::Object(collections) = snapshot else {
            return Err(StoreError::NotAnObject("snapshot".to_string()));
        };

        let mut map = CollectionMap::new();
        for (collection, docs) in collections {
            let Value::Object(docs) = docs else {
                return Err(StoreError::NotAnObject(collection));
            };
            let mut entries = HashMap::new();
            for (id, doc) in docs {
                let Value::Object(doc) = doc else {
                    return Err(StoreError::NotAnObject(format!("{}/{}", collection, id)));
                };
                entries.insert(id, doc);
            }
            map.insert(collection, entries);
        }

        Ok(Self {
            collections: Arc::new(RwLock::new(map)),
        })
    }

    /// Load a snapshot file (see [`MemoryStore::from_snapshot`])
    pub async fn from_seed_file(path: impl AsRef<Path>) -> StoreResult<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let snapshot: Value = serde_json::from_str(&content)?;
        Self::from_snapshot(snapshot)
    }

    /// Number of documents in a collection
    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, HashMap::len)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn set(&self, collection: &str, id: &str, doc: Document) -> StoreResult<()> {
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), doc);
        Ok(())
    }

    async fn set_merge(&self, collection: &str, id: &str, fields: Document) -> StoreResult<()> {
        let mut collections = self.collections.write().await;
        let doc = collections
            .entry(collection.to_string())
            .or_default()
            .entry(id.to_string())
            .or_default();
        for (key, value) in fields {
            doc.insert(key, value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("test document must be an object"),
        }
    }

    #[tokio::test]
    async fn test_get_missing() {
        let store = MemoryStore::new();
        assert!(store.get("users", "nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_replaces() {
        let store = MemoryStore::new();
        store
            .set("users", "u1", doc(json!({"a": 1, "b": 2})))
            .await
            .unwrap();
        store.set("users", "u1", doc(json!({"a": 3}))).await.unwrap();

        let stored = store.get("users", "u1").await.unwrap().unwrap();
        assert_eq!(Value::Object(stored), json!({"a": 3}));
    }

    #[tokio::test]
    async fn test_merge_keeps_unspecified_fields() {
        let store = MemoryStore::new();
        store
            .set_merge("rate_limits", "k", doc(json!({"count": 1, "userId": "u1"})))
            .await
            .unwrap();
        store
            .set_merge("rate_limits", "k", doc(json!({"count": 2})))
            .await
            .unwrap();

        let stored = store.get("rate_limits", "k").await.unwrap().unwrap();
        assert_eq!(Value::Object(stored), json!({"count": 2, "userId": "u1"}));
        assert_eq!(store.count("rate_limits").await, 1);
    }

    #[tokio::test]
    async fn test_snapshot_and_typed_read() {
        #[derive(Debug, serde::Deserialize)]
        struct Profile {
            tier: String,
        }

        let store = MemoryStore::from_snapshot(json!({
            "users": { "u1": { "tier": "premium" } }
        }))
        .unwrap();

        let profile: Profile = get_typed(&store, "users", "u1").await.unwrap().unwrap();
        assert_eq!(profile.tier, "premium");

        let missing: Option<Profile> = get_typed(&store, "users", "u2").await.unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_snapshot_rejects_non_objects() {
        assert!(MemoryStore::from_snapshot(json!([1, 2])).is_err());
        assert!(MemoryStore::from_snapshot(json!({"users": {"u1": 5}})).is_err());
    }

    #[tokio::test]
    async fn test_seed_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            r#"{"game_rooms": {"r1": {"hostId": "h", "status": "waiting"}}}"#,
        )
        .unwrap();

        let store = MemoryStore::from_seed_file(file.path()).await.unwrap();
        assert_eq!(store.count("game_rooms").await, 1);
    }

    #[test]
    fn test_to_document_requires_object() {
        assert!(to_document(&json!({"x": 1})).is_ok());
        assert!(to_document(&5).is_err());
    }
}
