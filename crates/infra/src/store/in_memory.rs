use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use evax_core::ExpectedVersion;

use super::r#trait::{DocumentStore, StoreError, StoredDocument};

type Collection = BTreeMap<String, StoredDocument>;

/// In-memory document store.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> StoreError {
        StoreError::Backend("lock poisoned".to_string())
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn find_by_id(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<StoredDocument>, StoreError> {
        let map = self.collections.read().map_err(|_| Self::poisoned())?;
        Ok(map.get(collection).and_then(|c| c.get(id)).cloned())
    }

    async fn find_one(
        &self,
        collection: &str,
        field: &str,
        value: &JsonValue,
    ) -> Result<Option<StoredDocument>, StoreError> {
        let map = self.collections.read().map_err(|_| Self::poisoned())?;
        Ok(map.get(collection).and_then(|c| {
            c.values()
                .find(|doc| doc.body.get(field) == Some(value))
                .cloned()
        }))
    }

    async fn list(&self, collection: &str) -> Result<Vec<StoredDocument>, StoreError> {
        let map = self.collections.read().map_err(|_| Self::poisoned())?;
        Ok(map
            .get(collection)
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn count(&self, collection: &str) -> Result<u64, StoreError> {
        let map = self.collections.read().map_err(|_| Self::poisoned())?;
        Ok(map.get(collection).map_or(0, |c| c.len() as u64))
    }

    async fn save(
        &self,
        collection: &str,
        id: &str,
        body: JsonValue,
        expected: ExpectedVersion,
    ) -> Result<u64, StoreError> {
        let mut map = self.collections.write().map_err(|_| Self::poisoned())?;
        let docs = map.entry(collection.to_string()).or_default();

        let current = docs.get(id).map_or(0, |d| d.version);
        if !expected.matches(current) {
            return Err(StoreError::Concurrency(format!(
                "{collection}/{id}: expected {expected:?}, found {current}"
            )));
        }

        let version = current + 1;
        docs.insert(
            id.to_string(),
            StoredDocument {
                id: id.to_string(),
                version,
                body,
            },
        );
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn insert_then_update_bumps_revision() {
        let store = InMemoryDocumentStore::new();
        let v1 = store
            .save("staff", "a", json!({"n": 1}), ExpectedVersion::Exact(0))
            .await
            .unwrap();
        let v2 = store
            .save("staff", "a", json!({"n": 2}), ExpectedVersion::Exact(v1))
            .await
            .unwrap();

        assert_eq!((v1, v2), (1, 2));
        let doc = store.find_by_id("staff", "a").await.unwrap().unwrap();
        assert_eq!(doc.body["n"], 2);
        assert_eq!(doc.version, 2);
    }

    #[tokio::test]
    async fn stale_write_is_rejected() {
        let store = InMemoryDocumentStore::new();
        store.upsert("staff", "a", json!({})).await.unwrap();
        store.upsert("staff", "a", json!({})).await.unwrap();

        let err = store
            .save("staff", "a", json!({}), ExpectedVersion::Exact(1))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Concurrency(_)));

        let err = store
            .save("staff", "a", json!({}), ExpectedVersion::Exact(0))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Concurrency(_)));
    }

    #[tokio::test]
    async fn find_one_matches_top_level_field() {
        let store = InMemoryDocumentStore::new();
        store.upsert("admins", "1", json!({"email": "a@x.org"})).await.unwrap();
        store.upsert("admins", "2", json!({"email": "b@x.org"})).await.unwrap();

        let hit = store.find_one("admins", "email", &json!("b@x.org")).await.unwrap();
        assert_eq!(hit.unwrap().id, "2");
        assert!(store.find_one("admins", "email", &json!("c@x.org")).await.unwrap().is_none());
        assert!(store.find_one("staff", "email", &json!("a@x.org")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn collections_are_isolated() {
        let store = InMemoryDocumentStore::new();
        store.upsert("cards", "x", json!({})).await.unwrap();
        assert_eq!(store.count("cards").await.unwrap(), 1);
        assert_eq!(store.count("staff").await.unwrap(), 0);
        assert!(store.list("staff").await.unwrap().is_empty());
    }
}
