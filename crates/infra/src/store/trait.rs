use async_trait::async_trait;
use serde_json::Value as JsonValue;
use thiserror::Error;

use evax_core::ExpectedVersion;

/// A JSON document as persisted, with its store-managed revision.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    /// Bumped on every successful write; `1` after the first insert.
    pub version: u64,
    pub body: JsonValue,
}

/// Document store operation error.
///
/// These are **infrastructure errors** (storage, concurrency, encoding) as
/// opposed to domain errors (validation, invariants).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("document encoding failed: {0}")]
    Serialization(String),

    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Collection-scoped JSON document store.
///
/// ## Write semantics
///
/// `save()` checks `expected` against the stored revision before writing:
/// - `Exact(0)`: the document must not exist yet (insert)
/// - `Exact(n)`: the document must be at revision `n` (update)
/// - `Any`: insert or overwrite unconditionally
///
/// and returns the new revision. There are no multi-document transactions.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_by_id(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<StoredDocument>, StoreError>;

    /// First document (in id order) whose top-level `field` equals `value`.
    async fn find_one(
        &self,
        collection: &str,
        field: &str,
        value: &JsonValue,
    ) -> Result<Option<StoredDocument>, StoreError>;

    /// All documents of a collection, in id order.
    async fn list(&self, collection: &str) -> Result<Vec<StoredDocument>, StoreError>;

    async fn count(&self, collection: &str) -> Result<u64, StoreError>;

    async fn save(
        &self,
        collection: &str,
        id: &str,
        body: JsonValue,
        expected: ExpectedVersion,
    ) -> Result<u64, StoreError>;

    async fn upsert(&self, collection: &str, id: &str, body: JsonValue) -> Result<u64, StoreError> {
        self.save(collection, id, body, ExpectedVersion::Any).await
    }
}
