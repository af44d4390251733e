use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use evax_core::{AggregateRoot, Entity, ExpectedVersion};
use evax_inventory::StockPool;
use evax_parties::{Admin, Citizen, Staff};
use evax_records::VaccineCard;

use super::r#trait::{DocumentStore, StoreError, StoredDocument};

/// A domain type persisted as one JSON document.
///
/// The revision is not part of the JSON body; the store owns it and the
/// repository copies it onto the value after every load and save.
pub trait Document: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: &'static str;

    fn document_id(&self) -> String;

    fn revision(&self) -> u64;

    fn set_revision(&mut self, revision: u64);
}

impl Document for StockPool {
    const COLLECTION: &'static str = "stock";

    fn document_id(&self) -> String {
        self.id().to_string()
    }

    fn revision(&self) -> u64 {
        self.version()
    }

    fn set_revision(&mut self, revision: u64) {
        self.set_version(revision);
    }
}

impl Document for Staff {
    const COLLECTION: &'static str = "staff";

    fn document_id(&self) -> String {
        self.id().to_string()
    }

    fn revision(&self) -> u64 {
        self.version()
    }

    fn set_revision(&mut self, revision: u64) {
        self.set_version(revision);
    }
}

impl Document for VaccineCard {
    const COLLECTION: &'static str = "vaccine_cards";

    fn document_id(&self) -> String {
        self.birth_id().to_string()
    }

    fn revision(&self) -> u64 {
        self.version()
    }

    fn set_revision(&mut self, revision: u64) {
        self.set_version(revision);
    }
}

impl Document for Admin {
    const COLLECTION: &'static str = "admins";

    fn document_id(&self) -> String {
        Entity::id(self).to_string()
    }

    fn revision(&self) -> u64 {
        self.version()
    }

    fn set_revision(&mut self, revision: u64) {
        self.set_version(revision);
    }
}

impl Document for Citizen {
    const COLLECTION: &'static str = "citizens";

    fn document_id(&self) -> String {
        Entity::id(self).to_string()
    }

    fn revision(&self) -> u64 {
        self.version()
    }

    fn set_revision(&mut self, revision: u64) {
        self.set_version(revision);
    }
}

/// Typed view of one collection.
pub struct Repository<D> {
    store: Arc<dyn DocumentStore>,
    _marker: PhantomData<fn() -> D>,
}

impl<D> Clone for Repository<D> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _marker: PhantomData,
        }
    }
}

impl<D: Document> Repository<D> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    pub async fn get(&self, id: &str) -> Result<Option<D>, StoreError> {
        self.store
            .find_by_id(D::COLLECTION, id)
            .await?
            .map(Self::decode)
            .transpose()
    }

    pub async fn find_by(&self, field: &str, value: &str) -> Result<Option<D>, StoreError> {
        self.store
            .find_one(D::COLLECTION, field, &JsonValue::from(value))
            .await?
            .map(Self::decode)
            .transpose()
    }

    pub async fn list(&self) -> Result<Vec<D>, StoreError> {
        self.store
            .list(D::COLLECTION)
            .await?
            .into_iter()
            .map(Self::decode)
            .collect()
    }

    pub async fn count(&self) -> Result<u64, StoreError> {
        self.store.count(D::COLLECTION).await
    }

    /// Write `doc` if its revision still matches the stored one.
    pub async fn save(&self, doc: &mut D) -> Result<(), StoreError> {
        self.write(doc, ExpectedVersion::Exact(doc.revision())).await
    }

    /// Write `doc` regardless of the stored revision.
    pub async fn upsert(&self, doc: &mut D) -> Result<(), StoreError> {
        self.write(doc, ExpectedVersion::Any).await
    }

    async fn write(&self, doc: &mut D, expected: ExpectedVersion) -> Result<(), StoreError> {
        let body =
            serde_json::to_value(&*doc).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let revision = self
            .store
            .save(D::COLLECTION, &doc.document_id(), body, expected)
            .await?;
        doc.set_revision(revision);
        Ok(())
    }

    fn decode(stored: StoredDocument) -> Result<D, StoreError> {
        let mut doc: D = serde_json::from_value(stored.body).map_err(|e| {
            StoreError::Serialization(format!("{}/{}: {e}", D::COLLECTION, stored.id))
        })?;
        doc.set_revision(stored.version);
        Ok(doc)
    }
}
