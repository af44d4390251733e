//! Document store boundary.
//!
//! Aggregates and account entities persist as whole JSON documents with a
//! store-managed revision used for optimistic concurrency.

pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod repository;
pub mod r#trait;

pub use in_memory::InMemoryDocumentStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresDocumentStore;
pub use repository::{Document, Repository};
pub use r#trait::{DocumentStore, StoreError, StoredDocument};
