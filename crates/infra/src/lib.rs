//! Infrastructure layer: document stores, configuration and the services the
//! HTTP layer calls (inventory accounting, account registry).

pub mod config;
pub mod engine;
pub mod error;
pub mod locks;
pub mod registry;
pub mod seed;
pub mod store;

pub use config::{AppConfig, ConfigError};
pub use engine::{AdministerDose, FirstDose, InventoryAccountingEngine, NextDose};
pub use error::{ServiceError, ServiceResult};
pub use locks::KeyedLocks;
pub use registry::{AccountRegistry, NewAdmin, NewStaff, Session};
pub use seed::seed_demo_cards;
pub use store::{DocumentStore, InMemoryDocumentStore, Repository};
