//! Service wiring: document store selection, seeding, engine and registry.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use evax_auth::{Argon2CredentialVerifier, CredentialVerifier, TokenIssuer};
use evax_infra::{
    AccountRegistry, AppConfig, DocumentStore, InMemoryDocumentStore, InventoryAccountingEngine,
    KeyedLocks, Repository, seed_demo_cards,
};

#[derive(Clone)]
pub struct AppServices {
    pub engine: InventoryAccountingEngine,
    pub registry: AccountRegistry,
}

impl AppServices {
    /// Wire services over `store`. Engine and registry share one lock table.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        credentials: Arc<dyn CredentialVerifier>,
        tokens: Arc<dyn TokenIssuer>,
    ) -> Self {
        let locks = KeyedLocks::new();
        Self {
            engine: InventoryAccountingEngine::new(Arc::clone(&store), locks.clone()),
            registry: AccountRegistry::new(store, credentials, tokens, locks),
        }
    }
}

pub async fn build_services(
    config: &AppConfig,
    tokens: Arc<dyn TokenIssuer>,
) -> anyhow::Result<AppServices> {
    let store = build_store(config).await?;

    if config.seed_demo_data {
        let seeded = seed_demo_cards(&Repository::new(Arc::clone(&store))).await?;
        info!(seeded, "demo data check complete");
    }

    Ok(AppServices::new(
        store,
        Arc::new(Argon2CredentialVerifier::new()),
        tokens,
    ))
}

async fn build_store(config: &AppConfig) -> anyhow::Result<Arc<dyn DocumentStore>> {
    if config.use_persistent_stores {
        #[cfg(feature = "postgres")]
        {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set when USE_PERSISTENT_STORES=true")?;
            let store = evax_infra::store::PostgresDocumentStore::connect(url)
                .await
                .context("failed to connect to Postgres")?;
            store
                .ensure_schema()
                .await
                .context("failed to create the documents table")?;
            info!("using Postgres document store");
            return Ok(Arc::new(store));
        }
        #[cfg(not(feature = "postgres"))]
        {
            tracing::warn!(
                "USE_PERSISTENT_STORES=true but postgres feature not enabled, falling back to in-memory"
            );
        }
    }

    info!("using in-memory document store");
    Ok(Arc::new(InMemoryDocumentStore::new()))
}
