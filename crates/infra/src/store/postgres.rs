//! Postgres-backed document store.
//!
//! Every collection shares one `documents` table keyed by `(collection, id)`,
//! with the JSON body in a `jsonb` column and the revision in `version`.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Concurrency` |
//! | Database (other) | any other | `Backend` |
//! | Other | N/A | `Backend` |

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::instrument;

use evax_core::ExpectedVersion;

use super::r#trait::{DocumentStore, StoreError, StoredDocument};

#[derive(Debug, Clone)]
pub struct PostgresDocumentStore {
    pool: PgPool,
}

impl PostgresDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create the `documents` table if it does not exist.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                version BIGINT NOT NULL CHECK (version > 0),
                body JSONB NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (collection, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }
}

fn row_to_document(row: &sqlx::postgres::PgRow) -> Result<StoredDocument, StoreError> {
    let id: String = row
        .try_get("id")
        .map_err(|e| StoreError::Backend(format!("failed to read id: {e}")))?;
    let version: i64 = row
        .try_get("version")
        .map_err(|e| StoreError::Backend(format!("failed to read version: {e}")))?;
    let body: JsonValue = row
        .try_get("body")
        .map_err(|e| StoreError::Backend(format!("failed to read body: {e}")))?;
    Ok(StoredDocument {
        id,
        version: version as u64,
        body,
    })
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    #[instrument(skip(self), err)]
    async fn find_by_id(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<StoredDocument>, StoreError> {
        let row = sqlx::query(
            "SELECT id, version, body FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_by_id", e))?;

        row.as_ref().map(row_to_document).transpose()
    }

    #[instrument(skip(self), err)]
    async fn find_one(
        &self,
        collection: &str,
        field: &str,
        value: &JsonValue,
    ) -> Result<Option<StoredDocument>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, version, body
            FROM documents
            WHERE collection = $1 AND body -> $2 = $3
            ORDER BY id ASC
            LIMIT 1
            "#,
        )
        .bind(collection)
        .bind(field)
        .bind(value)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_one", e))?;

        row.as_ref().map(row_to_document).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list(&self, collection: &str) -> Result<Vec<StoredDocument>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, version, body FROM documents WHERE collection = $1 ORDER BY id ASC",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list", e))?;

        rows.iter().map(row_to_document).collect()
    }

    #[instrument(skip(self), err)]
    async fn count(&self, collection: &str) -> Result<u64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM documents WHERE collection = $1")
            .bind(collection)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count", e))?;
        let n: i64 = row
            .try_get("n")
            .map_err(|e| StoreError::Backend(format!("failed to read count: {e}")))?;
        Ok(n as u64)
    }

    #[instrument(skip(self, body), err)]
    async fn save(
        &self,
        collection: &str,
        id: &str,
        body: JsonValue,
        expected: ExpectedVersion,
    ) -> Result<u64, StoreError> {
        let row = match expected {
            ExpectedVersion::Exact(0) => {
                sqlx::query(
                    r#"
                    INSERT INTO documents (collection, id, version, body)
                    VALUES ($1, $2, 1, $3)
                    ON CONFLICT (collection, id) DO NOTHING
                    RETURNING version
                    "#,
                )
                .bind(collection)
                .bind(id)
                .bind(&body)
                .fetch_optional(&self.pool)
                .await
            }
            ExpectedVersion::Exact(current) => {
                sqlx::query(
                    r#"
                    UPDATE documents
                    SET body = $3, version = version + 1, updated_at = NOW()
                    WHERE collection = $1 AND id = $2 AND version = $4
                    RETURNING version
                    "#,
                )
                .bind(collection)
                .bind(id)
                .bind(&body)
                .bind(current as i64)
                .fetch_optional(&self.pool)
                .await
            }
            ExpectedVersion::Any => {
                sqlx::query(
                    r#"
                    INSERT INTO documents (collection, id, version, body)
                    VALUES ($1, $2, 1, $3)
                    ON CONFLICT (collection, id) DO UPDATE
                    SET body = EXCLUDED.body,
                        version = documents.version + 1,
                        updated_at = NOW()
                    RETURNING version
                    "#,
                )
                .bind(collection)
                .bind(id)
                .bind(&body)
                .fetch_optional(&self.pool)
                .await
            }
        }
        .map_err(|e| map_sqlx_error("save", e))?;

        let Some(row) = row else {
            return Err(StoreError::Concurrency(format!(
                "{collection}/{id}: expected {expected:?}"
            )));
        };
        let version: i64 = row
            .try_get("version")
            .map_err(|e| StoreError::Backend(format!("failed to read version: {e}")))?;
        Ok(version as u64)
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Concurrency(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {operation}"))
        }
        _ => StoreError::Backend(format!("sqlx error in {operation}: {err}")),
    }
}
