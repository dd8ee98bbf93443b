//! Postgres-backed status store: one row per key in `sheaf_status.entries`.

use anyhow::Context;
use async_trait::async_trait;
use sheaf_core::StatusStore;
use sqlx::{PgPool, Row};
use tracing::debug;

use crate::error::{DataError, Result};

const UPSERT_ENTRY_SQL: &str = r"
    INSERT INTO sheaf_status.entries (key, value, updated_at)
    VALUES ($1, $2, now())
    ON CONFLICT (key) DO UPDATE
    SET
        value = EXCLUDED.value,
        updated_at = EXCLUDED.updated_at
";

const DELETE_ENTRY_SQL: &str = r"
    DELETE FROM sheaf_status.entries
    WHERE key = $1
";

const SELECT_ENTRY_SQL: &str = r"
    SELECT value
    FROM sheaf_status.entries
    WHERE key = $1
";

/// Database-backed status store.
#[derive(Clone)]
pub struct PgStatusStore {
    pool: PgPool,
}

impl PgStatusStore {
    /// Initialise the store, applying pending migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if migrations fail or the database is unreachable.
    pub async fn new(pool: PgPool) -> Result<Self> {
        let mut migrator = sqlx::migrate!("./migrations");
        migrator.set_ignore_missing(true);
        migrator
            .run(&pool)
            .await
            .map_err(|source| DataError::MigrationFailed { source })?;
        Ok(Self { pool })
    }

    /// Access the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn upsert(&self, key: &str, value: &[u8]) -> Result<()> {
        sqlx::query(UPSERT_ENTRY_SQL)
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await
            .map_err(|source| query_failed("upsert", key, source))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query(DELETE_ENTRY_SQL)
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|source| query_failed("delete", key, source))?;
        Ok(())
    }

    async fn fetch(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let row = sqlx::query(SELECT_ENTRY_SQL)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|source| query_failed("select", key, source))?;
        row.map(|row| row.try_get::<Vec<u8>, _>("value"))
            .transpose()
            .map_err(|source| query_failed("decode", key, source))
    }
}

#[async_trait]
impl StatusStore for PgStatusStore {
    async fn put(&self, key: &str, value: Option<Vec<u8>>) -> anyhow::Result<()> {
        debug!(key, delete = value.is_none(), "writing status entry");
        match value {
            Some(value) => self.upsert(key, &value).await,
            None => self.delete(key).await,
        }
        .context("failed to write status entry")
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        self.fetch(key)
            .await
            .context("failed to read status entry")
    }
}

fn query_failed(operation: &'static str, key: &str, source: sqlx::Error) -> DataError {
    DataError::QueryFailed {
        operation,
        key: key.to_string(),
        source,
    }
}
