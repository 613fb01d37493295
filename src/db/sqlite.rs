//! SQLite credential backend
//!
//! The record set is spread over two tables (see `migrations/`):
//! - `key_material`: a single row holding the base64 symmetric key
//! - `credentials`: one row per user handle
//!
//! `store` rewrites both tables inside one transaction, which keeps the
//! whole-set semantics of the other backends.

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use super::models::{CredentialRecord, KeyMaterial};
use super::{CredentialBackend, RecordSet, StoreError};

/// Row in the `credentials` table
#[derive(Debug, sqlx::FromRow)]
struct CredentialRow {
    user_handle: String,
    public_key: String,
    counter: i64,
}

#[derive(Debug, Clone)]
pub struct SqliteBackend {
    pool: SqlitePool,
}

impl SqliteBackend {
    /// Connect to `database_url` and run the embedded migrations.
    ///
    /// Format: `sqlite:filename.db?mode=rwc` (read, write, create)
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = SqlitePool::connect(database_url).await?;
        Self::from_pool(pool).await
    }

    /// A private in-memory database.
    ///
    /// Limited to one connection: every SQLite `:memory:` connection is a
    /// separate database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl CredentialBackend for SqliteBackend {
    async fn load(&self) -> Result<Option<RecordSet>, StoreError> {
        let key: Option<String> =
            sqlx::query_scalar("SELECT symmetric_key FROM key_material WHERE id = 1")
                .fetch_optional(&self.pool)
                .await?;

        let Some(key) = key else {
            return Ok(None);
        };
        let symmetric_key = KeyMaterial::from_base64(&key)
            .ok_or_else(|| StoreError::Corrupt("invalid symmetric_key".to_string()))?;

        let rows = sqlx::query_as::<_, CredentialRow>(
            "SELECT user_handle, public_key, counter FROM credentials ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;

        let users = rows
            .into_iter()
            .map(|row| {
                let counter = u32::try_from(row.counter).map_err(|_| {
                    StoreError::Corrupt(format!(
                        "counter {} out of range for {}",
                        row.counter, row.user_handle
                    ))
                })?;
                Ok(CredentialRecord {
                    user_handle: row.user_handle,
                    public_key: row.public_key,
                    counter,
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        Ok(Some(RecordSet {
            symmetric_key,
            users,
        }))
    }

    async fn store(&self, records: &RecordSet) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT OR REPLACE INTO key_material (id, symmetric_key) VALUES (1, ?)")
            .bind(records.symmetric_key.to_base64())
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM credentials")
            .execute(&mut *tx)
            .await?;

        for user in &records.users {
            sqlx::query(
                "INSERT INTO credentials (user_handle, public_key, counter) VALUES (?, ?, ?)",
            )
            .bind(&user.user_handle)
            .bind(&user.public_key)
            .bind(i64::from(user.counter))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
