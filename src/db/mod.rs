//! # Credential Persistence
//!
//! This module owns the only durable, cross-request state of the server:
//! the symmetric key material and one credential record per user.
//!
//! ## Submodules
//! - `models`: the record set, credential records and key material
//! - `credentials`: [`CredentialStore`], the logic every handler talks to
//! - `memory`, `file`, `sqlite`: one [`CredentialBackend`] adapter per
//!   persistence technology
//!
//! ## Consistency
//! Backends load and store the whole record set. There is no locking:
//! concurrent writers follow last-write-wins. A lost write can at worst
//! leave a stale counter, which the "new counter must exceed previous"
//! rule turns into a rejected login, never an accepted replay.

pub mod credentials;
pub mod file;
pub mod memory;
pub mod models;
pub mod sqlite;

pub use credentials::CredentialStore;
pub use file::FileBackend;
pub use memory::MemoryBackend;
pub use models::{CredentialRecord, KeyMaterial, RecordSet};
pub use sqlite::SqliteBackend;

use async_trait::async_trait;

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt record set: {0}")]
    Corrupt(String),
}

/// Raw load/store of the whole record set.
///
/// `load` returns `Ok(None)` when nothing has been persisted yet; creating
/// the initial set is [`CredentialStore::load`]'s job.
#[async_trait]
pub trait CredentialBackend: Send + Sync {
    async fn load(&self) -> Result<Option<RecordSet>, StoreError>;

    async fn store(&self, records: &RecordSet) -> Result<(), StoreError>;
}
