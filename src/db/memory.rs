//! In-memory credential backend
//!
//! Nothing survives a restart, and a restart also means new key material,
//! so every outstanding session cookie becomes unreadable. Useful for tests
//! and throwaway development runs.

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{CredentialBackend, RecordSet, StoreError};

#[derive(Default)]
pub struct MemoryBackend {
    records: Mutex<Option<RecordSet>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialBackend for MemoryBackend {
    async fn load(&self) -> Result<Option<RecordSet>, StoreError> {
        Ok(self.records.lock().await.clone())
    }

    async fn store(&self, records: &RecordSet) -> Result<(), StoreError> {
        *self.records.lock().await = Some(records.clone());
        Ok(())
    }
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend").finish_non_exhaustive()
    }
}
