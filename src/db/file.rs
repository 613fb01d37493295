//! JSON file credential backend
//!
//! The record set is a single JSON document. Each write goes to its own
//! temporary file in the same directory, which is then renamed over the
//! target. Overlapping writers each replace the document whole; the last
//! rename wins.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{CredentialBackend, RecordSet, StoreError};

#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Write `bytes` to a fresh temp file beside `path` and rename it into place.
fn replace_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(path)?;
    Ok(())
}

#[async_trait]
impl CredentialBackend for FileBackend {
    async fn load(&self) -> Result<Option<RecordSet>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let records = serde_json::from_slice(&bytes).map_err(|e| {
            StoreError::Corrupt(format!("{}: {e}", self.path.display()))
        })?;
        Ok(Some(records))
    }

    async fn store(&self, records: &RecordSet) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(records)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || replace_file(&path, &json))
            .await
            .map_err(std::io::Error::other)??;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{CredentialRecord, CredentialStore};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path().join("creds.json"));
        assert!(backend.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creds.json");

        let store = CredentialStore::load(Arc::new(FileBackend::new(&path)))
            .await
            .unwrap();
        store
            .store(CredentialRecord {
                user_handle: "h".into(),
                public_key: "K".into(),
                counter: 2,
            })
            .await
            .unwrap();
        let key = *store.key_material();

        let reopened = CredentialStore::load(Arc::new(FileBackend::new(&path)))
            .await
            .unwrap();
        assert_eq!(reopened.key_material(), &key);
        assert_eq!(reopened.find("h").await.unwrap().counter, 2);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_overlapping_stores_keep_the_document_whole() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creds.json");
        let store = CredentialStore::load(Arc::new(FileBackend::new(&path)))
            .await
            .unwrap();
        for i in 0..200 {
            store
                .store(CredentialRecord {
                    user_handle: format!("seed-{i}"),
                    public_key: "K".repeat(200),
                    counter: i,
                })
                .await
                .unwrap();
        }

        for round in 0..30u32 {
            let writers: Vec<_> = (0..8)
                .map(|w| {
                    let store = store.clone();
                    tokio::spawn(async move {
                        store
                            .store(CredentialRecord {
                                user_handle: format!("writer-{w}"),
                                public_key: "K".into(),
                                counter: round,
                            })
                            .await
                    })
                })
                .collect();
            for writer in writers {
                writer.await.unwrap().unwrap();
            }
        }

        let reopened = CredentialStore::load(Arc::new(FileBackend::new(&path)))
            .await
            .unwrap();
        assert_eq!(reopened.key_material(), store.key_material());
        assert_eq!(reopened.find("seed-199").await.unwrap().counter, 199);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_garbage_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creds.json");
        std::fs::write(&path, b"not json").unwrap();

        let result = FileBackend::new(&path).load().await;
        assert!(matches!(result, Err(StoreError::Corrupt(_))));
    }
}
