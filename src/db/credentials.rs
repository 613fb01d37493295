//! # Credential Store
//!
//! Upsert/lookup of credential records on top of any [`CredentialBackend`].
//!
//! ## Security Note
//! Only public keys and counters are stored. Private keys never leave the
//! user's authenticator.

use std::sync::Arc;

use super::models::{CredentialRecord, KeyMaterial, RecordSet};
use super::{CredentialBackend, StoreError};

/// Credential records plus the session key material, behind one backend.
///
/// The key material is read once in [`CredentialStore::load`] and stays
/// fixed for the lifetime of the store. Records are re-read from the
/// backend on every call so that other processes' writes are seen.
#[derive(Clone)]
pub struct CredentialStore {
    backend: Arc<dyn CredentialBackend>,
    key_material: KeyMaterial,
}

impl CredentialStore {
    /// Open the store, creating and persisting a fresh record set if the
    /// backend is empty.
    ///
    /// Calling this again on the same backend returns the same key material.
    pub async fn load(backend: Arc<dyn CredentialBackend>) -> Result<Self, StoreError> {
        let records = match backend.load().await? {
            Some(records) => {
                tracing::debug!(users = records.users.len(), "Loaded credential record set");
                records
            }
            None => {
                let records = RecordSet::fresh();
                backend.store(&records).await?;
                tracing::info!("Created new credential record set with fresh key material");
                records
            }
        };

        Ok(Self {
            backend,
            key_material: records.symmetric_key,
        })
    }

    /// Look up a credential by user handle.
    ///
    /// An unknown handle yields [`CredentialRecord::unknown`] (empty public
    /// key, counter 0) rather than an error.
    pub async fn find(&self, user_handle: &str) -> Result<CredentialRecord, StoreError> {
        let records = self.current().await?;
        Ok(records
            .find(user_handle)
            .cloned()
            .unwrap_or_else(|| CredentialRecord::unknown(user_handle)))
    }

    /// Insert or replace the record for `record.user_handle` and persist
    /// the full set.
    pub async fn store(&self, record: CredentialRecord) -> Result<(), StoreError> {
        let mut records = self.current().await?;
        tracing::debug!(
            user_handle = %record.user_handle,
            counter = record.counter,
            "Storing credential record"
        );
        records.upsert(record);
        self.backend.store(&records).await
    }

    /// The 16-byte key material used to derive the session cipher key
    pub fn key_material(&self) -> &KeyMaterial {
        &self.key_material
    }

    async fn current(&self) -> Result<RecordSet, StoreError> {
        // Recreate around our key if the persisted set vanished underneath us
        Ok(self.backend.load().await?.unwrap_or_else(|| RecordSet {
            symmetric_key: self.key_material,
            users: Vec::new(),
        }))
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("key_material", &self.key_material)
            .finish_non_exhaustive()
    }
}
