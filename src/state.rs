//! # Application State
//!
//! Resources shared by every request handler. Axum clones the state for
//! each request, which is cheap: everything inside is an `Arc` or a handle.
//!
//! ## Initialization order
//! 1. Credential backend (sqlite, file or memory)
//! 2. [`CredentialStore::load`], which creates the key material on first run
//! 3. [`SessionCipher`], keyed from that material
//! 4. The verification service
//!
//! Nothing is initialized lazily on first use.

use std::sync::Arc;

use anyhow::Result;

use crate::config::{Config, StoreBackend};
use crate::db::{CredentialBackend, CredentialStore, FileBackend, MemoryBackend, SqliteBackend};
use crate::session::SessionCipher;
use crate::webauthn::types::RelyingParty;
use crate::webauthn::{Es256Verifier, VerificationService};

#[derive(Clone)]
pub struct AppState {
    /// Credential records and session key material
    pub store: CredentialStore,

    /// Seals and opens the `SESSION` cookie
    pub cipher: Arc<SessionCipher>,

    /// Attestation and assertion verification
    pub verifier: Arc<dyn VerificationService>,

    pub rp: RelyingParty,
}

impl AppState {
    /// Build the state from configuration.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be opened (connection,
    /// migrations) or the persisted record set cannot be read or created.
    pub async fn new(config: &Config) -> Result<Self> {
        let backend: Arc<dyn CredentialBackend> = match config.store_backend {
            StoreBackend::Sqlite => Arc::new(SqliteBackend::connect(&config.database_url).await?),
            StoreBackend::File => Arc::new(FileBackend::new(&config.cred_store_path)),
            StoreBackend::Memory => Arc::new(MemoryBackend::default()),
        };
        tracing::debug!(backend = ?config.store_backend, "Credential backend ready");

        let store = CredentialStore::load(backend).await?;
        let rp = RelyingParty {
            id: config.rp_id.clone(),
            name: config.rp_name.clone(),
        };
        let verifier = Arc::new(Es256Verifier::new(rp.id.clone()));

        Ok(Self::with_parts(store, verifier, rp))
    }

    /// Assemble the state from an opened store and a verifier.
    pub fn with_parts(
        store: CredentialStore,
        verifier: Arc<dyn VerificationService>,
        rp: RelyingParty,
    ) -> Self {
        let cipher = Arc::new(SessionCipher::new(store.key_material()));
        Self {
            store,
            cipher,
            verifier,
            rp,
        }
    }
}
