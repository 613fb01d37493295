//! # WebAuthn Module
//!
//! Stateless passkey ceremonies. Challenges live in the encrypted session
//! cookie, credentials in the credential store, and the cryptography
//! behind the [`VerificationService`] trait.
//!
//! ## Submodules
//! - `types`: wire messages, expectations and results
//! - `ceremony`: challenge issuance and per-ceremony state
//! - `registration`: creating new passkey credentials
//! - `authentication`: logging in with existing passkeys
//! - `verifier`: the verification seam and its error taxonomy
//! - `es256`: P-256 implementation of the verification seam
//!
//! ## Registration
//! 1. Client requests options → `registration::start_registration()`
//! 2. Challenge goes into the session cookie and out to the client
//! 3. Client runs `navigator.credentials.create()`
//! 4. Client posts the attestation → `registration::finish_registration()`
//! 5. Public key is stored with counter 0
//!
//! ## Authentication
//! 1. Client requests options → `authentication::start_authentication()`
//! 2. Client runs `navigator.credentials.get()` and posts the assertion
//! 3. `authentication::finish_authentication()` looks up the user handle,
//!    verifies the signature and counter, and marks the session

pub mod authentication;
pub mod authenticator_data;
pub mod ceremony;
pub mod es256;
pub mod registration;
pub mod types;
pub mod verifier;

pub use es256::Es256Verifier;
pub use verifier::{VerificationError, VerificationService};
