//! # Passkey Registration
//!
//! Registration is a two-step process: start and finish.
//!
//! ## Registration Flow
//! 1. **Start**: draw a challenge, keep it in the session cookie, send the
//!    creation options to the client
//! 2. **Finish**: check the attestation against the session's challenge
//!    and the request origin, then store the public key with counter 0
//!
//! ## User handles
//! The handle is `SHA-512(username "@" rp_id)`. It is stable for a given
//! username and relying party, and the username itself is never stored.

use serde_json::Value;
use sha2::{Digest, Sha512};

use super::ceremony::{self, CeremonyKind, REG_USER_KEY};
use super::types::{
    AttestationCredential, AttestationExpectation, CreationOptions, Factor, RegistrationRequest,
    UserEntity, COSE_ALG_ES256,
};
use super::verifier::VerificationError;
use crate::codec::{self, Marshal, Unmarshal};
use crate::db::CredentialRecord;
use crate::error::{AppError, AppResult};
use crate::session::SessionState;
use crate::state::AppState;

/// Opaque, deterministic user handle for `username` under `rp_id`
pub fn derive_user_handle(username: &str, rp_id: &str) -> Vec<u8> {
    Sha512::digest(format!("{username}@{rp_id}").as_bytes()).to_vec()
}

/// Issue registration options.
///
/// With `user` (username, display name) the derived handle is embedded in
/// the options and bound to the session, so the finish step does not have
/// to trust the handle the client sends back. Without it the client fills
/// in the user entity itself.
pub fn start_registration(
    state: &AppState,
    session: &mut SessionState,
    user: Option<(&str, &str)>,
) -> AppResult<Value> {
    let user = user.map(|(username, display_name)| {
        let handle = derive_user_handle(username, &state.rp.id);
        session.set_bytes(REG_USER_KEY, &handle);
        UserEntity {
            id: handle,
            name: username.to_string(),
            display_name: display_name.to_string(),
        }
    });
    if user.is_none() {
        session.remove(REG_USER_KEY);
    }

    let options = CreationOptions {
        rp: state.rp.clone(),
        user,
        challenge: ceremony::issue_challenge(session, CeremonyKind::Registration),
        algorithms: vec![COSE_ALG_ES256],
        extensions: Default::default(),
    };
    Ok(options.marshal()?)
}

/// Verify a registration response and persist the new credential.
///
/// Returns the stored user handle (base64).
///
/// ## Errors
/// - Verification: no pending challenge, or the verifier rejected the
///   attestation, or it yielded a nonzero counter or no public key
/// - MarshalTypeMismatch: the attestation does not fit its schema
/// - BadRequest: no usable user handle, or the session and the body disagree
/// - Store: the credential could not be persisted
pub async fn finish_registration(
    state: &AppState,
    session: &mut SessionState,
    request: RegistrationRequest,
) -> AppResult<String> {
    let kind = CeremonyKind::Registration;
    let challenge = ceremony::pending_challenge(session, kind)?;
    let credential = AttestationCredential::unmarshal(&request.attestation)?;
    let handle = resolve_handle(session, request.user.as_deref())?;

    let expectation = AttestationExpectation {
        challenge,
        origin: session.context().origin(),
        factor: Factor::Either,
    };
    let outcome = state
        .verifier
        .verify_attestation(&credential, &expectation)
        .await;
    ceremony::conclude(kind, &outcome);
    let result = outcome?;

    if result.counter != 0 {
        return Err(VerificationError::InvalidCredential("nonzero initial counter").into());
    }
    if result.public_key.is_empty() {
        return Err(VerificationError::InvalidCredential("no public key").into());
    }

    let user_handle = codec::encode_bytes(&handle);
    state
        .store
        .store(CredentialRecord {
            user_handle: user_handle.clone(),
            public_key: result.public_key,
            counter: 0,
        })
        .await?;

    ceremony::clear_challenges(session);
    tracing::info!(user_handle = %user_handle, "Registered passkey");
    Ok(user_handle)
}

/// The handle to register: the one bound at issuance if any, otherwise
/// the one the client sent.
fn resolve_handle(session: &SessionState, claimed: Option<&str>) -> AppResult<Vec<u8>> {
    let claimed = claimed
        .map(codec::decode_bytes)
        .transpose()
        .map_err(|_| AppError::BadRequest("user handle is not base64".to_string()))?
        .filter(|handle| !handle.is_empty());

    match (session.get_bytes(REG_USER_KEY), claimed) {
        (Some(bound), Some(claimed)) if bound != claimed => Err(AppError::BadRequest(
            "user handle differs from the one issued".to_string(),
        )),
        (Some(bound), _) => Ok(bound),
        (None, Some(claimed)) => Ok(claimed),
        (None, None) => Err(AppError::BadRequest("missing user handle".to_string())),
    }
}
