//! # Passkey Authentication
//!
//! No username is asked for up front: the options carry no
//! `allowCredentials`, the authenticator picks a discoverable credential,
//! and the user handle comes back inside the assertion.

use serde_json::Value;

use super::ceremony::{self, CeremonyKind, USER_HANDLE_KEY};
use super::types::{AssertionCredential, AssertionExpectation, Factor, RequestOptions};
use crate::codec::{self, Marshal, Unmarshal};
use crate::db::CredentialRecord;
use crate::error::{AppError, AppResult};
use crate::session::SessionState;
use crate::state::AppState;

pub fn start_authentication(state: &AppState, session: &mut SessionState) -> AppResult<Value> {
    let options = RequestOptions {
        rp_id: state.rp.id.clone(),
        challenge: ceremony::issue_challenge(session, CeremonyKind::Authentication),
        extensions: Default::default(),
    };
    Ok(options.marshal()?)
}

/// Verify an assertion, advance the stored counter and mark the session
/// as authenticated. Returns the user handle (base64).
pub async fn finish_authentication(
    state: &AppState,
    session: &mut SessionState,
    wire: &Value,
) -> AppResult<String> {
    let kind = CeremonyKind::Authentication;
    let challenge = ceremony::pending_challenge(session, kind)?;
    let credential = AssertionCredential::unmarshal(wire)?;

    let handle = credential
        .response
        .user_handle
        .clone()
        .filter(|handle| !handle.is_empty())
        .ok_or(AppError::UnknownUser)?;
    let user_handle = codec::encode_bytes(&handle);

    let record = state.store.find(&user_handle).await?;
    if !record.is_known() {
        return Err(AppError::UnknownUser);
    }

    let expectation = AssertionExpectation {
        challenge,
        origin: session.context().origin(),
        factor: Factor::Either,
        public_key: record.public_key.clone(),
        prev_counter: record.counter,
        user_handle: handle,
    };
    let outcome = state
        .verifier
        .verify_assertion(&credential, &expectation)
        .await;
    ceremony::conclude(kind, &outcome);
    let result = outcome?;

    state
        .store
        .store(CredentialRecord {
            counter: result.new_counter,
            ..record
        })
        .await?;

    ceremony::clear_challenges(session);
    session.set_string(USER_HANDLE_KEY, user_handle.clone());
    tracing::info!(user_handle = %user_handle, counter = result.new_counter, "User authenticated");
    Ok(user_handle)
}
