//! # Ceremony State
//!
//! Each ceremony kind runs `Idle → ChallengeIssued → Verified | Rejected`.
//! The server keeps none of this: the state is read back from the
//! session cookie on every request.
//!
//! ## Session keys
//! - `reg-challenge` / `auth-challenge`: the pending challenge bytes
//! - `reg-user`: handle bound to a pending registration
//! - `userHandle`: set once an authentication has been verified

use rand::RngCore;

use super::verifier::VerificationError;
use crate::session::SessionState;

pub const REG_CHALLENGE_KEY: &str = "reg-challenge";
pub const AUTH_CHALLENGE_KEY: &str = "auth-challenge";
pub const REG_USER_KEY: &str = "reg-user";
pub const USER_HANDLE_KEY: &str = "userHandle";

/// Challenge length in bytes
pub const CHALLENGE_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CeremonyKind {
    Registration,
    Authentication,
}

impl CeremonyKind {
    pub fn challenge_key(self) -> &'static str {
        match self {
            CeremonyKind::Registration => REG_CHALLENGE_KEY,
            CeremonyKind::Authentication => AUTH_CHALLENGE_KEY,
        }
    }
}

impl std::fmt::Display for CeremonyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CeremonyKind::Registration => f.write_str("registration"),
            CeremonyKind::Authentication => f.write_str("authentication"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CeremonyState {
    Idle,
    ChallengeIssued,
    Verified,
    Rejected,
}

/// Where `kind` stands according to the session.
///
/// `Rejected` is never observed here: a rejected response leaves the
/// session untouched, so the ceremony still reads as `ChallengeIssued`
/// until the cookie expires or a new challenge replaces it.
pub fn state_of(session: &SessionState, kind: CeremonyKind) -> CeremonyState {
    if session.contains(kind.challenge_key()) {
        CeremonyState::ChallengeIssued
    } else if kind == CeremonyKind::Authentication && session.contains(USER_HANDLE_KEY) {
        CeremonyState::Verified
    } else {
        CeremonyState::Idle
    }
}

pub fn fresh_challenge() -> Vec<u8> {
    let mut challenge = vec![0u8; CHALLENGE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut challenge);
    challenge
}

/// Draw a challenge for `kind` and record it in the session.
///
/// Replaces any challenge already pending for the same kind.
pub fn issue_challenge(session: &mut SessionState, kind: CeremonyKind) -> Vec<u8> {
    let challenge = fresh_challenge();
    session.set_bytes(kind.challenge_key(), &challenge);
    tracing::debug!(ceremony = %kind, "Issued challenge");
    challenge
}

/// The pending challenge for `kind`, or `MissingChallenge`.
pub fn pending_challenge(
    session: &SessionState,
    kind: CeremonyKind,
) -> Result<Vec<u8>, VerificationError> {
    session
        .get_bytes(kind.challenge_key())
        .filter(|challenge| !challenge.is_empty())
        .ok_or(VerificationError::MissingChallenge)
}

/// Challenges are single use: both are dropped after any verified ceremony.
pub fn clear_challenges(session: &mut SessionState) {
    session.remove(REG_CHALLENGE_KEY);
    session.remove(AUTH_CHALLENGE_KEY);
    session.remove(REG_USER_KEY);
}

/// Log the outcome of a verification and name the state it leads to.
pub fn conclude<T>(kind: CeremonyKind, outcome: &Result<T, VerificationError>) -> CeremonyState {
    match outcome {
        Ok(_) => {
            tracing::debug!(ceremony = %kind, "Ceremony verified");
            CeremonyState::Verified
        }
        Err(e) => {
            tracing::warn!(ceremony = %kind, error = %e, "Ceremony rejected");
            CeremonyState::Rejected
        }
    }
}
