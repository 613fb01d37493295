//! # Verification Service
//!
//! The seam between the ceremony logic and the actual cryptography.
//! Ceremonies build an expectation from the session and the credential
//! store, then hand it to a [`VerificationService`] together with the
//! client's response. Nothing on the ceremony side inspects signatures.

use async_trait::async_trait;
use thiserror::Error;

use super::types::{
    AssertionCredential, AssertionExpectation, AssertionResult, AttestationCredential,
    AttestationExpectation, AttestationResult,
};

/// Why a ceremony response was rejected.
///
/// Callers log the variant and answer with one generic failure: the client
/// never learns which check failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerificationError {
    /// The session holds no challenge for this ceremony (expired, tampered
    /// or never issued)
    #[error("no pending challenge in session")]
    MissingChallenge,

    #[error("challenge mismatch")]
    ChallengeMismatch,

    #[error("origin mismatch: expected {expected}, got {actual}")]
    OriginMismatch { expected: String, actual: String },

    #[error("unexpected client data type: {0}")]
    ClientDataType(String),

    #[error("relying party id hash mismatch")]
    RpIdMismatch,

    #[error("user presence flag not set")]
    UserNotPresent,

    #[error("user verification required but not performed")]
    UserNotVerified,

    #[error("user handle mismatch")]
    UserHandleMismatch,

    #[error("unsupported attestation format: {0}")]
    UnsupportedFormat(String),

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(i64),

    #[error("malformed {0}")]
    Malformed(&'static str),

    #[error("invalid signature")]
    BadSignature,

    /// Registration produced an unusable credential (nonzero counter or no key)
    #[error("invalid credential: {0}")]
    InvalidCredential(&'static str),

    /// The authenticator reported a counter that did not advance
    #[error("replay detected: counter {reported} does not exceed {previous}")]
    ReplayDetected { previous: u32, reported: u32 },
}

/// Cryptographic checks for both ceremony kinds.
#[async_trait]
pub trait VerificationService: Send + Sync {
    /// Verify a registration response; returns the new credential's
    /// public key and initial counter.
    async fn verify_attestation(
        &self,
        credential: &AttestationCredential,
        expectation: &AttestationExpectation,
    ) -> Result<AttestationResult, VerificationError>;

    /// Verify an authentication response.
    ///
    /// Must fail with [`VerificationError::ReplayDetected`] unless the
    /// reported counter is strictly greater than `expectation.prev_counter`.
    async fn verify_assertion(
        &self,
        credential: &AssertionCredential,
        expectation: &AssertionExpectation,
    ) -> Result<AssertionResult, VerificationError>;
}

/// The counter rule shared by every verifier: new must exceed previous.
pub fn check_counter(previous: u32, reported: u32) -> Result<u32, VerificationError> {
    if reported > previous {
        Ok(reported)
    } else {
        Err(VerificationError::ReplayDetected { previous, reported })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_must_strictly_increase() {
        assert_eq!(check_counter(0, 1), Ok(1));
        assert_eq!(check_counter(41, 100), Ok(100));
        assert_eq!(
            check_counter(0, 0),
            Err(VerificationError::ReplayDetected {
                previous: 0,
                reported: 0
            })
        );
        assert!(check_counter(5, 4).is_err());
    }
}
