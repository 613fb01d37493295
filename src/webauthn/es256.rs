//! # ES256 Verification Service
//!
//! A [`VerificationService`] for P-256 credentials, the algorithm every
//! platform authenticator supports.
//!
//! ## What gets checked
//! - clientDataJSON: ceremony `type`, the base64url `challenge`, `origin`
//! - authenticatorData: RP id hash, user presence/verification per
//!   [`Factor`], attested credential data (registration only)
//! - attestation statement: `none`, or `packed` self-attestation
//! - assertion: DER ECDSA signature over `authenticatorData || SHA-256(clientDataJSON)`,
//!   the user handle, and the counter rule
//!
//! Credential public keys are exported as SPKI PEM, which is what the
//! credential store keeps.

use async_trait::async_trait;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use ciborium::value::Value;
use p256::ecdsa::signature::Verifier;
use p256::ecdsa::{Signature, VerifyingKey};
use p256::pkcs8::{DecodePublicKey, EncodePublicKey, LineEnding};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use super::authenticator_data::{AuthenticatorData, CoseKey};
use super::types::{
    AssertionCredential, AssertionExpectation, AssertionResult, AttestationCredential,
    AttestationExpectation, AttestationResult, Factor, COSE_ALG_ES256,
};
use super::verifier::{check_counter, VerificationError, VerificationService};

/// Browsers send the challenge base64url-encoded, usually without padding.
const CHALLENGE_ENCODING: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const CREATE: &str = "webauthn.create";
const GET: &str = "webauthn.get";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClientData {
    #[serde(rename = "type")]
    kind: String,
    challenge: String,
    origin: String,
}

#[derive(Debug, Clone)]
pub struct Es256Verifier {
    rp_id: String,
}

impl Es256Verifier {
    pub fn new(rp_id: impl Into<String>) -> Self {
        Self {
            rp_id: rp_id.into(),
        }
    }

    fn rp_id_hash(&self) -> [u8; 32] {
        Sha256::digest(self.rp_id.as_bytes()).into()
    }

    fn check_client_data(
        &self,
        raw: &[u8],
        kind: &str,
        challenge: &[u8],
        origin: &str,
    ) -> Result<(), VerificationError> {
        let client_data: ClientData = serde_json::from_slice(raw)
            .map_err(|_| VerificationError::Malformed("clientDataJSON"))?;

        if client_data.kind != kind {
            return Err(VerificationError::ClientDataType(client_data.kind));
        }
        let reported = CHALLENGE_ENCODING
            .decode(client_data.challenge.as_bytes())
            .map_err(|_| VerificationError::Malformed("client data challenge"))?;
        if reported != challenge {
            return Err(VerificationError::ChallengeMismatch);
        }
        if client_data.origin != origin {
            return Err(VerificationError::OriginMismatch {
                expected: origin.to_string(),
                actual: client_data.origin,
            });
        }
        Ok(())
    }

    fn check_authenticator_data(
        &self,
        data: &AuthenticatorData,
        factor: Factor,
    ) -> Result<(), VerificationError> {
        if data.rp_id_hash != self.rp_id_hash() {
            return Err(VerificationError::RpIdMismatch);
        }
        match factor {
            Factor::First if !data.user_verified() => Err(VerificationError::UserNotVerified),
            Factor::Second | Factor::Either if !(data.user_present() || data.user_verified()) => {
                Err(VerificationError::UserNotPresent)
            }
            _ => Ok(()),
        }
    }
}

/// Message covered by attestation and assertion signatures
fn signed_message(authenticator_data: &[u8], client_data_json: &[u8]) -> Vec<u8> {
    let mut message = authenticator_data.to_vec();
    message.extend_from_slice(&Sha256::digest(client_data_json));
    message
}

fn verify_signature(
    key: &VerifyingKey,
    message: &[u8],
    der_signature: &[u8],
) -> Result<(), VerificationError> {
    let signature =
        Signature::from_der(der_signature).map_err(|_| VerificationError::Malformed("signature"))?;
    key.verify(message, &signature)
        .map_err(|_| VerificationError::BadSignature)
}

fn text_key<'a>(map: &'a [(Value, Value)], key: &str) -> Option<&'a Value> {
    map.iter().find_map(|(k, v)| match k {
        Value::Text(text) if text == key => Some(v),
        _ => None,
    })
}

/// Decoded `attestationObject`
struct AttestationObject {
    fmt: String,
    auth_data: Vec<u8>,
    statement: Vec<(Value, Value)>,
}

impl AttestationObject {
    fn parse(bytes: &[u8]) -> Result<Self, VerificationError> {
        const MALFORMED: VerificationError = VerificationError::Malformed("attestation object");

        let value: Value = ciborium::from_reader(bytes).map_err(|_| MALFORMED)?;
        let Value::Map(entries) = value else {
            return Err(MALFORMED);
        };
        let fmt = match text_key(&entries, "fmt") {
            Some(Value::Text(fmt)) => fmt.clone(),
            _ => return Err(MALFORMED),
        };
        let auth_data = match text_key(&entries, "authData") {
            Some(Value::Bytes(data)) => data.clone(),
            _ => return Err(MALFORMED),
        };
        let statement = match text_key(&entries, "attStmt") {
            Some(Value::Map(statement)) => statement.clone(),
            _ => return Err(MALFORMED),
        };
        Ok(Self {
            fmt,
            auth_data,
            statement,
        })
    }

    fn check_statement(&self, key: &CoseKey, client_data_json: &[u8]) -> Result<(), VerificationError> {
        match self.fmt.as_str() {
            "none" if self.statement.is_empty() => Ok(()),
            "none" => Err(VerificationError::Malformed("non-empty none attestation")),
            "packed" => {
                if text_key(&self.statement, "x5c").is_some() {
                    return Err(VerificationError::UnsupportedFormat("packed with x5c".into()));
                }
                let alg = match text_key(&self.statement, "alg") {
                    Some(Value::Integer(alg)) => i64::try_from(*alg).ok(),
                    _ => None,
                };
                if alg != Some(key.alg) {
                    return Err(VerificationError::Malformed("packed attestation alg"));
                }
                let Some(Value::Bytes(sig)) = text_key(&self.statement, "sig") else {
                    return Err(VerificationError::Malformed("packed attestation sig"));
                };
                verify_signature(
                    &key.verifying_key()?,
                    &signed_message(&self.auth_data, client_data_json),
                    sig,
                )
            }
            other => Err(VerificationError::UnsupportedFormat(other.to_string())),
        }
    }
}

#[async_trait]
impl VerificationService for Es256Verifier {
    async fn verify_attestation(
        &self,
        credential: &AttestationCredential,
        expectation: &AttestationExpectation,
    ) -> Result<AttestationResult, VerificationError> {
        let response = &credential.response;
        self.check_client_data(
            &response.client_data_json,
            CREATE,
            &expectation.challenge,
            &expectation.origin,
        )?;

        let object = AttestationObject::parse(&response.attestation_object)?;
        let data = AuthenticatorData::parse(&object.auth_data)?;
        self.check_authenticator_data(&data, expectation.factor)?;

        let attested = data
            .attested
            .ok_or(VerificationError::Malformed("missing attested credential data"))?;
        if attested.credential_id != credential.raw_id {
            return Err(VerificationError::InvalidCredential("rawId differs from attested credential id"));
        }
        if attested.public_key.alg != COSE_ALG_ES256 {
            return Err(VerificationError::UnsupportedAlgorithm(attested.public_key.alg));
        }
        object.check_statement(&attested.public_key, &response.client_data_json)?;

        let public_key = attested
            .public_key
            .verifying_key()?
            .to_public_key_pem(LineEnding::LF)
            .map_err(|_| VerificationError::Malformed("public key export"))?;

        Ok(AttestationResult {
            counter: data.sign_count,
            public_key,
            credential_id: attested.credential_id,
        })
    }

    async fn verify_assertion(
        &self,
        credential: &AssertionCredential,
        expectation: &AssertionExpectation,
    ) -> Result<AssertionResult, VerificationError> {
        let response = &credential.response;
        self.check_client_data(
            &response.client_data_json,
            GET,
            &expectation.challenge,
            &expectation.origin,
        )?;

        let data = AuthenticatorData::parse(&response.authenticator_data)?;
        self.check_authenticator_data(&data, expectation.factor)?;

        if let Some(handle) = &response.user_handle {
            if *handle != expectation.user_handle {
                return Err(VerificationError::UserHandleMismatch);
            }
        }

        let key = VerifyingKey::from_public_key_pem(&expectation.public_key)
            .map_err(|_| VerificationError::Malformed("stored public key"))?;
        verify_signature(
            &key,
            &signed_message(&response.authenticator_data, &response.client_data_json),
            &response.signature,
        )?;

        let new_counter = check_counter(expectation.prev_counter, data.sign_count)?;
        Ok(AssertionResult { new_counter })
    }
}
