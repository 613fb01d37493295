//! # WebAuthn Wire Types
//!
//! Messages exchanged with the browser, each with the [`Schema`] that lists
//! its binary fields. Binary fields travel as standard base64 strings.
//!
//! Also the expectation/result types handed to and returned by the
//! [`VerificationService`](super::verifier::VerificationService).

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::codec::{CodecError, Field, Marshal, Record, Schema, Unmarshal};

/// COSE algorithm identifier for ES256 (ECDSA P-256 with SHA-256)
pub const COSE_ALG_ES256: i64 = -7;

/// Ceremony timeout advertised to the browser, matching the cookie TTL
pub const CEREMONY_TIMEOUT_MS: u64 = 120_000;

pub const USER_ENTITY: Schema = Schema::new(&["id"], &[]);
pub const CREATION_OPTIONS: Schema = Schema::new(&["challenge"], &[("user", &USER_ENTITY)]);
pub const REQUEST_OPTIONS: Schema = Schema::new(&["challenge"], &[]);

pub const ATTESTATION_RESPONSE: Schema =
    Schema::new(&["clientDataJSON", "attestationObject"], &[]);
pub const ATTESTATION_CREDENTIAL: Schema =
    Schema::new(&["rawId"], &[("response", &ATTESTATION_RESPONSE)]);

pub const ASSERTION_RESPONSE: Schema = Schema::new(
    &["clientDataJSON", "authenticatorData", "signature", "userHandle"],
    &[],
);
pub const ASSERTION_CREDENTIAL: Schema =
    Schema::new(&["rawId"], &[("response", &ASSERTION_RESPONSE)]);

/// The service identity credentials are scoped to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelyingParty {
    pub id: String,
    pub name: String,
}

/// User account information embedded in creation options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEntity {
    /// Opaque user handle (SHA-512 digest), never the username itself
    pub id: Vec<u8>,
    pub name: String,
    pub display_name: String,
}

/// Registration challenge options (`PublicKeyCredentialCreationOptions`)
///
/// `user` is absent when the options are issued before the browser has
/// told us who is registering; the client then derives the handle itself.
#[derive(Debug, Clone, PartialEq)]
pub struct CreationOptions {
    pub rp: RelyingParty,
    pub user: Option<UserEntity>,
    pub challenge: Vec<u8>,
    /// COSE algorithm ids, most preferred first
    pub algorithms: Vec<i64>,
    pub extensions: Map<String, Value>,
}

impl Marshal for CreationOptions {
    const SCHEMA: &'static Schema = &CREATION_OPTIONS;

    fn to_record(&self) -> Record {
        let params: Vec<Value> = self
            .algorithms
            .iter()
            .map(|alg| json!({ "type": "public-key", "alg": alg }))
            .collect();

        let mut record = Record::new()
            .with("rp", json!({ "id": self.rp.id, "name": self.rp.name }))
            .with("challenge", self.challenge.clone())
            .with("pubKeyCredParams", Value::Array(params))
            .with("timeout", json!(CEREMONY_TIMEOUT_MS))
            .with("attestation", "none")
            .with(
                "authenticatorSelection",
                json!({
                    "residentKey": "preferred",
                    "requireResidentKey": false,
                    "userVerification": "preferred"
                }),
            )
            .with("extensions", Value::Object(self.extensions.clone()));

        if let Some(user) = &self.user {
            record.insert(
                "user",
                Record::new()
                    .with("id", user.id.clone())
                    .with("name", user.name.clone())
                    .with("displayName", user.display_name.clone()),
            );
        }
        record
    }
}

/// Authentication challenge options (`PublicKeyCredentialRequestOptions`)
///
/// No `allowCredentials`: the authenticator offers its discoverable
/// credentials and reports the user handle back in the assertion.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOptions {
    pub rp_id: String,
    pub challenge: Vec<u8>,
    pub extensions: Map<String, Value>,
}

impl Marshal for RequestOptions {
    const SCHEMA: &'static Schema = &REQUEST_OPTIONS;

    fn to_record(&self) -> Record {
        Record::new()
            .with("rpId", self.rp_id.clone())
            .with("challenge", self.challenge.clone())
            .with("timeout", json!(CEREMONY_TIMEOUT_MS))
            .with("userVerification", "preferred")
            .with("extensions", Value::Object(self.extensions.clone()))
    }
}

/// `AuthenticatorAttestationResponse`
#[derive(Debug, Clone, PartialEq)]
pub struct AttestationResponse {
    pub client_data_json: Vec<u8>,
    pub attestation_object: Vec<u8>,
    /// Undeclared fields such as `transports`
    pub extra: Map<String, Value>,
}

/// `PublicKeyCredential` returned by `navigator.credentials.create()`
#[derive(Debug, Clone, PartialEq)]
pub struct AttestationCredential {
    pub id: String,
    pub raw_id: Vec<u8>,
    pub kind: String,
    pub response: AttestationResponse,
    pub extra: Map<String, Value>,
}

impl Unmarshal for AttestationCredential {
    const SCHEMA: &'static Schema = &ATTESTATION_CREDENTIAL;

    fn vivify(mut record: Record) -> Result<Self, CodecError> {
        let mut response = record.take_record("response")?;
        Ok(Self {
            id: record.take_string("id")?,
            raw_id: record.take_bytes("rawId")?,
            kind: record.take_string("type")?,
            response: AttestationResponse {
                client_data_json: response.take_bytes("clientDataJSON")?,
                attestation_object: response.take_bytes("attestationObject")?,
                extra: response.into_json()?,
            },
            extra: record.into_json()?,
        })
    }
}

impl Marshal for AttestationCredential {
    const SCHEMA: &'static Schema = &ATTESTATION_CREDENTIAL;

    fn to_record(&self) -> Record {
        let response = Record::from_json(self.response.extra.clone())
            .with("clientDataJSON", self.response.client_data_json.clone())
            .with("attestationObject", self.response.attestation_object.clone());
        Record::from_json(self.extra.clone())
            .with("id", self.id.clone())
            .with("rawId", self.raw_id.clone())
            .with("type", self.kind.clone())
            .with("response", response)
    }
}

/// `AuthenticatorAssertionResponse`
#[derive(Debug, Clone, PartialEq)]
pub struct AssertionResponse {
    pub client_data_json: Vec<u8>,
    pub authenticator_data: Vec<u8>,
    pub signature: Vec<u8>,
    pub user_handle: Option<Vec<u8>>,
    pub extra: Map<String, Value>,
}

/// `PublicKeyCredential` returned by `navigator.credentials.get()`
#[derive(Debug, Clone, PartialEq)]
pub struct AssertionCredential {
    pub id: String,
    pub raw_id: Vec<u8>,
    pub kind: String,
    pub response: AssertionResponse,
    pub extra: Map<String, Value>,
}

impl Unmarshal for AssertionCredential {
    const SCHEMA: &'static Schema = &ASSERTION_CREDENTIAL;

    fn vivify(mut record: Record) -> Result<Self, CodecError> {
        let mut response = record.take_record("response")?;
        Ok(Self {
            id: record.take_string("id")?,
            raw_id: record.take_bytes("rawId")?,
            kind: record.take_string("type")?,
            response: AssertionResponse {
                client_data_json: response.take_bytes("clientDataJSON")?,
                authenticator_data: response.take_bytes("authenticatorData")?,
                signature: response.take_bytes("signature")?,
                user_handle: response.take_optional_bytes("userHandle")?,
                extra: response.into_json()?,
            },
            extra: record.into_json()?,
        })
    }
}

impl Marshal for AssertionCredential {
    const SCHEMA: &'static Schema = &ASSERTION_CREDENTIAL;

    fn to_record(&self) -> Record {
        let mut response = Record::from_json(self.response.extra.clone())
            .with("clientDataJSON", self.response.client_data_json.clone())
            .with("authenticatorData", self.response.authenticator_data.clone())
            .with("signature", self.response.signature.clone());
        if let Some(handle) = &self.response.user_handle {
            response.insert("userHandle", Field::Bytes(handle.clone()));
        }
        Record::from_json(self.extra.clone())
            .with("id", self.id.clone())
            .with("rawId", self.raw_id.clone())
            .with("type", self.kind.clone())
            .with("response", response)
    }
}

/// Body of `POST /register`
///
/// `user` is the base64 user handle the browser derived; `attestation`
/// is the marshalled [`AttestationCredential`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationRequest {
    #[serde(default)]
    pub user: Option<String>,
    pub attestation: Value,
}

/// Body of `POST /register/options`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationOptionsRequest {
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Which authentication factor the ceremony must satisfy.
///
/// - `First`: user verification required (the passkey replaces a password)
/// - `Second`: user presence suffices (used after another factor)
/// - `Either`: user presence or verification
///
/// Only `Either` is ever selected by the ceremonies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Factor {
    First,
    Second,
    #[default]
    Either,
}

/// What a registration response must match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestationExpectation {
    pub challenge: Vec<u8>,
    pub origin: String,
    pub factor: Factor,
}

/// What an authentication response must match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionExpectation {
    pub challenge: Vec<u8>,
    pub origin: String,
    pub factor: Factor,
    /// Stored credential public key (SPKI PEM)
    pub public_key: String,
    pub prev_counter: u32,
    pub user_handle: Vec<u8>,
}

/// Outcome of a verified registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestationResult {
    pub counter: u32,
    pub public_key: String,
    pub credential_id: Vec<u8>,
}

/// Outcome of a verified authentication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssertionResult {
    pub new_counter: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creation_options_wire_shape() {
        let options = CreationOptions {
            rp: RelyingParty {
                id: "localhost".into(),
                name: "Demo".into(),
            },
            user: Some(UserEntity {
                id: vec![1, 2, 3],
                name: "alice@example.com".into(),
                display_name: "Alice".into(),
            }),
            challenge: b"abc".to_vec(),
            algorithms: vec![COSE_ALG_ES256],
            extensions: Map::new(),
        };

        let wire = options.marshal().unwrap();
        assert_eq!(wire["challenge"], "YWJj");
        assert_eq!(wire["user"]["id"], "AQID");
        assert_eq!(wire["user"]["displayName"], "Alice");
        assert_eq!(wire["rp"]["id"], "localhost");
        assert_eq!(wire["pubKeyCredParams"][0]["alg"], -7);
        assert_eq!(wire["attestation"], "none");
    }

    #[test]
    fn test_creation_options_without_user() {
        let options = CreationOptions {
            rp: RelyingParty {
                id: "localhost".into(),
                name: "Demo".into(),
            },
            user: None,
            challenge: vec![0; 16],
            algorithms: vec![COSE_ALG_ES256],
            extensions: Map::new(),
        };
        let wire = options.marshal().unwrap();
        assert!(wire.get("user").is_none());
    }

    #[test]
    fn test_assertion_credential_round_trip() {
        let wire = json!({
            "id": "cred",
            "rawId": "AQID",
            "type": "public-key",
            "authenticatorAttachment": "platform",
            "response": {
                "clientDataJSON": "e30=",
                "authenticatorData": "AAAA",
                "signature": "MEQ=",
                "userHandle": "aGFuZGxl"
            }
        });

        let credential = AssertionCredential::unmarshal(&wire).unwrap();
        assert_eq!(credential.raw_id, vec![1, 2, 3]);
        assert_eq!(credential.response.client_data_json, b"{}");
        assert_eq!(credential.response.user_handle.as_deref(), Some(&b"handle"[..]));
        assert_eq!(credential.extra["authenticatorAttachment"], "platform");

        assert_eq!(credential.marshal().unwrap(), wire);
    }

    #[test]
    fn test_assertion_without_user_handle() {
        let wire = json!({
            "id": "cred",
            "rawId": "AQID",
            "type": "public-key",
            "response": {
                "clientDataJSON": "e30=",
                "authenticatorData": "AAAA",
                "signature": "MEQ="
            }
        });
        let credential = AssertionCredential::unmarshal(&wire).unwrap();
        assert_eq!(credential.response.user_handle, None);
    }

    #[test]
    fn test_attestation_credential_type_mismatch() {
        let wire = json!({
            "id": "cred",
            "rawId": 12,
            "type": "public-key",
            "response": { "clientDataJSON": "e30=", "attestationObject": "oA==" }
        });
        assert!(matches!(
            AttestationCredential::unmarshal(&wire),
            Err(CodecError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_attestation_credential_missing_field() {
        let wire = json!({
            "id": "cred",
            "rawId": "AQID",
            "type": "public-key",
            "response": { "clientDataJSON": "e30=" }
        });
        assert_eq!(
            AttestationCredential::unmarshal(&wire),
            Err(CodecError::MissingField("attestationObject".into()))
        );
    }

    #[test]
    fn test_factor_serialization() {
        assert_eq!(serde_json::to_value(Factor::Either).unwrap(), "either");
        assert_eq!(Factor::default(), Factor::Either);
    }
}
