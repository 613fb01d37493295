//! # Credential Store Models
//!
//! The data structures that make up the persisted record set.
//!
//! ## Persisted format
//! Every backend stores the same logical document:
//! ```json
//! {
//!   "symmetricKey": "base64 (16 bytes)",
//!   "users": [
//!     { "userHandle": "base64 handle", "publicKey": "-----BEGIN PUBLIC KEY-----...", "counter": 0 }
//!   ]
//! }
//! ```
//! The file backend writes it verbatim; the SQLite backend spreads it over
//! two tables.

use crate::codec;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Length of the symmetric key material in bytes
pub const KEY_MATERIAL_LEN: usize = 16;

/// A registered passkey credential, one per user handle.
///
/// ## Fields
/// - `user_handle`: base64 of the SHA-512 handle derived from `username@rp_id`
/// - `public_key`: the credential public key (SPKI PEM)
/// - `counter`: last signature counter seen for this credential
///
/// A record with an empty `public_key` is the placeholder returned for
/// unknown handles. It must never verify an assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    pub user_handle: String,
    pub public_key: String,
    pub counter: u32,
}

impl CredentialRecord {
    /// Placeholder for a handle that has no registered credential
    pub fn unknown(user_handle: &str) -> Self {
        Self {
            user_handle: user_handle.to_string(),
            public_key: String::new(),
            counter: 0,
        }
    }

    /// True when this record carries a usable public key
    pub fn is_known(&self) -> bool {
        !self.public_key.is_empty()
    }
}

/// Random symmetric key material from which the session cipher key is derived.
///
/// `Debug` is redacted so the key never ends up in logs.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct KeyMaterial([u8; KEY_MATERIAL_LEN]);

impl KeyMaterial {
    /// Draw fresh key material from the OS random number generator
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_MATERIAL_LEN];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; KEY_MATERIAL_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_MATERIAL_LEN] {
        &self.0
    }

    /// Parse the base64 form used in the persisted record set
    pub fn from_base64(text: &str) -> Option<Self> {
        let bytes = codec::decode_bytes(text).ok()?;
        let bytes: [u8; KEY_MATERIAL_LEN] = bytes.try_into().ok()?;
        Some(Self(bytes))
    }

    pub fn to_base64(&self) -> String {
        codec::encode_bytes(&self.0)
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeyMaterial([REDACTED])")
    }
}

impl Serialize for KeyMaterial {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for KeyMaterial {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::from_base64(&text).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "symmetricKey must be {KEY_MATERIAL_LEN} bytes of base64"
            ))
        })
    }
}

/// The full persisted document: key material plus every credential record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSet {
    pub symmetric_key: KeyMaterial,
    pub users: Vec<CredentialRecord>,
}

impl RecordSet {
    /// A brand new set with fresh key material and no users
    pub fn fresh() -> Self {
        Self {
            symmetric_key: KeyMaterial::generate(),
            users: Vec::new(),
        }
    }

    pub fn find(&self, user_handle: &str) -> Option<&CredentialRecord> {
        self.users.iter().find(|u| u.user_handle == user_handle)
    }

    /// Replace the record with the same handle, or append it
    pub fn upsert(&mut self, record: CredentialRecord) {
        match self
            .users
            .iter_mut()
            .find(|u| u.user_handle == record.user_handle)
        {
            Some(existing) => *existing = record,
            None => self.users.push(record),
        }
    }
}
