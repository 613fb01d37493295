//! AES-256-GCM sealing of the session cookie payload.
//!
//! Wire format: `base64(iv) ":" base64(ciphertext || tag)`

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;

use super::SessionError;
use crate::codec;
use crate::db::KeyMaterial;

/// HKDF info label binding derived keys to this use
const KEY_INFO: &[u8] = b"stateless-passkey/session-cookie/aes-256-gcm";

/// AES-GCM nonce length in bytes
pub const NONCE_LEN: usize = 12;

/// Session cookie cipher, derived once at startup from the store's key material.
pub struct SessionCipher {
    cipher: Aes256Gcm,
}

impl SessionCipher {
    pub fn new(material: &KeyMaterial) -> Self {
        let hkdf = Hkdf::<Sha256>::new(None, material.as_bytes());
        let mut key = [0u8; 32];
        hkdf.expand(KEY_INFO, &mut key)
            .expect("32 bytes is a valid HKDF-SHA256 output length");
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key)),
        }
    }

    /// Encrypt under a freshly drawn nonce.
    pub fn seal(&self, plaintext: &[u8]) -> Result<String, SessionError> {
        let mut iv = [0u8; NONCE_LEN];
        rand::rngs::OsRng.fill_bytes(&mut iv);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&iv), plaintext)
            .map_err(|_| SessionError::Encrypt)?;

        Ok(format!(
            "{}:{}",
            codec::encode_bytes(&iv),
            codec::encode_bytes(&ciphertext)
        ))
    }

    /// Decrypt and authenticate a sealed value.
    pub fn open(&self, sealed: &str) -> Result<Vec<u8>, SessionError> {
        let (iv, ciphertext) = sealed
            .split_once(':')
            .ok_or(SessionError::Malformed("missing ':' separator"))?;

        let iv = codec::decode_bytes(iv).map_err(|_| SessionError::Malformed("iv"))?;
        if iv.len() != NONCE_LEN {
            return Err(SessionError::Malformed("iv length"));
        }
        let ciphertext =
            codec::decode_bytes(ciphertext).map_err(|_| SessionError::Malformed("ciphertext"))?;

        self.cipher
            .decrypt(Nonce::from_slice(&iv), ciphertext.as_slice())
            .map_err(|_| SessionError::Decrypt)
    }
}

impl std::fmt::Debug for SessionCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionCipher([REDACTED])")
    }
}
