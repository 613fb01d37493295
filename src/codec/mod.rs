//! # Binary Field Codec
//!
//! WebAuthn ceremonies are full of raw bytes (challenges, credential ids,
//! authenticator data, signatures) but JSON has no binary type. This module
//! converts between a decoded [`Record`] holding real bytes and the JSON
//! "wire envelope" in which every binary field is a base64 string.
//!
//! Which fields are binary is declared per message type with a [`Schema`]
//! constant, so the mapping is fixed at compile time:
//!
//! ```rust,ignore
//! const RESPONSE: Schema = Schema::new(&["clientDataJSON", "attestationObject"], &[]);
//! const CREDENTIAL: Schema = Schema::new(&["rawId"], &[("response", &RESPONSE)]);
//! ```
//!
//! Fields that are not declared pass through untouched, including inside
//! declared nested records.

mod record;
mod schema;

pub use record::{Field, Record};
pub use schema::Schema;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde_json::Value;
use thiserror::Error;

/// Standard alphabet decoder that does not insist on padding.
///
/// Input reaches it with `=` already stripped, so padding is never present.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::RequireNone)
        .with_decode_allow_trailing_bits(true),
);

/// Errors raised when a value does not fit its declared schema.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A declared field carried a value of the wrong runtime type
    #[error("field `{field}` expected {expected}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
    },

    /// A binary field survived stripping but is still not decodable
    #[error("field `{field}` is not valid base64")]
    InvalidBase64 { field: String },

    /// A typed message needed a field the record does not have
    #[error("missing field `{0}`")]
    MissingField(String),
}

impl CodecError {
    pub(crate) fn type_mismatch(field: &str, expected: &'static str) -> Self {
        CodecError::TypeMismatch {
            field: field.to_string(),
            expected,
        }
    }
}

/// Encode bytes as standard (RFC 4648, padded) base64.
pub fn encode_bytes(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode base64, ignoring every character outside the standard alphabet.
///
/// Whitespace, line breaks, `=` padding and stray punctuation are dropped
/// before decoding. Only a leftover length that cannot encode whole bytes
/// is an error.
pub fn decode_bytes(text: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let filtered: String = text
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '+' || *c == '/')
        .collect();
    LENIENT.decode(filtered)
}

/// A typed message that can be flattened into a [`Record`] and marshalled.
pub trait Marshal {
    const SCHEMA: &'static Schema;

    fn to_record(&self) -> Record;

    fn marshal(&self) -> Result<Value, CodecError> {
        Self::SCHEMA.marshal(&self.to_record())
    }
}

/// A typed message rebuilt ("vivified") from a decoded [`Record`].
pub trait Unmarshal: Sized {
    const SCHEMA: &'static Schema;

    fn vivify(record: Record) -> Result<Self, CodecError>;

    fn unmarshal(wire: &Value) -> Result<Self, CodecError> {
        Self::vivify(Self::SCHEMA.unmarshal(wire)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_bytes_standard_alphabet() {
        assert_eq!(encode_bytes(b"abc"), "YWJj");
        assert_eq!(encode_bytes(&[0xfb, 0xff]), "+/8=");
    }

    #[test]
    fn test_decode_bytes() {
        assert_eq!(decode_bytes("YWJj").unwrap(), b"abc");
        assert_eq!(decode_bytes("+/8=").unwrap(), vec![0xfb, 0xff]);
    }

    #[test]
    fn test_decode_strips_foreign_characters() {
        assert_eq!(decode_bytes(" YW\nJj\t").unwrap(), b"abc");
        assert_eq!(decode_bytes("ZGVm==").unwrap(), b"def");
        assert_eq!(decode_bytes("Z.G-V_m").unwrap(), b"def");
        assert_eq!(decode_bytes("+/8").unwrap(), vec![0xfb, 0xff]);
    }

    #[test]
    fn test_decode_rejects_impossible_length() {
        assert!(decode_bytes("YWJjZ").is_err());
    }

    #[test]
    fn test_decode_empty() {
        assert!(decode_bytes("").unwrap().is_empty());
        assert!(decode_bytes("***").unwrap().is_empty());
    }
}
