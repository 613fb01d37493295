//! Parsing of the binary `authenticatorData` structure and COSE keys.
//!
//! Layout:
//! ```text
//! rpIdHash (32) | flags (1) | signCount (4, BE) | [attested credential data] | [extensions]
//! attested credential data = aaguid (16) | credIdLen (2, BE) | credId | COSE_Key (CBOR)
//! ```

use ciborium::value::{Integer, Value};
use p256::ecdsa::VerifyingKey;
use p256::{EncodedPoint, FieldBytes};

use super::verifier::VerificationError;

pub const FLAG_USER_PRESENT: u8 = 0x01;
pub const FLAG_USER_VERIFIED: u8 = 0x04;
pub const FLAG_ATTESTED_CREDENTIAL: u8 = 0x40;

const RP_ID_HASH_LEN: usize = 32;
const HEADER_LEN: usize = RP_ID_HASH_LEN + 1 + 4;
const AAGUID_LEN: usize = 16;

// COSE_Key labels and values (RFC 9053)
const COSE_KTY: i64 = 1;
const COSE_ALG: i64 = 3;
const COSE_CRV: i64 = -1;
const COSE_X: i64 = -2;
const COSE_Y: i64 = -3;
const COSE_KTY_EC2: i64 = 2;
const COSE_CRV_P256: i64 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatorData {
    pub rp_id_hash: [u8; RP_ID_HASH_LEN],
    pub flags: u8,
    pub sign_count: u32,
    pub attested: Option<AttestedCredential>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestedCredential {
    pub aaguid: [u8; AAGUID_LEN],
    pub credential_id: Vec<u8>,
    pub public_key: CoseKey,
}

/// An EC2 P-256 credential public key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoseKey {
    pub alg: i64,
    pub x: [u8; 32],
    pub y: [u8; 32],
}

impl AuthenticatorData {
    pub fn parse(bytes: &[u8]) -> Result<Self, VerificationError> {
        if bytes.len() < HEADER_LEN {
            return Err(VerificationError::Malformed("authenticator data"));
        }

        let mut rp_id_hash = [0u8; RP_ID_HASH_LEN];
        rp_id_hash.copy_from_slice(&bytes[..RP_ID_HASH_LEN]);
        let flags = bytes[RP_ID_HASH_LEN];
        let sign_count = u32::from_be_bytes([bytes[33], bytes[34], bytes[35], bytes[36]]);

        let attested = if flags & FLAG_ATTESTED_CREDENTIAL != 0 {
            Some(parse_attested(&bytes[HEADER_LEN..])?)
        } else {
            None
        };

        Ok(Self {
            rp_id_hash,
            flags,
            sign_count,
            attested,
        })
    }

    pub fn user_present(&self) -> bool {
        self.flags & FLAG_USER_PRESENT != 0
    }

    pub fn user_verified(&self) -> bool {
        self.flags & FLAG_USER_VERIFIED != 0
    }
}

fn parse_attested(bytes: &[u8]) -> Result<AttestedCredential, VerificationError> {
    const MALFORMED: VerificationError = VerificationError::Malformed("attested credential data");

    if bytes.len() < AAGUID_LEN + 2 {
        return Err(MALFORMED);
    }
    let mut aaguid = [0u8; AAGUID_LEN];
    aaguid.copy_from_slice(&bytes[..AAGUID_LEN]);

    let id_len = u16::from_be_bytes([bytes[AAGUID_LEN], bytes[AAGUID_LEN + 1]]) as usize;
    let rest = &bytes[AAGUID_LEN + 2..];
    if rest.len() < id_len {
        return Err(MALFORMED);
    }
    let (credential_id, mut key_bytes) = rest.split_at(id_len);

    // Extensions may follow the key; the reader stops after one CBOR item.
    let key: Value =
        ciborium::from_reader(&mut key_bytes).map_err(|_| VerificationError::Malformed("COSE key"))?;

    Ok(AttestedCredential {
        aaguid,
        credential_id: credential_id.to_vec(),
        public_key: CoseKey::from_cbor(&key)?,
    })
}

impl CoseKey {
    pub fn from_cbor(value: &Value) -> Result<Self, VerificationError> {
        let Value::Map(entries) = value else {
            return Err(VerificationError::Malformed("COSE key"));
        };
        let get = |label: i64| {
            entries.iter().find_map(|(k, v)| match k {
                Value::Integer(i) if i128::from(*i) == i128::from(label) => Some(v),
                _ => None,
            })
        };
        let int = |label: i64| match get(label) {
            Some(Value::Integer(i)) => i64::try_from(*i).ok(),
            _ => None,
        };
        let coordinate = |label: i64| match get(label) {
            Some(Value::Bytes(b)) => <[u8; 32]>::try_from(b.as_slice()).ok(),
            _ => None,
        };

        let alg = int(COSE_ALG).ok_or(VerificationError::Malformed("COSE key alg"))?;
        if int(COSE_KTY) != Some(COSE_KTY_EC2) || int(COSE_CRV) != Some(COSE_CRV_P256) {
            return Err(VerificationError::UnsupportedAlgorithm(alg));
        }
        Ok(Self {
            alg,
            x: coordinate(COSE_X).ok_or(VerificationError::Malformed("COSE key x"))?,
            y: coordinate(COSE_Y).ok_or(VerificationError::Malformed("COSE key y"))?,
        })
    }

    pub fn to_cbor(&self) -> Value {
        Value::Map(vec![
            (Value::Integer(COSE_KTY.into()), Value::Integer(COSE_KTY_EC2.into())),
            (Value::Integer(COSE_ALG.into()), Value::Integer(Integer::from(self.alg))),
            (Value::Integer(COSE_CRV.into()), Value::Integer(COSE_CRV_P256.into())),
            (Value::Integer(COSE_X.into()), Value::Bytes(self.x.to_vec())),
            (Value::Integer(COSE_Y.into()), Value::Bytes(self.y.to_vec())),
        ])
    }

    pub fn verifying_key(&self) -> Result<VerifyingKey, VerificationError> {
        let point = EncodedPoint::from_affine_coordinates(
            FieldBytes::from_slice(&self.x),
            FieldBytes::from_slice(&self.y),
            false,
        );
        VerifyingKey::from_encoded_point(&point)
            .map_err(|_| VerificationError::Malformed("public key point"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::ecdsa::SigningKey;

    fn cose_key() -> CoseKey {
        let signing = SigningKey::random(&mut rand::rngs::OsRng);
        let point = signing.verifying_key().to_encoded_point(false);
        CoseKey {
            alg: -7,
            x: <[u8; 32]>::try_from(point.x().unwrap().as_slice()).unwrap(),
            y: <[u8; 32]>::try_from(point.y().unwrap().as_slice()).unwrap(),
        }
    }

    fn encode(value: &Value) -> Vec<u8> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf).unwrap();
        buf
    }

    #[test]
    fn test_parse_assertion_data() {
        let mut bytes = vec![0xABu8; 32];
        bytes.push(FLAG_USER_PRESENT | FLAG_USER_VERIFIED);
        bytes.extend_from_slice(&42u32.to_be_bytes());

        let data = AuthenticatorData::parse(&bytes).unwrap();
        assert_eq!(data.rp_id_hash, [0xAB; 32]);
        assert_eq!(data.sign_count, 42);
        assert!(data.user_present());
        assert!(data.user_verified());
        assert!(data.attested.is_none());
    }

    #[test]
    fn test_parse_attested_credential() {
        let key = cose_key();
        let mut bytes = vec![0u8; 32];
        bytes.push(FLAG_USER_PRESENT | FLAG_ATTESTED_CREDENTIAL);
        bytes.extend_from_slice(&0u32.to_be_bytes());
        bytes.extend_from_slice(&[7u8; 16]);
        bytes.extend_from_slice(&3u16.to_be_bytes());
        bytes.extend_from_slice(&[1, 2, 3]);
        bytes.extend_from_slice(&encode(&key.to_cbor()));
        // trailing extensions map
        bytes.extend_from_slice(&encode(&Value::Map(vec![])));

        let data = AuthenticatorData::parse(&bytes).unwrap();
        let attested = data.attested.unwrap();
        assert_eq!(attested.aaguid, [7u8; 16]);
        assert_eq!(attested.credential_id, vec![1, 2, 3]);
        assert_eq!(attested.public_key, key);
        assert!(attested.public_key.verifying_key().is_ok());
    }

    #[test]
    fn test_truncated_data_is_rejected() {
        assert!(AuthenticatorData::parse(&[0u8; 36]).is_err());

        let mut bytes = vec![0u8; 32];
        bytes.push(FLAG_ATTESTED_CREDENTIAL);
        bytes.extend_from_slice(&[0u8; 4]);
        bytes.extend_from_slice(&[0u8; 16]);
        bytes.extend_from_slice(&100u16.to_be_bytes());
        assert!(AuthenticatorData::parse(&bytes).is_err());
    }

    #[test]
    fn test_non_p256_key_is_unsupported() {
        let okp = Value::Map(vec![
            (Value::Integer(1i64.into()), Value::Integer(1i64.into())),
            (Value::Integer(3i64.into()), Value::Integer((-8i64).into())),
            (Value::Integer((-1i64).into()), Value::Integer(6i64.into())),
        ]);
        assert_eq!(
            CoseKey::from_cbor(&okp),
            Err(VerificationError::UnsupportedAlgorithm(-8))
        );
    }
}
