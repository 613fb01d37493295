use serde_json::{Map, Value};

use super::{decode_bytes, encode_bytes, CodecError, Field, Record};

/// Declares which fields of a message hold binary payloads.
///
/// `nested` maps a field name to the schema of the record (or list of
/// records) stored under it. Nested entries take precedence over `binary`.
#[derive(Debug)]
pub struct Schema {
    pub binary: &'static [&'static str],
    pub nested: &'static [(&'static str, &'static Schema)],
}

impl Schema {
    /// No binary fields at all; every value must already be JSON.
    pub const EMPTY: Schema = Schema::new(&[], &[]);

    pub const fn new(
        binary: &'static [&'static str],
        nested: &'static [(&'static str, &'static Schema)],
    ) -> Self {
        Self { binary, nested }
    }

    fn nested_schema(&self, key: &str) -> Option<&'static Schema> {
        self.nested
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, schema)| *schema)
    }

    fn is_binary(&self, key: &str) -> bool {
        self.binary.contains(&key)
    }

    /// Record -> wire envelope.
    pub fn encode(&self, record: &Record) -> Result<Map<String, Value>, CodecError> {
        let mut wire = Map::new();
        for (key, field) in record.iter() {
            let value = if let Some(schema) = self.nested_schema(key) {
                match field {
                    Field::Record(inner) => Value::Object(schema.encode(inner)?),
                    Field::List(items) => Value::Array(
                        items
                            .iter()
                            .map(|item| match item {
                                Field::Record(inner) => schema.encode(inner).map(Value::Object),
                                _ => Err(CodecError::type_mismatch(key, "a nested record")),
                            })
                            .collect::<Result<_, _>>()?,
                    ),
                    _ => return Err(CodecError::type_mismatch(key, "a nested record")),
                }
            } else if self.is_binary(key) {
                match field {
                    Field::Bytes(bytes) => Value::String(encode_bytes(bytes)),
                    Field::List(items) => Value::Array(
                        items
                            .iter()
                            .map(|item| match item {
                                Field::Bytes(bytes) => Ok(Value::String(encode_bytes(bytes))),
                                _ => Err(CodecError::type_mismatch(key, "bytes")),
                            })
                            .collect::<Result<_, _>>()?,
                    ),
                    _ => return Err(CodecError::type_mismatch(key, "bytes")),
                }
            } else {
                pass_through(key, field)?
            };
            wire.insert(key.clone(), value);
        }
        Ok(wire)
    }

    /// Wire envelope -> record.
    pub fn decode(&self, wire: &Map<String, Value>) -> Result<Record, CodecError> {
        let mut record = Record::new();
        for (key, value) in wire {
            let field = if let Some(schema) = self.nested_schema(key) {
                match value {
                    Value::Object(inner) => Field::Record(schema.decode(inner)?),
                    Value::Array(items) => Field::List(
                        items
                            .iter()
                            .map(|item| match item {
                                Value::Object(inner) => schema.decode(inner).map(Field::Record),
                                _ => Err(CodecError::type_mismatch(key, "an object")),
                            })
                            .collect::<Result<_, _>>()?,
                    ),
                    _ => return Err(CodecError::type_mismatch(key, "an object")),
                }
            } else if self.is_binary(key) {
                match value {
                    Value::String(text) => Field::Bytes(decode_field(key, text)?),
                    Value::Array(items) => Field::List(
                        items
                            .iter()
                            .map(|item| match item {
                                Value::String(text) => decode_field(key, text).map(Field::Bytes),
                                _ => Err(CodecError::type_mismatch(key, "a base64 string")),
                            })
                            .collect::<Result<_, _>>()?,
                    ),
                    _ => return Err(CodecError::type_mismatch(key, "a base64 string")),
                }
            } else {
                Field::Json(value.clone())
            };
            record.insert(key.clone(), field);
        }
        Ok(record)
    }

    pub fn marshal(&self, record: &Record) -> Result<Value, CodecError> {
        self.encode(record).map(Value::Object)
    }

    pub fn unmarshal(&self, wire: &Value) -> Result<Record, CodecError> {
        match wire {
            Value::Object(map) => self.decode(map),
            _ => Err(CodecError::type_mismatch("<root>", "an object")),
        }
    }
}

fn decode_field(key: &str, text: &str) -> Result<Vec<u8>, CodecError> {
    decode_bytes(text).map_err(|_| CodecError::InvalidBase64 {
        field: key.to_string(),
    })
}

fn pass_through(key: &str, field: &Field) -> Result<Value, CodecError> {
    match field {
        Field::Json(value) => Ok(value.clone()),
        Field::Record(inner) => Schema::EMPTY.encode(inner).map(Value::Object),
        Field::List(items) => items
            .iter()
            .map(|item| pass_through(key, item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Field::Bytes(_) => Err(CodecError::type_mismatch(key, "a JSON value")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BIN: Schema = Schema::new(&["bin"], &[]);
    const RESPONSE: Schema = Schema::new(&["clientDataJSON", "attestationObject"], &[]);
    const CREDENTIAL: Schema = Schema::new(&["rawId", "ids"], &[("response", &RESPONSE)]);

    #[test]
    fn test_marshal_binary_field() {
        let record = Record::new()
            .with("num", json!(123))
            .with("txt", "xyz")
            .with("bin", b"def".to_vec());

        assert_eq!(
            BIN.marshal(&record).unwrap(),
            json!({ "num": 123, "txt": "xyz", "bin": "ZGVm" })
        );
    }

    #[test]
    fn test_unmarshal_binary_field() {
        let record = BIN
            .unmarshal(&json!({ "num": 123, "txt": "xyz", "bin": "ZGVm" }))
            .unwrap();

        assert_eq!(
            record,
            Record::new()
                .with("num", json!(123))
                .with("txt", "xyz")
                .with("bin", b"def".to_vec())
        );
    }

    #[test]
    fn test_round_trip_nested_and_lists() {
        let record = Record::new()
            .with("id", "abc")
            .with("rawId", vec![0u8, 1, 2, 255])
            .with(
                "ids",
                Field::List(vec![Field::Bytes(vec![1]), Field::Bytes(vec![])]),
            )
            .with(
                "response",
                Record::new()
                    .with("clientDataJSON", b"{}".to_vec())
                    .with("attestationObject", vec![0xa0])
                    .with("transports", json!(["usb"])),
            )
            .with("type", "public-key");

        let wire = CREDENTIAL.marshal(&record).unwrap();
        assert_eq!(wire["response"]["transports"], json!(["usb"]));
        assert_eq!(wire["rawId"], json!("AAEC/w=="));
        assert_eq!(CREDENTIAL.unmarshal(&wire).unwrap(), record);
    }

    #[test]
    fn test_list_of_nested_records() {
        const ITEM: Schema = Schema::new(&["id"], &[]);
        const LIST: Schema = Schema::new(&[], &[("items", &ITEM)]);

        let record = Record::new().with(
            "items",
            Field::List(vec![
                Field::Record(Record::new().with("id", vec![7u8]).with("type", "public-key")),
                Field::Record(Record::new().with("id", vec![8u8])),
            ]),
        );

        let wire = LIST.marshal(&record).unwrap();
        assert_eq!(wire["items"][0]["id"], json!("Bw=="));
        assert_eq!(wire["items"][0]["type"], json!("public-key"));
        assert_eq!(LIST.unmarshal(&wire).unwrap(), record);
    }

    #[test]
    fn test_undeclared_nested_fields_pass_through() {
        let wire = json!({ "response": { "rawId": "AAAA", "other": [1, 2] } });
        let record = CREDENTIAL.unmarshal(&wire).unwrap();
        let Some(Field::Record(inner)) = record.get("response") else {
            panic!("response must decode as a record");
        };
        // `rawId` is only binary at the top level
        assert_eq!(inner.get("rawId"), Some(&Field::Json(json!("AAAA"))));
    }

    #[test]
    fn test_encode_type_mismatch() {
        let record = Record::new().with("bin", "not bytes");
        assert_eq!(
            BIN.marshal(&record),
            Err(CodecError::TypeMismatch {
                field: "bin".into(),
                expected: "bytes"
            })
        );

        let record = Record::new().with("response", vec![1u8]);
        assert!(matches!(
            CREDENTIAL.marshal(&record),
            Err(CodecError::TypeMismatch { .. })
        ));

        let record = Record::new().with("stray", vec![1u8]);
        assert!(matches!(
            BIN.marshal(&record),
            Err(CodecError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_decode_type_mismatch() {
        assert!(matches!(
            BIN.unmarshal(&json!({ "bin": 42 })),
            Err(CodecError::TypeMismatch { .. })
        ));
        assert!(matches!(
            BIN.unmarshal(&json!({ "bin": ["YQ==", null] })),
            Err(CodecError::TypeMismatch { .. })
        ));
        assert!(matches!(
            CREDENTIAL.unmarshal(&json!({ "response": "nope" })),
            Err(CodecError::TypeMismatch { .. })
        ));
        assert!(matches!(
            BIN.unmarshal(&json!([1, 2])),
            Err(CodecError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_decode_is_permissive_about_alphabet_noise() {
        let record = BIN.unmarshal(&json!({ "bin": "ZG\r\nVm" })).unwrap();
        assert_eq!(record.get("bin"), Some(&Field::Bytes(b"def".to_vec())));
    }
}
