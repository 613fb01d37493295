use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::CodecError;

/// One value inside a decoded [`Record`].
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Bytes(Vec<u8>),
    List(Vec<Field>),
    Record(Record),
    /// Anything the schema does not declare, kept as plain JSON
    Json(Value),
}

impl From<Vec<u8>> for Field {
    fn from(bytes: Vec<u8>) -> Self {
        Field::Bytes(bytes)
    }
}

impl From<&[u8]> for Field {
    fn from(bytes: &[u8]) -> Self {
        Field::Bytes(bytes.to_vec())
    }
}

impl From<Record> for Field {
    fn from(record: Record) -> Self {
        Field::Record(record)
    }
}

impl From<Value> for Field {
    fn from(value: Value) -> Self {
        Field::Json(value)
    }
}

impl From<&str> for Field {
    fn from(text: &str) -> Self {
        Field::Json(Value::String(text.to_string()))
    }
}

impl From<String> for Field {
    fn from(text: String) -> Self {
        Field::Json(Value::String(text))
    }
}

/// Decoded structure with real bytes in its binary fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: BTreeMap<String, Field>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, field: impl Into<Field>) -> Self {
        self.insert(key, field);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, field: impl Into<Field>) -> Option<Field> {
        self.fields.insert(key.into(), field.into())
    }

    pub fn get(&self, key: &str) -> Option<&Field> {
        self.fields.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Field> {
        self.fields.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Field)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn take_bytes(&mut self, key: &str) -> Result<Vec<u8>, CodecError> {
        self.take_optional_bytes(key)?
            .ok_or_else(|| CodecError::MissingField(key.to_string()))
    }

    pub fn take_optional_bytes(&mut self, key: &str) -> Result<Option<Vec<u8>>, CodecError> {
        match self.fields.remove(key) {
            None => Ok(None),
            Some(Field::Bytes(bytes)) => Ok(Some(bytes)),
            Some(_) => Err(CodecError::type_mismatch(key, "bytes")),
        }
    }

    pub fn take_string(&mut self, key: &str) -> Result<String, CodecError> {
        match self.fields.remove(key) {
            None => Err(CodecError::MissingField(key.to_string())),
            Some(Field::Json(Value::String(text))) => Ok(text),
            Some(_) => Err(CodecError::type_mismatch(key, "a string")),
        }
    }

    pub fn take_record(&mut self, key: &str) -> Result<Record, CodecError> {
        match self.fields.remove(key) {
            None => Err(CodecError::MissingField(key.to_string())),
            Some(Field::Record(record)) => Ok(record),
            Some(_) => Err(CodecError::type_mismatch(key, "a nested record")),
        }
    }

    /// Collect the remaining pass-through fields as a JSON object.
    pub fn into_json(self) -> Result<Map<String, Value>, CodecError> {
        self.fields
            .into_iter()
            .map(|(key, field)| match field {
                Field::Json(value) => Ok((key, value)),
                _ => Err(CodecError::type_mismatch(&key, "a JSON value")),
            })
            .collect()
    }

    /// Inverse of [`Record::into_json`]: every entry becomes a pass-through field.
    pub fn from_json(map: Map<String, Value>) -> Self {
        Self {
            fields: map
                .into_iter()
                .map(|(key, value)| (key, Field::Json(value)))
                .collect(),
        }
    }
}
