//! Binary encoding of token payload tuples.
//!
//! A payload is an ordered tuple of primitive fields, encoded as a single
//! CBOR array. CBOR is self-describing, so the tuple's arity and field types
//! are recoverable without knowing the token format in advance.

use crate::error::TokenError;
use ciborium::value::{Integer, Value};

/// One field of a payload tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadField {
    Bytes(Vec<u8>),
    Integer(i64),
    Text(String),
    Array(Vec<PayloadField>),
}

impl PayloadField {
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Short name of the field's type, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bytes(_) => "bytes",
            Self::Integer(_) => "integer",
            Self::Text(_) => "text",
            Self::Array(_) => "array",
        }
    }

    fn into_value(self) -> Value {
        match self {
            Self::Bytes(b) => Value::Bytes(b),
            Self::Integer(i) => Value::Integer(Integer::from(i)),
            Self::Text(t) => Value::Text(t),
            Self::Array(items) => Value::Array(items.into_iter().map(Self::into_value).collect()),
        }
    }

    fn from_value(value: Value) -> Result<Self, TokenError> {
        match value {
            Value::Bytes(b) => Ok(Self::Bytes(b)),
            Value::Integer(i) => i64::try_from(i).map(Self::Integer).map_err(|_| {
                TokenError::MalformedPayload("integer field out of range".to_string())
            }),
            Value::Text(t) => Ok(Self::Text(t)),
            Value::Array(items) => items
                .into_iter()
                .map(Self::from_value)
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Array),
            other => Err(TokenError::MalformedPayload(format!(
                "unsupported field type: {other:?}"
            ))),
        }
    }
}

/// Encode a payload tuple.
pub fn encode(fields: &[PayloadField]) -> Result<Vec<u8>, TokenError> {
    let value = Value::Array(fields.iter().cloned().map(PayloadField::into_value).collect());
    let mut buf = Vec::new();
    ciborium::ser::into_writer(&value, &mut buf)
        .map_err(|e| TokenError::MalformedPayload(format!("encode failed: {e}")))?;
    Ok(buf)
}

/// Decode a payload tuple. Field semantics are not checked here.
pub fn decode(bytes: &[u8]) -> Result<Vec<PayloadField>, TokenError> {
    let mut reader = bytes;
    let value: Value = ciborium::de::from_reader(&mut reader)
        .map_err(|e| TokenError::MalformedPayload(e.to_string()))?;

    if !reader.is_empty() {
        return Err(TokenError::MalformedPayload(format!(
            "{} trailing bytes after payload",
            reader.len()
        )));
    }

    match PayloadField::from_value(value)? {
        PayloadField::Array(fields) => Ok(fields),
        other => Err(TokenError::MalformedPayload(format!(
            "expected a tuple, found {}",
            other.kind()
        ))),
    }
}
