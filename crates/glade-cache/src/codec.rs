//! Value codec.
//!
//! Entries are stored as JSON text. Anything that implements `Serialize`
//! can be cached; byte payloads go through [`Binary`] so they keep the
//! `{"type":"Buffer","data":[...]}` shape that other clients of the same
//! store already read and write.

use glade_core::CacheResult;
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Serializes a value to its stored JSON text.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> CacheResult<String> {
    Ok(serde_json::to_string(value)?)
}

/// Serializes a value to a JSON tree, for inspection before storing.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> CacheResult<Value> {
    Ok(serde_json::to_value(value)?)
}

/// Deserializes stored JSON text.
pub fn decode<T: DeserializeOwned>(text: &str) -> CacheResult<T> {
    Ok(serde_json::from_str(text)?)
}

/// Returns true for values treated as "nothing to cache": `null`, `false`,
/// numeric zero and the empty string.
#[must_use]
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Binary payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Binary(pub Vec<u8>);

impl Binary {
    /// Returns the bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consumes the payload, returning the bytes.
    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for Binary {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Binary {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

const BUFFER_TAG: &str = "Buffer";

#[derive(Serialize)]
struct BufferRef<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    data: &'a [u8],
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BufferRepr {
    Tagged {
        #[serde(rename = "type")]
        kind: String,
        data: Vec<u8>,
    },
    Bare(Vec<u8>),
}

impl Serialize for Binary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        BufferRef {
            kind: BUFFER_TAG,
            data: &self.0,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Binary {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match BufferRepr::deserialize(deserializer)? {
            BufferRepr::Tagged { kind, data } if kind == BUFFER_TAG => Ok(Self(data)),
            BufferRepr::Tagged { kind, .. } => Err(de::Error::custom(format!(
                "expected a {BUFFER_TAG} payload, found type '{kind}'"
            ))),
            BufferRepr::Bare(data) => Ok(Self(data)),
        }
    }
}
