//! serde support and the `$link` / `$bytes` JSON interchange form

use std::fmt;

use base64::{Engine, prelude::BASE64_STANDARD_NO_PAD};
use bytes::Bytes;
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{self, MapAccess, SeqAccess, Visitor},
    ser::{SerializeMap, SerializeSeq},
};
use smol_str::SmolStr;

use super::{Array, Data, Object};
use crate::{cid::Cid, error::ErrorKind};

/// Errors converting JSON into [`Data`]
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum JsonError {
    /// Input is not valid JSON, or holds a value the data model cannot represent
    #[error("invalid JSON data: {0}")]
    #[diagnostic(
        code(json::invalid),
        help("links must be {{\"$link\": \"b...\"}} and bytes {{\"$bytes\": \"<base64>\"}}")
    )]
    Json(#[from] serde_json::Error),
}

impl JsonError {
    /// Taxonomy category for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            JsonError::Json(e) if e.is_syntax() || e.is_eof() => ErrorKind::Format,
            JsonError::Json(_) => ErrorKind::Type,
        }
    }
}

impl Data {
    /// Convert a parsed JSON value, recognizing `$link` and `$bytes` objects
    pub fn from_json(value: serde_json::Value) -> Result<Self, JsonError> {
        Ok(Data::deserialize(value)?)
    }

    /// Parse JSON text, recognizing `$link` and `$bytes` objects
    pub fn from_json_slice(json: &[u8]) -> Result<Self, JsonError> {
        Ok(serde_json::from_slice(json)?)
    }

    /// Render as a JSON value using the `$link` / `$bytes` conventions
    pub fn to_json(&self) -> Result<serde_json::Value, JsonError> {
        Ok(serde_json::to_value(self)?)
    }
}

fn decode_base64(s: &str) -> Result<Bytes, base64::DecodeError> {
    // accept padded input, emit unpadded
    BASE64_STANDARD_NO_PAD
        .decode(s.trim_end_matches('='))
        .map(Bytes::from)
}

impl Serialize for Data {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Data::Null => serializer.serialize_none(),
            Data::Boolean(b) => serializer.serialize_bool(*b),
            Data::Integer(i) => serializer.serialize_i64(*i),
            Data::Float(f) => serializer.serialize_f64(*f),
            Data::String(s) => serializer.serialize_str(s),
            Data::Bytes(bytes) => {
                if serializer.is_human_readable() {
                    // JSON: {"$bytes": "base64 string"}
                    let mut map = serializer.serialize_map(Some(1))?;
                    map.serialize_entry("$bytes", &BASE64_STANDARD_NO_PAD.encode(bytes))?;
                    map.end()
                } else {
                    serializer.serialize_bytes(bytes)
                }
            }
            Data::CidLink(cid) => {
                if serializer.is_human_readable() {
                    // JSON: {"$link": "cid string"}
                    let mut map = serializer.serialize_map(Some(1))?;
                    map.serialize_entry("$link", &cid.format())?;
                    map.end()
                } else {
                    cid.serialize(serializer)
                }
            }
            Data::Array(arr) => arr.serialize(serializer),
            Data::Object(obj) => obj.serialize(serializer),
            Data::Undefined => Err(serde::ser::Error::custom("undefined values not supported")),
        }
    }
}

impl Serialize for Array {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for item in &self.0 {
            seq.serialize_element(item)?;
        }
        seq.end()
    }
}

impl Serialize for Object {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let present = self
            .0
            .iter()
            .filter(|(_, v)| !matches!(v, Data::Undefined));
        let mut map = serializer.serialize_map(Some(present.clone().count()))?;
        for (k, v) in present {
            map.serialize_entry(k.as_str(), v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Data {
    /// Only works for self-describing formats
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(DataVisitor)
    }
}

struct DataVisitor;

impl<'de> Visitor<'de> for DataVisitor {
    type Value = Data;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("any valid AT Protocol data value")
    }

    fn visit_none<E>(self) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Data::Null)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Data::Null)
    }

    fn visit_bool<E>(self, v: bool) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Data::Boolean(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Data::Integer(v))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        i64::try_from(v)
            .map(Data::Integer)
            .map_err(|_| E::custom(format!("integer {v} out of range")))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Data::Float(v))
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Data::String(SmolStr::new(v)))
    }

    fn visit_string<E>(self, v: String) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Data::String(SmolStr::from(v)))
    }

    fn visit_bytes<E>(self, v: &[u8]) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Data::Bytes(Bytes::copy_from_slice(v)))
    }

    fn visit_byte_buf<E>(self, v: Vec<u8>) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Data::Bytes(Bytes::from(v)))
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0).min(4096));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Data::Array(Array(items)))
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut object = Object::new();
        while let Some((key, value)) = map.next_entry::<SmolStr, Data>()? {
            object.insert(key, value);
        }

        // {"$link": "..."} and {"$bytes": "..."} are the JSON spellings of the wrappers
        if object.len() == 1 {
            if let Some(Data::String(link)) = object.get("$link") {
                return Cid::parse(link)
                    .map(Data::CidLink)
                    .map_err(de::Error::custom);
            }
            if let Some(Data::String(b64)) = object.get("$bytes") {
                return decode_base64(b64)
                    .map(Data::Bytes)
                    .map_err(de::Error::custom);
            }
        }

        Ok(Data::Object(object))
    }
}
