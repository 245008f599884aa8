//! The decoded value tree
//!
//! [`Data`] is what the CBOR decoder produces and what the encoder consumes.
//! Links and byte strings get their own variants so a record's shape survives a
//! round trip through either DAG-CBOR or the `$link` / `$bytes` JSON form.

use std::{
    collections::BTreeMap,
    fmt,
    ops::{Deref, DerefMut},
};

use bytes::Bytes;
use smol_str::SmolStr;

use crate::cid::Cid;

mod json;

pub use json::JsonError;

/// An AT Protocol data model value
#[derive(Debug, Clone, PartialEq)]
pub enum Data {
    /// CBOR `null`
    Null,
    /// Boolean
    Boolean(bool),
    /// Integer within ±(2^53 - 1)
    Integer(i64),
    /// Non-integral 64-bit float
    Float(f64),
    /// UTF-8 text
    String(SmolStr),
    /// Opaque binary blob
    Bytes(Bytes),
    /// Link to another block
    CidLink(Cid),
    /// Ordered array
    Array(Array),
    /// String-keyed map
    Object(Object),
    /// Absent value
    ///
    /// Object properties holding this are left out when encoding. Anywhere
    /// else it is an encoding error.
    Undefined,
}

/// Array of data values
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Array(pub Vec<Data>);

/// String-keyed map of data values
///
/// Iteration order is plain lexicographic. The encoder applies canonical
/// (length-first) ordering on its own.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Object(pub BTreeMap<SmolStr, Data>);

impl Data {
    /// Name of the variant, for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Data::Null => "null",
            Data::Boolean(_) => "boolean",
            Data::Integer(_) => "integer",
            Data::Float(_) => "float",
            Data::String(_) => "string",
            Data::Bytes(_) => "bytes",
            Data::CidLink(_) => "cid-link",
            Data::Array(_) => "array",
            Data::Object(_) => "object",
            Data::Undefined => "undefined",
        }
    }

    /// Whether this is `null`
    pub fn is_null(&self) -> bool {
        matches!(self, Data::Null)
    }

    /// Boolean value, if this is one
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Data::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer value, if this is one
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Data::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric value as a float, for both integers and floats
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Data::Float(f) => Some(*f),
            Data::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Text value, if this is one
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Data::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Byte string, if this is one
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Data::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Link, if this is one
    pub fn as_link(&self) -> Option<&Cid> {
        match self {
            Data::CidLink(cid) => Some(cid),
            _ => None,
        }
    }

    /// Array, if this is one
    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Data::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Object, if this is one
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Data::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Look up an object property
    ///
    /// Returns `None` for non-objects and for missing or undefined properties.
    pub fn get(&self, key: &str) -> Option<&Data> {
        self.as_object()
            .and_then(|o| o.get(key))
            .filter(|v| !matches!(v, Data::Undefined))
    }

    /// `$link` string form of a link
    pub fn link_str(&self) -> Option<String> {
        self.as_link().map(Cid::format)
    }
}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(s) => f.write_str(&s),
            Err(_) => f.write_str(self.type_name()),
        }
    }
}

impl Object {
    /// Empty object
    pub fn new() -> Self {
        Self::default()
    }
}

impl Deref for Object {
    type Target = BTreeMap<SmolStr, Data>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Object {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl Array {
    /// Empty array
    pub fn new() -> Self {
        Self::default()
    }
}

impl Deref for Array {
    type Target = Vec<Data>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Array {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<K: Into<SmolStr>> FromIterator<(K, Data)> for Object {
    fn from_iter<T: IntoIterator<Item = (K, Data)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl FromIterator<Data> for Array {
    fn from_iter<T: IntoIterator<Item = Data>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<bool> for Data {
    fn from(value: bool) -> Self {
        Data::Boolean(value)
    }
}

impl From<i64> for Data {
    fn from(value: i64) -> Self {
        Data::Integer(value)
    }
}

impl From<i32> for Data {
    fn from(value: i32) -> Self {
        Data::Integer(value.into())
    }
}

impl From<u32> for Data {
    fn from(value: u32) -> Self {
        Data::Integer(value.into())
    }
}

impl From<f64> for Data {
    fn from(value: f64) -> Self {
        Data::Float(value)
    }
}

impl From<&str> for Data {
    fn from(value: &str) -> Self {
        Data::String(SmolStr::new(value))
    }
}

impl From<String> for Data {
    fn from(value: String) -> Self {
        Data::String(SmolStr::from(value))
    }
}

impl From<SmolStr> for Data {
    fn from(value: SmolStr) -> Self {
        Data::String(value)
    }
}

impl From<Bytes> for Data {
    fn from(value: Bytes) -> Self {
        Data::Bytes(value)
    }
}

impl From<Vec<u8>> for Data {
    fn from(value: Vec<u8>) -> Self {
        Data::Bytes(Bytes::from(value))
    }
}

impl From<Cid> for Data {
    fn from(value: Cid) -> Self {
        Data::CidLink(value)
    }
}

impl From<Array> for Data {
    fn from(value: Array) -> Self {
        Data::Array(value)
    }
}

impl From<Vec<Data>> for Data {
    fn from(value: Vec<Data>) -> Self {
        Data::Array(Array(value))
    }
}

impl From<Object> for Data {
    fn from(value: Object) -> Self {
        Data::Object(value)
    }
}

impl<T: Into<Data>> From<Option<T>> for Data {
    fn from(value: Option<T>) -> Self {
        value.map_or(Data::Null, Into::into)
    }
}
