//! MST node wire structures

use atpack_common::{Array, Cid, Data, Object};
use bytes::Bytes;

use crate::error::WalkError;

/// Wire format entry (prefix-compressed leaf with optional subtree pointer)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Prefix length (bytes shared with the previous key in this node)
    pub prefix_len: usize,

    /// Key suffix after the shared prefix
    pub key_suffix: Bytes,

    /// CID of the record value
    pub value: Cid,

    /// Subtree holding keys between this entry and the next one
    pub tree: Option<Cid>,
}

/// Wire format node data
///
/// `left` holds keys sorting before every entry. Each entry's `tree` holds keys
/// sorting after that entry and before the next one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeData {
    /// Left-most subtree
    pub left: Option<Cid>,

    /// Entries in key order
    pub entries: Vec<TreeEntry>,
}

fn malformed(msg: impl Into<String>) -> WalkError {
    WalkError::MalformedNode(msg.into())
}

fn optional_link(value: Option<&Data>, name: &str) -> Result<Option<Cid>, WalkError> {
    match value {
        None | Some(Data::Null) => Ok(None),
        Some(Data::CidLink(cid)) => Ok(Some(cid.clone())),
        Some(other) => Err(malformed(format!(
            "{} must be a link or null, got {}",
            name,
            other.type_name()
        ))),
    }
}

impl TreeEntry {
    fn from_data(value: &Data) -> Result<Self, WalkError> {
        let prefix_len = value
            .get("p")
            .and_then(Data::as_integer)
            .and_then(|p| usize::try_from(p).ok())
            .ok_or_else(|| malformed("entry p must be a non-negative integer"))?;
        let key_suffix = value
            .get("k")
            .and_then(Data::as_bytes)
            .ok_or_else(|| malformed("entry k must be bytes"))?
            .clone();
        let value_cid = value
            .get("v")
            .and_then(Data::as_link)
            .ok_or_else(|| malformed("entry v must be a link"))?
            .clone();
        let tree = optional_link(value.get("t"), "entry t")?;

        Ok(Self {
            prefix_len,
            key_suffix,
            value: value_cid,
            tree,
        })
    }

    fn to_data(&self) -> Data {
        let mut obj = Object::new();
        obj.insert("p".into(), Data::Integer(self.prefix_len as i64));
        obj.insert("k".into(), Data::Bytes(self.key_suffix.clone()));
        obj.insert("v".into(), Data::CidLink(self.value.clone()));
        obj.insert(
            "t".into(),
            self.tree.clone().map_or(Data::Null, Data::CidLink),
        );
        Data::Object(obj)
    }
}

impl NodeData {
    /// Read a node from a decoded block
    pub fn from_data(value: &Data) -> Result<Self, WalkError> {
        if value.as_object().is_none() {
            return Err(malformed(format!(
                "expected object, got {}",
                value.type_name()
            )));
        }

        let left = optional_link(value.get("l"), "l")?;
        let entries = value
            .get("e")
            .and_then(Data::as_array)
            .ok_or_else(|| malformed("e must be an array"))?
            .iter()
            .map(TreeEntry::from_data)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { left, entries })
    }

    /// Convert to the block representation, with explicit nulls for empty links
    pub fn to_data(&self) -> Data {
        let mut obj = Object::new();
        obj.insert("l".into(), self.left.clone().map_or(Data::Null, Data::CidLink));
        obj.insert(
            "e".into(),
            Data::Array(self.entries.iter().map(TreeEntry::to_data).collect::<Array>()),
        );
        Data::Object(obj)
    }

    /// Rebuild the full keys of this node's entries
    ///
    /// Each key is the previous key's first `p` bytes followed by `k`. The
    /// first entry is relative to the empty key.
    pub fn full_keys(&self) -> Result<Vec<String>, WalkError> {
        let mut keys = Vec::with_capacity(self.entries.len());
        let mut last: Vec<u8> = Vec::new();

        for entry in &self.entries {
            if entry.prefix_len > last.len() {
                return Err(WalkError::PrefixTooLong {
                    prefix: entry.prefix_len,
                    previous: last.len(),
                });
            }
            last.truncate(entry.prefix_len);
            last.extend_from_slice(&entry.key_suffix);

            let key = std::str::from_utf8(&last).map_err(|_| WalkError::KeyNotUtf8)?;
            keys.push(key.to_owned());
        }

        Ok(keys)
    }
}
