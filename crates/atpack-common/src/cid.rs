//! Content identifiers
//!
//! Bare-minimum support for the AT Protocol blessed CID format:
//!
//! - Multibase: `base32` (`b` prefix)
//! - Multicodec: `dag-cbor` (0x71) for records, `raw` (0x55) for blobs
//! - Multihash: `sha-256` (0x12)
//!
//! Only CIDv1 over SHA-256 is ever produced. Anything self-describing can be
//! read, including legacy CIDv0 (a bare multihash), which is normalized to
//! version 0 with the `dag-pb` codec.

use std::{cmp::Ordering, fmt, hash::Hash, str::FromStr};

use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Visitor};
use sha2::{Digest, Sha256};

use crate::{
    base32::{self, Base32Error},
    error::{ErrorKind, MAX_SAFE_INTEGER},
    varint::{self, VarintError},
};

/// dag-pb
pub const DAG_PB: u64 = 0x70;

/// dag-cbor
pub const DAG_CBOR: u64 = 0x71;

/// raw
pub const RAW: u64 = 0x55;

/// SHA-256
pub const SHA2_256: u64 = 0x12;

/// CID parsing and construction errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, miette::Diagnostic)]
pub enum CidError {
    /// String does not use the base32 multibase prefix
    #[error("only base32 cidv1 is supported")]
    #[diagnostic(
        code(cid::unsupported_multibase),
        help("CID strings must start with 'b' (lowercase base32)")
    )]
    UnsupportedMultibase,

    /// Version other than 0 (bare multihash) or 1
    #[error("unsupported cid version {0}")]
    #[diagnostic(code(cid::unsupported_version))]
    UnsupportedVersion(u64),

    /// Buffer is shorter or longer than the identifier it declares
    #[error("incorrect cid length")]
    #[diagnostic(code(cid::incorrect_length))]
    IncorrectLength,

    /// Malformed varint inside the prefix
    #[error("invalid cid prefix: {0}")]
    #[diagnostic(code(cid::varint))]
    Varint(#[from] VarintError),

    /// Malformed base32 payload
    #[error("invalid cid string: {0}")]
    #[diagnostic(code(cid::base32))]
    Base32(#[from] Base32Error),
}

impl CidError {
    /// Taxonomy category for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            CidError::UnsupportedMultibase | CidError::UnsupportedVersion(_) => ErrorKind::Format,
            CidError::IncorrectLength => ErrorKind::Bounds,
            CidError::Varint(e) => e.kind(),
            CidError::Base32(e) => e.kind(),
        }
    }
}

/// Writes a varint without the safe-integer check, for values already validated
fn push_varint(out: &mut Vec<u8>, mut n: u64) {
    while n >= 0x80 {
        out.push((n as u8 & 0x7f) | 0x80);
        n >>= 7;
    }
    out.push(n as u8);
}

fn check_range(n: u64) -> Result<(), CidError> {
    if n > MAX_SAFE_INTEGER {
        Err(VarintError::TooLarge(n).into())
    } else {
        Ok(())
    }
}

/// A multihash: hash function code, digest length and raw digest
///
/// `bytes` holds the full `varint(code) ++ varint(size) ++ digest` encoding and
/// `digest` is a view into it.
#[derive(Clone)]
pub struct Multihash {
    code: u64,
    digest: Bytes,
    bytes: Bytes,
}

impl Multihash {
    /// Wrap a raw digest produced by the hash function `code`
    pub fn new(code: u64, digest: &[u8]) -> Result<Self, CidError> {
        check_range(code)?;
        Ok(Self::new_unchecked(code, digest))
    }

    /// SHA-256 over `input`
    pub fn sha2_256(input: &[u8]) -> Self {
        let hash = Sha256::digest(input);
        Self::new_unchecked(SHA2_256, &hash)
    }

    fn new_unchecked(code: u64, digest: &[u8]) -> Self {
        let mut buf = Vec::with_capacity(
            varint::encoding_length(code) + varint::encoding_length(digest.len() as u64) + digest.len(),
        );
        push_varint(&mut buf, code);
        push_varint(&mut buf, digest.len() as u64);
        let offset = buf.len();
        buf.extend_from_slice(digest);

        let bytes = Bytes::from(buf);
        Self {
            code,
            digest: bytes.slice(offset..),
            bytes,
        }
    }

    /// Hash function code
    pub fn code(&self) -> u64 {
        self.code
    }

    /// Digest length in bytes
    pub fn size(&self) -> usize {
        self.digest.len()
    }

    /// Raw digest
    pub fn digest(&self) -> &[u8] {
        &self.digest
    }

    /// Full encoded multihash
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for Multihash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Multihash")
            .field("code", &format_args!("0x{:x}", self.code))
            .field("size", &self.size())
            .finish()
    }
}

impl PartialEq for Multihash {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for Multihash {}

/// Byte extents of a binary CID, computed without copying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InspectedCid {
    /// CID version (0 for a bare multihash)
    pub version: u64,
    /// Multicodec of the referenced content
    pub codec: u64,
    /// Hash function code
    pub multihash_code: u64,
    /// Digest length in bytes
    pub digest_size: usize,
    /// Length of the multihash (code, size and digest)
    pub multihash_size: usize,
    /// Total length of the binary CID
    pub size: usize,
}

/// Read the prefix of a binary CID and report how long it is
///
/// Only the leading varints are read, so this can bound a single CID inside a
/// larger buffer. It does not check that the digest bytes are actually present.
pub fn inspect(bytes: &[u8]) -> Result<InspectedCid, CidError> {
    let mut offset = 0;
    let next = |offset: &mut usize| -> Result<u64, CidError> {
        let (value, read) = varint::decode(bytes, *offset)?;
        *offset += read;
        Ok(value)
    };

    let mut version = next(&mut offset)?;
    let mut codec = DAG_PB;
    if version == SHA2_256 {
        // CIDv0 is a bare sha-256 multihash
        version = 0;
        offset = 0;
    } else if version == 1 {
        codec = next(&mut offset)?;
    } else {
        return Err(CidError::UnsupportedVersion(version));
    }

    let prefix_size = offset;
    let multihash_code = next(&mut offset)?;
    let digest_size = usize::try_from(next(&mut offset)?).map_err(|_| CidError::IncorrectLength)?;
    let size = offset + digest_size;

    Ok(InspectedCid {
        version,
        codec,
        multihash_code,
        digest_size,
        multihash_size: size - prefix_size,
        size,
    })
}

/// Encode the binary form of a CID from its parts
pub fn encode_prefix(version: u64, codec: u64, multihash: &[u8]) -> Result<Vec<u8>, CidError> {
    check_range(version)?;
    check_range(codec)?;

    let mut buf = Vec::with_capacity(
        varint::encoding_length(version) + varint::encoding_length(codec) + multihash.len(),
    );
    push_varint(&mut buf, version);
    push_varint(&mut buf, codec);
    buf.extend_from_slice(multihash);
    Ok(buf)
}

/// A content identifier
///
/// Cloning is cheap: the binary form is reference counted. Equality, ordering
/// and hashing all use the binary form.
#[derive(Clone)]
pub struct Cid {
    version: u64,
    codec: u64,
    multihash: Multihash,
    bytes: Bytes,
}

impl Cid {
    /// Build a CIDv1 from a codec and multihash
    pub fn new_v1(codec: u64, multihash: Multihash) -> Result<Self, CidError> {
        let bytes = encode_prefix(1, codec, multihash.as_bytes())?;
        Ok(Self {
            version: 1,
            codec,
            multihash,
            bytes: Bytes::from(bytes),
        })
    }

    /// Hash `input` with SHA-256 and wrap it as a CIDv1 with the given codec
    pub fn create(codec: u64, input: &[u8]) -> Result<Self, CidError> {
        check_range(codec)?;
        Self::new_v1(codec, Multihash::sha2_256(input))
    }

    /// CIDv1 for DAG-CBOR encoded content
    pub fn create_dag_cbor(input: &[u8]) -> Self {
        Self::create_known(DAG_CBOR, input)
    }

    /// CIDv1 for raw content (blobs)
    pub fn create_raw(input: &[u8]) -> Self {
        Self::create_known(RAW, input)
    }

    fn create_known(codec: u64, input: &[u8]) -> Self {
        let multihash = Multihash::sha2_256(input);
        let mut buf = Vec::with_capacity(2 + multihash.as_bytes().len());
        push_varint(&mut buf, 1);
        push_varint(&mut buf, codec);
        buf.extend_from_slice(multihash.as_bytes());
        Self {
            version: 1,
            codec,
            multihash,
            bytes: Bytes::from(buf),
        }
    }

    /// Parse the `b`-prefixed base32 string form
    pub fn parse(s: &str) -> Result<Self, CidError> {
        let Some(rest) = s.strip_prefix('b') else {
            return Err(CidError::UnsupportedMultibase);
        };
        let bytes = base32::decode(rest)?;
        Self::from_bytes(Bytes::from(bytes))
    }

    /// Decode a binary CID, failing if any bytes are left over
    pub fn decode(bytes: &[u8]) -> Result<Self, CidError> {
        let (cid, remainder) = Self::decode_first(bytes)?;
        if !remainder.is_empty() {
            return Err(CidError::IncorrectLength);
        }
        Ok(cid)
    }

    /// Decode the first CID in `bytes` and return the remainder
    pub fn decode_first(bytes: &[u8]) -> Result<(Self, &[u8]), CidError> {
        let specs = inspect(bytes)?;
        if bytes.len() < specs.size {
            return Err(CidError::IncorrectLength);
        }
        let cid = Self::from_inspected(Bytes::copy_from_slice(&bytes[..specs.size]), &specs);
        Ok((cid, &bytes[specs.size..]))
    }

    /// Decode an owned binary CID without copying it
    pub fn from_bytes(bytes: Bytes) -> Result<Self, CidError> {
        let specs = inspect(&bytes)?;
        if bytes.len() != specs.size {
            return Err(CidError::IncorrectLength);
        }
        Ok(Self::from_inspected(bytes, &specs))
    }

    fn from_inspected(bytes: Bytes, specs: &InspectedCid) -> Self {
        let prefix_size = specs.size - specs.multihash_size;
        let multihash = Multihash {
            code: specs.multihash_code,
            digest: bytes.slice(specs.size - specs.digest_size..specs.size),
            bytes: bytes.slice(prefix_size..specs.size),
        };
        Self {
            version: specs.version,
            codec: specs.codec,
            multihash,
            bytes,
        }
    }

    /// CID version
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Multicodec of the referenced content
    pub fn codec(&self) -> u64 {
        self.codec
    }

    /// The multihash portion
    pub fn multihash(&self) -> &Multihash {
        &self.multihash
    }

    /// Binary form
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Binary form as a shared buffer
    pub fn to_bytes(&self) -> Bytes {
        self.bytes.clone()
    }

    /// String form: `b` followed by unpadded base32
    pub fn format(&self) -> String {
        let mut s = String::with_capacity(1 + (self.bytes.len() * 8).div_ceil(5));
        s.push('b');
        s.push_str(&base32::encode(&self.bytes));
        s
    }

    /// Check that `data` hashes to this identifier's digest
    ///
    /// Only SHA-256 multihashes can be verified; anything else returns `false`.
    pub fn matches(&self, data: &[u8]) -> bool {
        self.multihash.code == SHA2_256 && Sha256::digest(data).as_slice() == self.multihash.digest()
    }
}

impl PartialEq for Cid {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for Cid {}

impl PartialOrd for Cid {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cid {
    fn cmp(&self, other: &Self) -> Ordering {
        self.bytes.cmp(&other.bytes)
    }
}

impl Hash for Cid {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.bytes.hash(state);
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

impl fmt::Debug for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cid({})", self.format())
    }
}

impl FromStr for Cid {
    type Err = CidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&[u8]> for Cid {
    type Error = CidError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        Self::decode(value)
    }
}

impl AsRef<[u8]> for Cid {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl Serialize for Cid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.format())
        } else {
            serializer.serialize_bytes(self.as_bytes())
        }
    }
}

impl<'de> Deserialize<'de> for Cid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct StringOrBytes;

        impl<'de> Visitor<'de> for StringOrBytes {
            type Value = Cid;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("either a base32 CID string or binary CID bytes")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Cid::parse(v).map_err(E::custom)
            }

            fn visit_bytes<E>(self, v: &[u8]) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Cid::decode(v).map_err(E::custom)
            }
        }

        if deserializer.is_human_readable() {
            deserializer.deserialize_str(StringOrBytes)
        } else {
            deserializer.deserialize_bytes(StringOrBytes)
        }
    }
}
