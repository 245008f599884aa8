//! Canonical DAG-CBOR
//!
//! A constrained, deterministic CBOR profile. Encoding the same [`Data`] always
//! yields the same bytes, so the resulting CIDs agree across implementations:
//!
//! - integers use the shortest argument form and are limited to ±(2^53 - 1)
//! - non-integral numbers are always 8-byte IEEE-754 floats
//! - map keys are text, ordered by byte length and then bytewise
//! - links are tag 42 over a byte string holding `0x00` followed by the binary CID
//!
//! Indefinite-length items, other tags and non-text map keys are rejected.

mod decode;
mod encode;

pub use decode::{DecodeError, MAX_DEPTH, decode, decode_first};
pub use encode::{EncodeError, encode, encode_into};

use crate::{Cid, Data};

/// CBOR tag for content links
pub const CID_LINK_TAG: u64 = 42;

/// Canonically encode `value` and compute its DAG-CBOR CID
///
/// This is the identifier a PDS assigns to a record with this content.
pub fn cid_for(value: &Data) -> Result<Cid, EncodeError> {
    let bytes = encode(value)?;
    Ok(Cid::create_dag_cbor(&bytes))
}

#[cfg(test)]
mod tests;
