//! Unsigned variable-length integers
//!
//! Each byte carries seven payload bits, least significant group first, with
//! the high bit set on every byte except the last. Values are limited to
//! `2^53 - 1` in both directions so that anything this module writes can be
//! read back by every other AT Protocol implementation.

use crate::error::{ErrorKind, MAX_SAFE_INTEGER};

const MSB: u8 = 0x80;
const REST: u8 = 0x7f;

/// Varint encoding and decoding errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, miette::Diagnostic)]
pub enum VarintError {
    /// Value is larger than 2^53 - 1
    #[error("could not encode varint: {0} exceeds 2^53-1")]
    #[diagnostic(code(varint::too_large))]
    TooLarge(u64),

    /// Destination slice cannot hold the encoded value
    #[error("could not encode varint: need {needed} bytes, {available} available")]
    #[diagnostic(code(varint::buffer_too_small))]
    BufferTooSmall {
        /// Bytes required from the offset
        needed: usize,
        /// Bytes available from the offset
        available: usize,
    },

    /// Continuation chain ran past the end of the buffer
    #[error("could not decode varint: unexpected end of data")]
    #[diagnostic(code(varint::unexpected_end))]
    UnexpectedEnd,

    /// Decoded value is larger than 2^53 - 1
    #[error("could not decode varint: value exceeds 2^53-1")]
    #[diagnostic(code(varint::overflow))]
    Overflow,
}

impl VarintError {
    /// Taxonomy category for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            VarintError::TooLarge(_) | VarintError::Overflow => ErrorKind::Range,
            VarintError::BufferTooSmall { .. } | VarintError::UnexpectedEnd => ErrorKind::Bounds,
        }
    }
}

/// Number of bytes `encode` writes for `n`
pub fn encoding_length(n: u64) -> usize {
    let bits = 64 - n.leading_zeros() as usize;
    bits.div_ceil(7).max(1)
}

/// Encode `n` into `buf` starting at `offset`, returning the number of bytes written
pub fn encode_into(n: u64, buf: &mut [u8], offset: usize) -> Result<usize, VarintError> {
    if n > MAX_SAFE_INTEGER {
        return Err(VarintError::TooLarge(n));
    }

    let needed = encoding_length(n);
    let available = buf.len().saturating_sub(offset);
    if available < needed {
        return Err(VarintError::BufferTooSmall { needed, available });
    }

    let mut n = n;
    let mut pos = offset;
    while n >= u64::from(MSB) {
        buf[pos] = (n as u8 & REST) | MSB;
        n >>= 7;
        pos += 1;
    }
    buf[pos] = n as u8;

    Ok(needed)
}

/// Append the encoding of `n` to `out`, returning the number of bytes written
pub fn encode(n: u64, out: &mut Vec<u8>) -> Result<usize, VarintError> {
    let start = out.len();
    out.resize(start + encoding_length(n), 0);
    match encode_into(n, out, start) {
        Ok(written) => Ok(written),
        Err(e) => {
            out.truncate(start);
            Err(e)
        }
    }
}

/// Decode a varint from `buf` starting at `offset`
///
/// Returns the value and the number of bytes consumed.
pub fn decode(buf: &[u8], offset: usize) -> Result<(u64, usize), VarintError> {
    let mut value: u64 = 0;
    let mut shift = 0u32;
    let mut pos = offset;

    loop {
        let byte = *buf.get(pos).ok_or(VarintError::UnexpectedEnd)?;
        pos += 1;

        // 2^53 - 1 fits in eight groups of seven bits
        if shift >= 56 {
            return Err(VarintError::Overflow);
        }
        value |= u64::from(byte & REST) << shift;
        if value > MAX_SAFE_INTEGER {
            return Err(VarintError::Overflow);
        }
        shift += 7;

        if byte & MSB == 0 {
            break;
        }
    }

    Ok((value, pos - offset))
}
