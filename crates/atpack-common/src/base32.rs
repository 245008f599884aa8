//! Unpadded lowercase RFC4648 base32
//!
//! This is the multibase `b` encoding used for CID strings.

use crate::error::ErrorKind;

const ALPHABET: &[u8; 32] = b"abcdefghijklmnopqrstuvwxyz234567";
const BITS: u32 = 5;

/// Base32 decoding errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, miette::Diagnostic)]
pub enum Base32Error {
    /// Character outside the lowercase base32 alphabet
    #[error("invalid base32 string: unexpected character {ch:?} at {pos}")]
    #[diagnostic(code(base32::invalid_character))]
    InvalidCharacter {
        /// Offending character
        ch: char,
        /// Character index in the input
        pos: usize,
    },

    /// Leftover bits do not form a canonical trailing group
    #[error("unexpected end of data")]
    #[diagnostic(code(base32::unexpected_end))]
    UnexpectedEnd,
}

impl Base32Error {
    /// Taxonomy category for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Base32Error::InvalidCharacter { .. } => ErrorKind::Format,
            Base32Error::UnexpectedEnd => ErrorKind::Bounds,
        }
    }
}

const fn decode_table() -> [u8; 256] {
    let mut table = [0xff; 256];
    let mut i = 0;
    while i < ALPHABET.len() {
        table[ALPHABET[i] as usize] = i as u8;
        i += 1;
    }
    table
}

static DECODE: [u8; 256] = decode_table();

/// Encode bytes as unpadded lowercase base32
pub fn encode(data: &[u8]) -> String {
    let mut out = String::with_capacity((data.len() * 8).div_ceil(5));
    let mut buffer: u32 = 0;
    let mut bits: u32 = 0;

    for &byte in data {
        buffer = (buffer << 8) | u32::from(byte);
        bits += 8;

        while bits >= BITS {
            bits -= BITS;
            out.push(ALPHABET[((buffer >> bits) & 0x1f) as usize] as char);
        }
        buffer &= (1 << bits) - 1;
    }

    if bits > 0 {
        out.push(ALPHABET[((buffer << (BITS - bits)) & 0x1f) as usize] as char);
    }

    out
}

/// Decode unpadded lowercase base32
pub fn decode(s: &str) -> Result<Vec<u8>, Base32Error> {
    let mut out = Vec::with_capacity(s.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits: u32 = 0;

    for (pos, ch) in s.char_indices() {
        let value = if ch.is_ascii() {
            DECODE[ch as usize]
        } else {
            0xff
        };
        if value == 0xff {
            return Err(Base32Error::InvalidCharacter { ch, pos });
        }

        buffer = (buffer << BITS) | u32::from(value);
        bits += BITS;

        if bits >= 8 {
            bits -= 8;
            out.push((buffer >> bits) as u8);
        }
        buffer &= (1 << bits) - 1;
    }

    // leftover must be shorter than a full group and carry only zero padding bits
    if bits >= BITS || buffer != 0 {
        return Err(Base32Error::UnexpectedEnd);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode() {
        assert_eq!(encode(b"lorem ipsum"), "nrxxezlnebuxa43vnu");
        assert_eq!(encode(b""), "");
        assert_eq!(encode(b"f"), "my");
        assert_eq!(encode(b"foobar"), "mzxw6ytboi");
    }

    #[test]
    fn test_decode() {
        let bytes = decode("mrxwy33sebzws5bamfwwk5a").unwrap();
        assert_eq!(bytes, b"dolor sit amet");
        assert_eq!(decode("mzxw6ytboi").unwrap(), b"foobar");
        assert_eq!(decode("").unwrap(), b"");
    }

    #[test]
    fn test_decode_invalid_character() {
        let err = decode("1").unwrap_err();
        assert_eq!(err, Base32Error::InvalidCharacter { ch: '1', pos: 0 });
        assert!(err.to_string().contains("invalid base32 string"));
        assert_eq!(err.kind(), ErrorKind::Format);

        // uppercase is a different multibase
        assert!(decode("MZXW6").is_err());
        assert!(decode("mz=").is_err());
    }

    #[test]
    fn test_decode_unexpected_end() {
        let err = decode("2").unwrap_err();
        assert_eq!(err, Base32Error::UnexpectedEnd);
        assert_eq!(err.to_string(), "unexpected end of data");

        // "mz" has non-zero trailing bits
        assert_eq!(decode("mz").unwrap_err(), Base32Error::UnexpectedEnd);
    }

    #[test]
    fn test_roundtrip_all_lengths() {
        let data: Vec<u8> = (0u8..=255).collect();
        for len in 0..40 {
            let slice = &data[len * 3..len * 3 + len];
            assert_eq!(decode(&encode(slice)).unwrap(), slice);
        }
    }
}
