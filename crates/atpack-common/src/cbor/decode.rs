use bytes::Bytes;
use smol_str::SmolStr;

use super::CID_LINK_TAG;
use crate::{
    Cid, Data,
    cid::CidError,
    error::{ErrorKind, MAX_SAFE_INTEGER},
    value::{Array, Object},
};

/// Deepest array/map nesting the decoder will follow
pub const MAX_DEPTH: usize = 512;

/// DAG-CBOR decoding errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, miette::Diagnostic)]
pub enum DecodeError {
    /// Input ended in the middle of an item
    #[error("unexpected end of data")]
    #[diagnostic(code(cbor::unexpected_end))]
    UnexpectedEnd,

    /// Bytes left over after a complete item
    #[error("decoded value contains remainder ({0} bytes)")]
    #[diagnostic(code(cbor::trailing_bytes))]
    TrailingBytes(usize),

    /// Integer outside ±(2^53 - 1)
    #[error("can't decode integers beyond safe integer range")]
    #[diagnostic(code(cbor::unsafe_integer))]
    UnsafeInteger,

    /// Additional-info value that this profile does not allow
    #[error("invalid argument encoding; got {0}")]
    #[diagnostic(
        code(cbor::invalid_argument),
        help("indefinite-length items are not part of DAG-CBOR")
    )]
    InvalidArgument(u8),

    /// Map key that is not a text string
    #[error("expected map to only have string keys; got major type {0}")]
    #[diagnostic(code(cbor::non_string_key))]
    NonStringKey(u8),

    /// Text that is not valid UTF-8
    #[error("invalid utf-8 in text string")]
    #[diagnostic(code(cbor::invalid_utf8))]
    InvalidUtf8,

    /// Tag other than 42
    #[error("unsupported tag; got {0}")]
    #[diagnostic(code(cbor::unsupported_tag))]
    UnsupportedTag(u64),

    /// Tag 42 wrapping something other than a byte string
    #[error("expected cid tag to have bytes value; got major type {0}")]
    #[diagnostic(code(cbor::invalid_cid_link))]
    CidLinkNotBytes(u8),

    /// Tag 42 byte string without the leading 0x00
    #[error("cid link is missing its 0x00 prefix")]
    #[diagnostic(code(cbor::invalid_cid_link))]
    CidLinkPrefix,

    /// Tag 42 byte string that is not a valid CID
    #[error("invalid cid link: {0}")]
    #[diagnostic(code(cbor::invalid_cid_link))]
    Cid(#[from] CidError),

    /// Simple value or float width outside the profile
    #[error("invalid simple value; got {0}")]
    #[diagnostic(code(cbor::unsupported_simple))]
    UnsupportedSimple(u8),

    /// Nesting deeper than [`MAX_DEPTH`]
    #[error("nesting deeper than {MAX_DEPTH} levels")]
    #[diagnostic(code(cbor::too_deep))]
    TooDeep,
}

impl DecodeError {
    /// Taxonomy category for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            DecodeError::UnexpectedEnd | DecodeError::TrailingBytes(_) | DecodeError::TooDeep => {
                ErrorKind::Bounds
            }
            DecodeError::UnsafeInteger => ErrorKind::Range,
            DecodeError::InvalidArgument(_)
            | DecodeError::InvalidUtf8
            | DecodeError::CidLinkPrefix => ErrorKind::Format,
            DecodeError::NonStringKey(_) => ErrorKind::Integrity,
            DecodeError::UnsupportedTag(_)
            | DecodeError::CidLinkNotBytes(_)
            | DecodeError::UnsupportedSimple(_) => ErrorKind::Type,
            DecodeError::Cid(e) => e.kind(),
        }
    }
}

/// Decode exactly one value, failing if any bytes remain
#[cfg_attr(feature = "tracing", tracing::instrument(level = "trace", skip_all, fields(len = buf.len())))]
pub fn decode(buf: &[u8]) -> Result<Data, DecodeError> {
    let (value, remainder) = decode_first(buf)?;
    if !remainder.is_empty() {
        return Err(DecodeError::TrailingBytes(remainder.len()));
    }
    Ok(value)
}

/// Decode the first value in `buf` and return the unread remainder
pub fn decode_first(buf: &[u8]) -> Result<(Data, &[u8]), DecodeError> {
    let mut state = State { buf, pos: 0 };
    let value = state.read_value(0)?;
    Ok((value, &buf[state.pos..]))
}

struct State<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> State<'a> {
    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn read_slice(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if len > self.remaining() {
            return Err(DecodeError::UnexpectedEnd);
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_slice(N)?);
        Ok(out)
    }

    fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.read_array::<1>()?[0])
    }

    fn read_argument(&mut self, info: u8) -> Result<u64, DecodeError> {
        match info {
            0..24 => Ok(u64::from(info)),
            24 => Ok(u64::from(self.read_u8()?)),
            25 => Ok(u64::from(u16::from_be_bytes(self.read_array()?))),
            26 => Ok(u64::from(u32::from_be_bytes(self.read_array()?))),
            27 => Ok(u64::from_be_bytes(self.read_array()?)),
            _ => Err(DecodeError::InvalidArgument(info)),
        }
    }

    /// Reads a length argument, rejecting lengths that cannot fit in the rest of the input
    fn read_length(&mut self, info: u8, min_item_size: usize) -> Result<usize, DecodeError> {
        let len = self.read_argument(info)?;
        let len = usize::try_from(len).map_err(|_| DecodeError::UnexpectedEnd)?;
        if len.saturating_mul(min_item_size) > self.remaining() {
            return Err(DecodeError::UnexpectedEnd);
        }
        Ok(len)
    }

    fn read_string(&mut self, info: u8) -> Result<SmolStr, DecodeError> {
        let len = self.read_length(info, 1)?;
        let slice = self.read_slice(len)?;
        std::str::from_utf8(slice)
            .map(SmolStr::new)
            .map_err(|_| DecodeError::InvalidUtf8)
    }

    fn read_cid_link(&mut self) -> Result<Cid, DecodeError> {
        let prelude = self.read_u8()?;
        let major = prelude >> 5;
        if major != 2 {
            return Err(DecodeError::CidLinkNotBytes(major));
        }

        let len = self.read_length(prelude & 0x1f, 1)?;
        let slice = self.read_slice(len)?;
        match slice.split_first() {
            Some((&0, cid)) => Ok(Cid::decode(cid)?),
            _ => Err(DecodeError::CidLinkPrefix),
        }
    }

    fn read_value(&mut self, depth: usize) -> Result<Data, DecodeError> {
        if depth > MAX_DEPTH {
            return Err(DecodeError::TooDeep);
        }

        let prelude = self.read_u8()?;
        let major = prelude >> 5;
        let info = prelude & 0x1f;

        match major {
            0 => {
                let arg = self.read_argument(info)?;
                if arg > MAX_SAFE_INTEGER {
                    return Err(DecodeError::UnsafeInteger);
                }
                Ok(Data::Integer(arg as i64))
            }
            1 => {
                let arg = self.read_argument(info)?;
                // -1 - arg must stay at or above -(2^53 - 1)
                if arg >= MAX_SAFE_INTEGER {
                    return Err(DecodeError::UnsafeInteger);
                }
                Ok(Data::Integer(-1 - arg as i64))
            }
            2 => {
                let len = self.read_length(info, 1)?;
                Ok(Data::Bytes(Bytes::copy_from_slice(self.read_slice(len)?)))
            }
            3 => Ok(Data::String(self.read_string(info)?)),
            4 => {
                let len = self.read_length(info, 1)?;
                let mut items = Vec::with_capacity(len);
                for _ in 0..len {
                    items.push(self.read_value(depth + 1)?);
                }
                Ok(Data::Array(Array(items)))
            }
            5 => {
                let len = self.read_length(info, 2)?;
                let mut object = Object::new();
                for _ in 0..len {
                    let key_prelude = *self
                        .buf
                        .get(self.pos)
                        .ok_or(DecodeError::UnexpectedEnd)?;
                    if key_prelude >> 5 != 3 {
                        return Err(DecodeError::NonStringKey(key_prelude >> 5));
                    }
                    self.pos += 1;
                    let key = self.read_string(key_prelude & 0x1f)?;
                    let value = self.read_value(depth + 1)?;
                    object.insert(key, value);
                }
                Ok(Data::Object(object))
            }
            6 => {
                let tag = self.read_argument(info)?;
                if tag != CID_LINK_TAG {
                    return Err(DecodeError::UnsupportedTag(tag));
                }
                Ok(Data::CidLink(self.read_cid_link()?))
            }
            _ => match info {
                20 => Ok(Data::Boolean(false)),
                21 => Ok(Data::Boolean(true)),
                22 => Ok(Data::Null),
                25 => Ok(Data::Float(f16_to_f64(u16::from_be_bytes(
                    self.read_array()?,
                )))),
                26 => Ok(Data::Float(f64::from(f32::from_be_bytes(
                    self.read_array()?,
                )))),
                27 => Ok(Data::Float(f64::from_be_bytes(self.read_array()?))),
                _ => Err(DecodeError::UnsupportedSimple(info)),
            },
        }
    }
}

/// IEEE-754 binary16 to f64
fn f16_to_f64(bits: u16) -> f64 {
    let sign = if bits & 0x8000 != 0 { -1.0 } else { 1.0 };
    let exponent = i32::from((bits >> 10) & 0x1f);
    let mantissa = f64::from(bits & 0x3ff);

    let magnitude = match exponent {
        0 => mantissa * 2f64.powi(-24),
        31 if mantissa == 0.0 => f64::INFINITY,
        31 => f64::NAN,
        _ => (1.0 + mantissa / 1024.0) * 2f64.powi(exponent - 15),
    };
    sign * magnitude
}
