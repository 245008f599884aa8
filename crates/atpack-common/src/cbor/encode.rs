use bytes::BufMut;
use smol_str::SmolStr;

use super::CID_LINK_TAG;
use crate::{
    Cid, Data,
    error::{ErrorKind, MAX_SAFE_INTEGER},
    value::Object,
};

/// DAG-CBOR encoding errors
#[derive(Debug, Clone, PartialEq, thiserror::Error, miette::Diagnostic)]
pub enum EncodeError {
    /// Integer magnitude above 2^53 - 1
    #[error("can't encode integer {0} beyond safe integer range")]
    #[diagnostic(code(cbor::unsafe_integer))]
    UnsafeInteger(i64),

    /// Float that is infinite or larger than the safe integer range
    #[error("can't encode number {0} beyond safe integer range")]
    #[diagnostic(code(cbor::unsafe_float))]
    UnsafeFloat(f64),

    /// NaN has no canonical encoding
    #[error("NaN values not supported")]
    #[diagnostic(code(cbor::nan))]
    NaN,

    /// Undefined outside an object property
    #[error("undefined values not supported")]
    #[diagnostic(
        code(cbor::undefined),
        help("undefined is only allowed as an object property value, where it is omitted")
    )]
    Undefined,
}

impl EncodeError {
    /// Taxonomy category for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            EncodeError::UnsafeInteger(_) | EncodeError::UnsafeFloat(_) => ErrorKind::Range,
            EncodeError::NaN | EncodeError::Undefined => ErrorKind::Type,
        }
    }
}

/// Encode a value to canonical DAG-CBOR
#[cfg_attr(feature = "tracing", tracing::instrument(level = "trace", skip_all))]
pub fn encode(value: &Data) -> Result<Vec<u8>, EncodeError> {
    let mut out = Vec::with_capacity(128);
    encode_into(value, &mut out)?;
    Ok(out)
}

/// Append the canonical DAG-CBOR encoding of a value to `out`
///
/// On error `out` may hold a partial encoding.
pub fn encode_into(value: &Data, out: &mut Vec<u8>) -> Result<(), EncodeError> {
    write_value(out, value)
}

const MAJOR_UNSIGNED: u8 = 0;
const MAJOR_NEGATIVE: u8 = 1;
const MAJOR_BYTES: u8 = 2;
const MAJOR_TEXT: u8 = 3;
const MAJOR_ARRAY: u8 = 4;
const MAJOR_MAP: u8 = 5;
const MAJOR_TAG: u8 = 6;

const FALSE: u8 = 0xf4;
const TRUE: u8 = 0xf5;
const NULL: u8 = 0xf6;
const FLOAT64: u8 = 0xfb;

fn write_type_and_argument(out: &mut Vec<u8>, major: u8, arg: u64) {
    let major = major << 5;
    if arg < 24 {
        out.put_u8(major | arg as u8);
    } else if arg <= u64::from(u8::MAX) {
        out.put_u8(major | 24);
        out.put_u8(arg as u8);
    } else if arg <= u64::from(u16::MAX) {
        out.put_u8(major | 25);
        out.put_u16(arg as u16);
    } else if arg <= u64::from(u32::MAX) {
        out.put_u8(major | 26);
        out.put_u32(arg as u32);
    } else {
        out.put_u8(major | 27);
        out.put_u64(arg);
    }
}

fn write_integer(out: &mut Vec<u8>, n: i64) -> Result<(), EncodeError> {
    if n.unsigned_abs() > MAX_SAFE_INTEGER {
        return Err(EncodeError::UnsafeInteger(n));
    }
    if n < 0 {
        // -(n + 1), without overflow
        write_type_and_argument(out, MAJOR_NEGATIVE, !n as u64);
    } else {
        write_type_and_argument(out, MAJOR_UNSIGNED, n as u64);
    }
    Ok(())
}

fn write_float(out: &mut Vec<u8>, f: f64) -> Result<(), EncodeError> {
    if f.is_nan() {
        return Err(EncodeError::NaN);
    }
    if !f.is_finite() || f.abs() > MAX_SAFE_INTEGER as f64 {
        return Err(EncodeError::UnsafeFloat(f));
    }

    // integral numbers (including -0.0) take the integer form
    if f.fract() == 0.0 {
        return write_integer(out, f as i64);
    }

    out.put_u8(FLOAT64);
    out.put_f64(f);
    Ok(())
}

fn write_string(out: &mut Vec<u8>, s: &str) {
    write_type_and_argument(out, MAJOR_TEXT, s.len() as u64);
    out.put_slice(s.as_bytes());
}

fn write_bytes(out: &mut Vec<u8>, b: &[u8]) {
    write_type_and_argument(out, MAJOR_BYTES, b.len() as u64);
    out.put_slice(b);
}

fn write_cid(out: &mut Vec<u8>, cid: &Cid) {
    let bytes = cid.as_bytes();
    write_type_and_argument(out, MAJOR_TAG, CID_LINK_TAG);
    // leading 0x00 is the multibase "identity" prefix mandated by DAG-CBOR
    write_type_and_argument(out, MAJOR_BYTES, bytes.len() as u64 + 1);
    out.put_u8(0);
    out.put_slice(bytes);
}

/// Canonical key order: shorter keys first, then bytewise
fn compare_keys(a: &str, b: &str) -> std::cmp::Ordering {
    a.len()
        .cmp(&b.len())
        .then_with(|| a.as_bytes().cmp(b.as_bytes()))
}

fn write_object(out: &mut Vec<u8>, obj: &Object) -> Result<(), EncodeError> {
    let mut entries: Vec<(&SmolStr, &Data)> = obj
        .iter()
        .filter(|(_, v)| !matches!(v, Data::Undefined))
        .collect();
    entries.sort_unstable_by(|(a, _), (b, _)| compare_keys(a, b));

    write_type_and_argument(out, MAJOR_MAP, entries.len() as u64);
    for (key, value) in entries {
        write_string(out, key);
        write_value(out, value)?;
    }
    Ok(())
}

fn write_value(out: &mut Vec<u8>, value: &Data) -> Result<(), EncodeError> {
    match value {
        Data::Null => out.put_u8(NULL),
        Data::Boolean(false) => out.put_u8(FALSE),
        Data::Boolean(true) => out.put_u8(TRUE),
        Data::Integer(n) => write_integer(out, *n)?,
        Data::Float(f) => write_float(out, *f)?,
        Data::String(s) => write_string(out, s),
        Data::Bytes(b) => write_bytes(out, b),
        Data::CidLink(cid) => write_cid(out, cid),
        Data::Array(items) => {
            write_type_and_argument(out, MAJOR_ARRAY, items.len() as u64);
            for item in items.iter() {
                write_value(out, item)?;
            }
        }
        Data::Object(obj) => write_object(out, obj)?,
        Data::Undefined => return Err(EncodeError::Undefined),
    }
    Ok(())
}
