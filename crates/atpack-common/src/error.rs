//! Error taxonomy shared by every codec in the crate
//!
//! Each codec module defines its own granular error enum. Every one of them
//! maps onto an [`ErrorKind`] so callers at a trust boundary can classify a
//! failure without matching on codec-specific variants.

use std::fmt;

/// Broad category of a codec failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Wrong magic, version or prefix (e.g. non-v1 archive header, non-`b` CID string)
    Format,
    /// Truncated buffer or a length running past the end of input
    Bounds,
    /// Structurally valid input that breaks a data model rule
    /// (e.g. a non-string map key, a missing block, the wrong root count)
    Integrity,
    /// Numeric magnitude outside the safely encodable range
    Range,
    /// A value of a kind the canonical profile cannot represent
    Type,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Format => "format error",
            ErrorKind::Bounds => "bounds error",
            ErrorKind::Integrity => "integrity error",
            ErrorKind::Range => "range error",
            ErrorKind::Type => "type error",
        };
        f.write_str(s)
    }
}

/// Largest integer magnitude the canonical profile accepts (2^53 - 1)
pub const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;
