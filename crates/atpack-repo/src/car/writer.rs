//! CAR file writing
//!
//! Frames are written in the order the blocks are given. Nothing is
//! deduplicated or sorted, so the caller controls the exact output bytes.

use std::borrow::Borrow;
use std::path::Path;

use atpack_common::{Array, Cid, Data, Object, cbor, varint};

use crate::error::{RepoError, Result};

/// Write roots and blocks to CAR bytes (in-memory)
///
/// The header is `{roots, version: 1}` in canonical DAG-CBOR, matching what
/// other implementations produce.
pub fn write_car_bytes<I, C, D>(roots: &[Cid], blocks: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = (C, D)>,
    C: Borrow<Cid>,
    D: AsRef<[u8]>,
{
    let header: Object = [
        (
            "roots",
            Data::Array(roots.iter().cloned().map(Data::CidLink).collect::<Array>()),
        ),
        ("version", Data::Integer(1)),
    ]
    .into_iter()
    .collect();
    let header = cbor::encode(&Data::Object(header))?;

    let mut out = Vec::with_capacity(header.len() + 8);
    push_len(&mut out, header.len())?;
    out.extend_from_slice(&header);

    for (cid, data) in blocks {
        let cid = cid.borrow().as_bytes();
        let data = data.as_ref();
        push_len(&mut out, cid.len() + data.len())?;
        out.extend_from_slice(cid);
        out.extend_from_slice(data);
    }

    Ok(out)
}

/// Write roots and blocks to a CAR file, replacing it if it exists
#[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all, fields(path = %path.as_ref().display())))]
pub async fn write_car_file<I, C, D>(path: impl AsRef<Path>, roots: &[Cid], blocks: I) -> Result<()>
where
    I: IntoIterator<Item = (C, D)>,
    C: Borrow<Cid>,
    D: AsRef<[u8]>,
{
    let bytes = write_car_bytes(roots, blocks)?;

    #[cfg(feature = "tracing")]
    tracing::debug!(bytes = bytes.len(), "writing car file");

    tokio::fs::write(path.as_ref(), bytes)
        .await
        .map_err(|e| RepoError::io(e).with_context(path.as_ref().display().to_string()))
}

fn push_len(out: &mut Vec<u8>, len: usize) -> Result<()> {
    varint::encode(len as u64, out)
        .map(|_| ())
        .map_err(|e| RepoError::car(e.into()))
}
