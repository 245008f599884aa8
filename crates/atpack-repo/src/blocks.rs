//! In-memory block map built from an archive

use std::collections::BTreeMap;

use atpack_common::{Cid, Data, cbor};
use bytes::Bytes;

use crate::car::CarReader;
use crate::error::{RepoError, Result, WalkError};

/// Mapping of CID to raw block bytes
///
/// Blocks are stored as given; nothing checks that a block hashes to its CID
/// unless [`BlockMap::verify`] is called.
#[derive(Debug, Clone, Default)]
pub struct BlockMap {
    blocks: BTreeMap<Cid, Bytes>,
}

impl BlockMap {
    /// Empty block map
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every frame of an archive into a block map
    ///
    /// Returns the archive roots alongside the blocks. A later frame with the
    /// same CID replaces an earlier one.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all))]
    pub fn from_car(reader: CarReader) -> Result<(Vec<Cid>, Self)> {
        let (roots, frames) = reader.into_parts();
        let mut map = Self::new();
        for block in frames {
            let block = block?;
            map.insert(block.cid, block.data);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(blocks = map.len(), "loaded car blocks");

        Ok((roots, map))
    }

    /// Raw bytes of a block
    pub fn get(&self, cid: &Cid) -> Option<&Bytes> {
        self.blocks.get(cid)
    }

    /// Whether a block is present
    pub fn contains(&self, cid: &Cid) -> bool {
        self.blocks.contains_key(cid)
    }

    /// Decode a block as DAG-CBOR
    ///
    /// A missing block is an error, never `None`.
    pub fn read_object(&self, cid: &Cid) -> Result<Data> {
        let bytes = self
            .get(cid)
            .ok_or_else(|| WalkError::MissingBlock(cid.clone()))?;
        cbor::decode(bytes).map_err(|e| RepoError::decode(e).with_context(format!("block {}", cid)))
    }

    /// Add a block, returning the previous bytes stored under the CID
    pub fn insert(&mut self, cid: Cid, bytes: Bytes) -> Option<Bytes> {
        self.blocks.insert(cid, bytes)
    }

    /// Number of blocks
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the map holds no blocks
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Iterate over blocks in CID byte order
    pub fn iter(&self) -> impl Iterator<Item = (&Cid, &Bytes)> {
        self.blocks.iter()
    }

    /// CIDs whose block contents do not hash to them
    ///
    /// Only SHA-256 CIDs can be checked; any other hash is reported as a mismatch.
    pub fn verify(&self) -> Vec<Cid> {
        self.blocks
            .iter()
            .filter(|(cid, bytes)| !cid.matches(bytes))
            .map(|(cid, _)| cid.clone())
            .collect()
    }
}

impl FromIterator<(Cid, Bytes)> for BlockMap {
    fn from_iter<T: IntoIterator<Item = (Cid, Bytes)>>(iter: T) -> Self {
        Self {
            blocks: iter.into_iter().collect(),
        }
    }
}
