//! Whole-repository iteration
//!
//! [`iterate_atp_repo`] reads a repository export, decodes its commit and walks
//! the MST, yielding one [`RepoEntry`] per record. Records are decoded only when
//! asked for.

use std::fmt;
use std::iter::FusedIterator;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use atpack_common::{Cid, Data};
use bytes::Bytes;
use smol_str::SmolStr;

use crate::blocks::BlockMap;
use crate::car::CarReader;
use crate::commit::Commit;
use crate::error::{RepoError, Result, WalkError};
use crate::mst::{MstWalker, WalkEntry};

/// A record in a repository
pub struct RepoEntry {
    collection: SmolStr,
    rkey: SmolStr,
    cid: Cid,
    blocks: Arc<BlockMap>,
    record: OnceLock<Data>,
}

impl RepoEntry {
    /// Collection NSID, the part of the key before the first `/`
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Record key, everything after the first `/`
    pub fn rkey(&self) -> &str {
        &self.rkey
    }

    /// Full MST key
    pub fn key(&self) -> String {
        format!("{}/{}", self.collection, self.rkey)
    }

    /// CID of the record block
    pub fn cid(&self) -> &Cid {
        &self.cid
    }

    /// Raw record block
    pub fn bytes(&self) -> Result<&Bytes> {
        self.blocks
            .get(&self.cid)
            .ok_or_else(|| WalkError::MissingBlock(self.cid.clone()).into())
    }

    /// Decoded record
    ///
    /// Decoded on first access and cached. A failed decode is not cached.
    pub fn record(&self) -> Result<&Data> {
        if let Some(record) = self.record.get() {
            return Ok(record);
        }
        let record = self.blocks.read_object(&self.cid)?;
        Ok(self.record.get_or_init(|| record))
    }

    /// Take the decoded record, decoding it if it was never accessed
    pub fn into_record(self) -> Result<Data> {
        match self.record.into_inner() {
            Some(record) => Ok(record),
            None => self.blocks.read_object(&self.cid),
        }
    }
}

impl fmt::Debug for RepoEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepoEntry")
            .field("collection", &self.collection)
            .field("rkey", &self.rkey)
            .field("cid", &self.cid)
            .finish_non_exhaustive()
    }
}

/// Iterator over the records of a repository, in key order
///
/// Stops after the first error.
pub struct RepoEntries {
    commit: Commit,
    blocks: Arc<BlockMap>,
    walker: MstWalker,
    done: bool,
}

impl fmt::Debug for RepoEntries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepoEntries")
            .field("commit", &self.commit)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl RepoEntries {
    /// The repository commit
    pub fn commit(&self) -> &Commit {
        &self.commit
    }

    /// Every block in the archive
    pub fn blocks(&self) -> &Arc<BlockMap> {
        &self.blocks
    }

    fn make_entry(&self, entry: WalkEntry) -> Result<RepoEntry> {
        let Some((collection, rkey)) = entry.key.split_once('/') else {
            return Err(WalkError::InvalidKey(entry.key).into());
        };
        Ok(RepoEntry {
            collection: SmolStr::new(collection),
            rkey: SmolStr::new(rkey),
            cid: entry.cid,
            blocks: Arc::clone(&self.blocks),
            record: OnceLock::new(),
        })
    }
}

impl Iterator for RepoEntries {
    type Item = Result<RepoEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let result = self
            .walker
            .next()?
            .and_then(|entry| self.make_entry(entry));
        if result.is_err() {
            self.done = true;
        }
        Some(result)
    }
}

impl FusedIterator for RepoEntries {}

/// Read a repository export and iterate over its records
///
/// Fails up front if the archive is malformed, does not have exactly one root,
/// or its root is not a commit. Tree errors surface from the iterator.
#[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all, fields(len = buf.len())))]
pub fn iterate_atp_repo(buf: Bytes) -> Result<RepoEntries> {
    let reader = CarReader::new(buf)?;
    if reader.roots().len() != 1 {
        return Err(WalkError::RootCount(reader.roots().len()).into());
    }

    let (roots, blocks) = BlockMap::from_car(reader)?;
    let root = &roots[0];
    let commit = Commit::from_data(&blocks.read_object(root)?)
        .map_err(|e| e.with_context(format!("commit {}", root)))?;

    #[cfg(feature = "tracing")]
    tracing::debug!(
        did = %commit.did,
        version = commit.version,
        blocks = blocks.len(),
        "walking repository"
    );

    let blocks = Arc::new(blocks);
    let walker = MstWalker::new(Arc::clone(&blocks), commit.data.clone());
    Ok(RepoEntries {
        commit,
        blocks,
        walker,
        done: false,
    })
}

/// Read a repository export from disk and iterate over its records
pub async fn open_repo_file(path: impl AsRef<Path>) -> Result<RepoEntries> {
    let buf = tokio::fs::read(path.as_ref())
        .await
        .map_err(|e| RepoError::io(e).with_context(path.as_ref().display().to_string()))?;
    iterate_atp_repo(Bytes::from(buf))
}
