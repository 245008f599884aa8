//! In-order MST traversal over a block map
//!
//! The walk uses an explicit work stack, so tree depth is bounded only by
//! memory. Visiting a node pushes its left subtree, then each entry followed by
//! its right subtree, in reverse so they pop in key order.

use std::collections::HashSet;
use std::iter::FusedIterator;
use std::sync::Arc;

use atpack_common::Cid;

use super::node::NodeData;
use crate::blocks::BlockMap;
use crate::error::{RepoError, Result, WalkError};

/// A key and the CID it maps to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    /// Full (uncompressed) key
    pub key: String,
    /// Value CID
    pub cid: Cid,
}

enum Work {
    Node(Cid),
    Leaf(WalkEntry),
}

/// Iterator over every leaf reachable from an MST root, in key order
///
/// Stops after the first error. Any missing node block is an error.
pub struct MstWalker {
    blocks: Arc<BlockMap>,
    stack: Vec<Work>,
    visited: HashSet<Cid>,
}

impl MstWalker {
    /// Start a walk at `root`
    pub fn new(blocks: Arc<BlockMap>, root: Cid) -> Self {
        Self {
            blocks,
            stack: vec![Work::Node(root)],
            visited: HashSet::new(),
        }
    }

    fn expand(&mut self, cid: Cid) -> Result<()> {
        if !self.visited.insert(cid.clone()) {
            return Err(WalkError::RevisitedNode(cid).into());
        }

        let value = self.blocks.read_object(&cid)?;
        let node = NodeData::from_data(&value)
            .map_err(|e| RepoError::from(e).with_context(format!("node {}", cid)))?;
        let keys = node
            .full_keys()
            .map_err(|e| RepoError::from(e).with_context(format!("node {}", cid)))?;

        self.stack.reserve(node.entries.len() * 2 + 1);
        for (entry, key) in node.entries.into_iter().zip(keys).rev() {
            if let Some(tree) = entry.tree {
                self.stack.push(Work::Node(tree));
            }
            self.stack.push(Work::Leaf(WalkEntry {
                key,
                cid: entry.value,
            }));
        }
        if let Some(left) = node.left {
            self.stack.push(Work::Node(left));
        }
        Ok(())
    }
}

impl Iterator for MstWalker {
    type Item = Result<WalkEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.stack.pop()? {
                Work::Leaf(entry) => return Some(Ok(entry)),
                Work::Node(cid) => {
                    if let Err(e) = self.expand(cid) {
                        self.stack.clear();
                        return Some(Err(e));
                    }
                }
            }
        }
    }
}

impl FusedIterator for MstWalker {}
