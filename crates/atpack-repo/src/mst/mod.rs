//! Merkle Search Tree structures and traversal
//!
//! Only reading is supported: the walker reconstructs full keys from the
//! prefix-compressed wire form and yields them in key order.

pub mod node;
pub mod walk;

pub use node::{NodeData, TreeEntry};
pub use walk::{MstWalker, WalkEntry};
