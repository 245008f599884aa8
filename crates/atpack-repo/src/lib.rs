//! AT Protocol repository archives
//!
//! This crate reads and writes whole AT Protocol repositories as CAR files:
//!
//! - **CAR I/O**: parse CARv1 archives into zero-copy blocks, and write them back out
//! - **Block map**: CID-addressed block storage built from an archive
//! - **Commits**: the signed root object of a repository (versions 2 and 3)
//! - **MST**: the Merkle Search Tree wire format and an iterative in-order walker
//! - **Repository iteration**: one entry per record, with lazily decoded contents
//!
//! Everything works over in-memory buffers. The async helpers only read or
//! write whole files.
//!
//! # Example
//!
//! ```no_run
//! # async fn example() -> atpack_repo::Result<()> {
//! use atpack_repo::open_repo_file;
//!
//! let entries = open_repo_file("repo.car").await?;
//! println!("repository of {}", entries.commit().did);
//! for entry in entries {
//!     let entry = entry?;
//!     println!("{}/{} {}", entry.collection(), entry.rkey(), entry.cid());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

/// In-memory block storage
pub mod blocks;
/// CAR (Content Addressable aRchive) utilities
pub mod car;
/// Commit structures
pub mod commit;
pub mod error;
/// Merkle Search Tree wire format and traversal
pub mod mst;
/// Whole-repository iteration
pub mod repo;

pub use blocks::BlockMap;
pub use car::{CarBlock, CarReader};
pub use commit::Commit;
pub use error::{CarError, RepoError, RepoErrorKind, Result, WalkError};
pub use repo::{RepoEntries, RepoEntry, iterate_atp_repo, open_repo_file};
