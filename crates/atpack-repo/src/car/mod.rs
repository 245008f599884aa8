//! CAR (Content Addressable aRchive) file I/O
//!
//! A CARv1 archive is a varint-prefixed DAG-CBOR header `{version: 1, roots}`
//! followed by frames of `varint(len) ++ cid ++ block`. There is no index or
//! trailer, so reading is a single forward pass.
//!
//! # Examples
//!
//! Reading a CAR file:
//! ```no_run
//! # async fn example() -> atpack_repo::Result<()> {
//! use atpack_repo::car::read_car_file;
//!
//! let reader = read_car_file("repo.car").await?;
//! println!("roots: {:?}", reader.roots());
//! for block in reader.blocks() {
//!     let block = block?;
//!     println!("{} ({} bytes)", block.cid, block.data.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Writing a CAR file:
//! ```no_run
//! # async fn example() -> atpack_repo::Result<()> {
//! use atpack_common::Cid;
//! use atpack_repo::car::write_car_file;
//!
//! let block = b"hello".to_vec();
//! let cid = Cid::create_raw(&block);
//! write_car_file("out.car", &[cid.clone()], [(cid, block)]).await?;
//! # Ok(())
//! # }
//! ```

pub mod reader;
pub mod writer;

pub use reader::{CarBlock, CarBlocks, CarReader, read_car_file};
pub use writer::{write_car_bytes, write_car_file};
