//! Core codecs for AT Protocol repository data
//!
//! This crate provides the leaf building blocks used to read and write
//! AT Protocol repositories:
//!
//! - **Varint**: unsigned LEB128 integers used in multiformat prefixes and CAR framing
//! - **Base32**: unpadded lowercase RFC4648 base32, used for CID strings
//! - **CID**: content identifiers over SHA-256 multihashes
//! - **DAG-CBOR**: a canonical, deterministic CBOR profile for content-addressed data
//! - **Data**: the decoded value tree, with `$link` / `$bytes` JSON interchange
//!
//! # Example
//!
//! ```
//! use atpack_common::{cbor, Cid, Data, Object};
//!
//! let mut record = Object::new();
//! record.insert("$type".into(), Data::from("app.bsky.feed.post"));
//! record.insert("text".into(), Data::from("hello world!"));
//!
//! let bytes = cbor::encode(&Data::Object(record)).unwrap();
//! let cid = Cid::create_dag_cbor(&bytes);
//! assert!(cid.to_string().starts_with("bafyrei"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod base32;
pub mod cbor;
pub mod cid;
pub mod error;
pub mod value;
pub mod varint;

pub use bytes;
pub use smol_str;

pub use cid::{Cid, Multihash};
pub use error::ErrorKind;
pub use value::{Array, Data, Object};
