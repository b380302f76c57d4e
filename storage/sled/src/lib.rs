//! Sled-backed collections for keel.
//!
//! Each collection lives in a `collection_{name}` tree keyed by big-endian record id. Index
//! definitions are persisted in `index_config` and each index keeps its entries in an
//! `index_{id}` tree, so indexes survive a reopen.

pub mod collection;
pub mod database;
pub mod engine;
pub mod error;
pub mod index;
pub mod scan_collection;
pub mod scan_index;

pub use collection::SledCollection;
pub use engine::SledStorageEngine;
pub use error::SledError;
