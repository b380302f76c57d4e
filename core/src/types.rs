use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, totally ordered handle to one stored record within a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(u64);

impl RecordId {
    pub const fn new(id: u64) -> Self { Self(id) }
    pub const fn as_u64(&self) -> u64 { self.0 }

    /// Big-endian bytes, so byte order matches numeric order in ordered key-value stores
    pub fn to_bytes(&self) -> [u8; 8] { self.0.to_be_bytes() }
    pub fn from_bytes(bytes: [u8; 8]) -> Self { Self(u64::from_be_bytes(bytes)) }
}

impl From<u64> for RecordId {
    fn from(id: u64) -> Self { Self(id) }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "RecordId({})", self.0) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

/// What an index scan hands back per entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexScanOptions {
    /// The key and the record id of the indexed record. The caller fetches if it needs to.
    #[default]
    Default,
    /// The key, the record id and the fetched document.
    Fetch,
}
