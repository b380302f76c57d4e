use std::ops::Bound;

use keel_core::indexing::decode_record_id;
use keel_core::storage::IndexEntry;
use keel_core::{Direction, IndexKey, StorageError};

use crate::collection::CursorGuard;
use crate::error::{sled_error, SledError};
use crate::index::Index;
use crate::scan_collection::SledIter;

/// Cursor over a sled index tree. Entries are the encoded key plus record id; the value is the bincode key.
pub struct SledIndexCursor {
    index: Index,
    iter: SledIter,
    done: bool,
    guard: CursorGuard,
}

impl SledIndexCursor {
    pub(crate) fn new(index: Index, seek: Bound<Vec<u8>>, direction: Direction, guard: CursorGuard) -> Self {
        let iter = SledIter::seek(index.tree(), seek, direction);
        Self { index, iter, done: false, guard }
    }
}

impl Iterator for SledIndexCursor {
    type Item = Result<IndexEntry, StorageError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if !self.guard.is_valid() {
            self.done = true;
            return Some(Err(StorageError::CollectionDropped(self.guard.collection().to_owned())));
        }
        if !self.index.is_valid() {
            self.done = true;
            return Some(Err(StorageError::IndexDropped(self.index.name().to_owned())));
        }

        let (entry, value) = match self.iter.next()? {
            Ok(kv) => kv,
            Err(e) => {
                self.done = true;
                return Some(Err(sled_error(e)));
            }
        };
        let decoded = decode_entry(&entry, &value);
        if decoded.is_err() {
            self.done = true;
        }
        Some(decoded.map_err(StorageError::from))
    }
}

fn decode_entry(entry: &[u8], value: &[u8]) -> Result<IndexEntry, SledError> {
    let record_id = decode_record_id(entry)?;
    let key: IndexKey = bincode::deserialize(value)?;
    Ok(IndexEntry { encoded: entry.to_vec(), key, record_id })
}
