use std::ops::Bound;

use keel_core::storage::Record;
use keel_core::{Direction, RecordId, StorageError};

use crate::collection::CursorGuard;
use crate::error::{sled_error, SledError};

pub(crate) enum SledIter {
    Forward(sled::Iter),
    Reverse(std::iter::Rev<sled::Iter>),
}

impl SledIter {
    /// Iterate `tree` from `seek` onward in `direction`; backward walks down from `seek`
    pub fn seek(tree: &sled::Tree, seek: Bound<Vec<u8>>, direction: Direction) -> Self {
        match direction {
            Direction::Forward => SledIter::Forward(tree.range::<Vec<u8>, _>((seek, Bound::Unbounded))),
            Direction::Backward => SledIter::Reverse(tree.range::<Vec<u8>, _>((Bound::Unbounded, seek)).rev()),
        }
    }
}

impl Iterator for SledIter {
    type Item = Result<(sled::IVec, sled::IVec), sled::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            SledIter::Forward(iter) => iter.next(),
            SledIter::Reverse(iter) => iter.next(),
        }
    }
}

/// Cursor over a collection tree keyed by big-endian record id
pub struct SledRecordCursor {
    iter: SledIter,
    done: bool,
    guard: CursorGuard,
}

impl SledRecordCursor {
    pub(crate) fn new(tree: &sled::Tree, direction: Direction, after: Option<RecordId>, guard: CursorGuard) -> Self {
        let seek = after.map_or(Bound::Unbounded, |id| Bound::Excluded(id.to_bytes().to_vec()));
        Self { iter: SledIter::seek(tree, seek, direction), done: false, guard }
    }
}

impl Iterator for SledRecordCursor {
    type Item = Result<Record, StorageError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if !self.guard.is_valid() {
            self.done = true;
            return Some(Err(StorageError::CollectionDropped(self.guard.collection().to_owned())));
        }

        let item = match self.iter.next() {
            None => {
                self.done = true;
                return None;
            }
            Some(Err(e)) => {
                self.done = true;
                return Some(Err(sled_error(e)));
            }
            Some(Ok(kv)) => kv,
        };
        Some(decode_record(&item.0, &item.1).map_err(|e| {
            self.done = true;
            StorageError::from(e)
        }))
    }
}

pub(crate) fn decode_record(key: &[u8], value: &[u8]) -> Result<Record, SledError> {
    let id = RecordId::from_bytes(key.try_into().map_err(|_| SledError::InvalidKeyLength)?);
    Ok(Record { id, document: bincode::deserialize(value)? })
}
