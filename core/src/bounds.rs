use std::ops::Bound;

use crate::error::BoundsError;
use crate::indexing::{encode_key, KeyPattern, RECORD_ID_LEN};
use crate::types::Direction;
use crate::value::IndexKey;

/// Caller-facing bounds of an index scan, in index key order. The start key is always inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanBounds {
    pub start_key: IndexKey,
    pub end_key: IndexKey,
    pub end_key_inclusive: bool,
}

impl ScanBounds {
    pub fn new(start_key: IndexKey, end_key: IndexKey, end_key_inclusive: bool) -> Self { Self { start_key, end_key, end_key_inclusive } }

    /// Lower the logical bounds onto encoded index entries for a scan in `direction`.
    ///
    /// Backward scans begin at the end key and finish at the start key, so the seek position
    /// and the stopping bound swap roles along with their inclusivity.
    pub fn normalize(&self, pattern: &KeyPattern, direction: Direction) -> Result<KeyRange, BoundsError> {
        let low = encode_key(&self.start_key, pattern)?;
        let high = encode_key(&self.end_key, pattern)?;
        if low > high {
            return Err(BoundsError::Inverted { start: self.start_key.clone(), end: self.end_key.clone() });
        }

        // Entries are key ++ record id: every entry for `low` is >= low, and every entry for
        // `high` is <= high ++ [0xFF; 8]
        let lower = Bound::Included(low);
        let upper = if self.end_key_inclusive {
            let mut last = high;
            last.extend_from_slice(&[0xFF; RECORD_ID_LEN]);
            Bound::Included(last)
        } else {
            Bound::Excluded(high)
        };

        Ok(match direction {
            Direction::Forward => KeyRange { seek: lower, end: upper, direction },
            Direction::Backward => KeyRange { seek: upper, end: lower, direction },
        })
    }
}

/// Bounds over encoded index entries, in iteration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRange {
    /// Where the index cursor is positioned before the first entry
    pub seek: Bound<Vec<u8>>,
    /// Bound at which iteration stops
    pub end: Bound<Vec<u8>>,
    pub direction: Direction,
}

impl KeyRange {
    /// Whether `entry` has not yet run past the end bound in iteration order
    pub fn before_end(&self, entry: &[u8]) -> bool {
        match (&self.end, self.direction) {
            (Bound::Unbounded, _) => true,
            (Bound::Included(end), Direction::Forward) => entry <= end.as_slice(),
            (Bound::Excluded(end), Direction::Forward) => entry < end.as_slice(),
            (Bound::Included(end), Direction::Backward) => entry >= end.as_slice(),
            (Bound::Excluded(end), Direction::Backward) => entry > end.as_slice(),
        }
    }

    /// Whether `entry` lies between the seek position and the end bound
    pub fn contains(&self, entry: &[u8]) -> bool {
        let past_seek = match (&self.seek, self.direction) {
            (Bound::Unbounded, _) => true,
            (Bound::Included(seek), Direction::Forward) => entry >= seek.as_slice(),
            (Bound::Excluded(seek), Direction::Forward) => entry > seek.as_slice(),
            (Bound::Included(seek), Direction::Backward) => entry <= seek.as_slice(),
            (Bound::Excluded(seek), Direction::Backward) => entry < seek.as_slice(),
        };
        past_seek && self.before_end(entry)
    }
}
