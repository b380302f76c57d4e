use super::{PlanStage, ScanResult, StageState};
use crate::bounds::KeyRange;
use crate::error::StorageError;
use crate::storage::IndexCursor;

/// Walks index entries from the range's seek position until the end bound, yielding
/// (key, record id) pairs.
pub struct IndexScanStage {
    cursor: Box<dyn IndexCursor>,
    range: KeyRange,
    eof: bool,
}

impl IndexScanStage {
    /// `cursor` must already be positioned at `range.seek` and move in `range.direction`
    pub fn new(cursor: Box<dyn IndexCursor>, range: KeyRange) -> Self { Self { cursor, range, eof: false } }
}

impl PlanStage for IndexScanStage {
    fn work(&mut self) -> Result<StageState, StorageError> {
        if self.eof {
            return Ok(StageState::IsEof);
        }
        match self.cursor.next() {
            Some(Ok(entry)) => {
                // Cursors do not know where to stop; the bounds are ours to enforce
                if !self.range.contains(&entry.encoded) {
                    self.eof = true;
                    return Ok(StageState::IsEof);
                }
                Ok(StageState::Advanced(ScanResult { record_id: entry.record_id, key: Some(entry.key), document: None }))
            }
            Some(Err(e)) => Err(e),
            None => {
                self.eof = true;
                Ok(StageState::IsEof)
            }
        }
    }

    fn is_eof(&self) -> bool { self.eof }
}
