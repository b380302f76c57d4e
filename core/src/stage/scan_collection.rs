use super::{PlanStage, ScanResult, StageState};
use crate::error::StorageError;
use crate::storage::RecordCursor;

/// Walks every record of a collection, yielding the record id and document.
pub struct CollectionScanStage {
    cursor: Box<dyn RecordCursor>,
    eof: bool,
}

impl CollectionScanStage {
    pub fn new(cursor: Box<dyn RecordCursor>) -> Self { Self { cursor, eof: false } }
}

impl PlanStage for CollectionScanStage {
    fn work(&mut self) -> Result<StageState, StorageError> {
        if self.eof {
            return Ok(StageState::IsEof);
        }
        match self.cursor.next() {
            Some(Ok(record)) => Ok(StageState::Advanced(ScanResult { record_id: record.id, key: None, document: Some(record.document) })),
            Some(Err(e)) => Err(e),
            None => {
                self.eof = true;
                Ok(StageState::IsEof)
            }
        }
    }

    fn is_eof(&self) -> bool { self.eof }
}
