use std::sync::Arc;

use tracing::debug;

use super::{PlanStage, StageState};
use crate::error::StorageError;
use crate::storage::Collection;

/// Dereferences each record id produced by its child into the stored document.
///
/// A record that has vanished between the index read and the fetch is reported as
/// [`StageState::RecordMissing`] rather than advanced with an empty document.
pub struct FetchStage<S> {
    child: S,
    collection: Arc<dyn Collection>,
}

impl<S: PlanStage> FetchStage<S> {
    pub fn new(child: S, collection: Arc<dyn Collection>) -> Self { Self { child, collection } }
}

impl<S: PlanStage> PlanStage for FetchStage<S> {
    fn work(&mut self) -> Result<StageState, StorageError> {
        match self.child.work()? {
            StageState::Advanced(mut member) => match self.collection.fetch(member.record_id)? {
                Some(document) => {
                    member.document = Some(document);
                    Ok(StageState::Advanced(member))
                }
                None => {
                    debug!(ns = %self.collection.name(), record_id = %member.record_id, "fetch found no record");
                    Ok(StageState::RecordMissing(member))
                }
            },
            other => Ok(other),
        }
    }

    fn is_eof(&self) -> bool { self.child.is_eof() }
}
