use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::error::PlanError;
use crate::indexing::IndexDescriptor;
use crate::stage::{PlanStage, ScanResult, StageChain, StageState};
use crate::storage::Collection;
use crate::types::{Direction, RecordId};
use crate::value::IndexKey;

pub use crate::stage::PlanKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutorState {
    /// Built, not yet asked for a result
    Created,
    Advancing,
    /// The chain has run out; further calls return [`ExecState::Eof`] until the collection or index is dropped
    Exhausted,
    /// The collection or index went away, or storage failed; further calls error
    Dead,
}

/// Outcome of one [`PlanExecutor::get_next`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecState {
    Advanced(ScanResult),
    /// A fetched index scan found no record behind an index entry (e.g. deleted concurrently).
    /// Iteration may continue; whether to retry, skip or surface it is the caller's call.
    RecordMissing { record_id: RecordId, key: Option<IndexKey> },
    Eof,
}

/// Owns a stage chain and drives it on behalf of a caller.
///
/// The collection, index and direction are fixed at construction. Dropping the executor at any
/// point releases the chain and every cursor under it.
pub struct PlanExecutor {
    namespace: String,
    collection: Option<Arc<dyn Collection>>,
    index: Option<IndexDescriptor>,
    direction: Direction,
    root: StageChain,
    state: ExecutorState,
    dead_reason: Option<String>,
    last_record_id: Option<RecordId>,
}

impl PlanExecutor {
    pub(crate) fn new(
        namespace: String,
        collection: Option<Arc<dyn Collection>>,
        index: Option<IndexDescriptor>,
        direction: Direction,
        root: StageChain,
    ) -> Self {
        Self { namespace, collection, index, direction, root, state: ExecutorState::Created, dead_reason: None, last_record_id: None }
    }

    pub fn get_next(&mut self) -> Result<ExecState, PlanError> {
        if self.state == ExecutorState::Dead {
            return Err(self.dead_error());
        }
        // Checked in every live state, exhausted included
        if let Some(reason) = self.invalidation() {
            return Err(self.die(reason));
        }
        match self.state {
            ExecutorState::Exhausted => return Ok(ExecState::Eof),
            ExecutorState::Created => self.state = ExecutorState::Advancing,
            ExecutorState::Advancing | ExecutorState::Dead => {}
        }

        match self.root.work() {
            Ok(StageState::Advanced(result)) => {
                trace!(ns = %self.namespace, record_id = %result.record_id, "advanced");
                self.last_record_id = Some(result.record_id);
                Ok(ExecState::Advanced(result))
            }
            Ok(StageState::RecordMissing(result)) => {
                self.last_record_id = Some(result.record_id);
                Ok(ExecState::RecordMissing { record_id: result.record_id, key: result.key })
            }
            Ok(StageState::IsEof) => {
                debug!(ns = %self.namespace, kind = ?self.root.kind(), "plan exhausted");
                self.state = ExecutorState::Exhausted;
                Ok(ExecState::Eof)
            }
            Err(e) => Err(self.die(e.to_string())),
        }
    }

    pub fn state(&self) -> ExecutorState { self.state }
    pub fn is_eof(&self) -> bool { self.state == ExecutorState::Exhausted }
    pub fn kind(&self) -> PlanKind { self.root.kind() }
    pub fn namespace(&self) -> &str { &self.namespace }
    pub fn direction(&self) -> Direction { self.direction }
    pub fn index(&self) -> Option<&IndexDescriptor> { self.index.as_ref() }

    /// Record id of the most recent result. Passing it back to a collection scan builder
    /// resumes strictly after it.
    pub fn last_record_id(&self) -> Option<RecordId> { self.last_record_id }

    /// Why the collection or index under this plan can no longer be read, if it can't
    fn invalidation(&self) -> Option<String> {
        let collection = self.collection.as_ref()?;
        if !collection.is_valid() {
            return Some(format!("collection {} dropped", collection.name()));
        }
        let index = self.index.as_ref()?;
        match collection.has_index(index) {
            Ok(true) => None,
            Ok(false) => Some(format!("index {} dropped", index.name)),
            Err(e) => Some(e.to_string()),
        }
    }

    fn die(&mut self, reason: String) -> PlanError {
        warn!(ns = %self.namespace, %reason, "plan executor killed");
        self.state = ExecutorState::Dead;
        self.dead_reason = Some(reason);
        self.dead_error()
    }

    fn dead_error(&self) -> PlanError {
        PlanError::Dead { namespace: self.namespace.clone(), reason: self.dead_reason.clone().unwrap_or_default() }
    }
}

impl std::fmt::Debug for PlanExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanExecutor")
            .field("namespace", &self.namespace)
            .field("kind", &self.root.kind())
            .field("index", &self.index.as_ref().map(|i| &i.name))
            .field("direction", &self.direction)
            .field("state", &self.state)
            .finish()
    }
}
