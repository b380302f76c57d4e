use crate::indexing::EncodeError;
use crate::types::RecordId;
use crate::value::IndexKey;
use thiserror::Error;

/// Failures reported by a storage engine through the capability traits.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("collection {0} has been dropped")]
    CollectionDropped(String),
    #[error("index {0} has been dropped")]
    IndexDropped(String),
    #[error("corrupt index entry: {0}")]
    CorruptEntry(#[from] EncodeError),
    #[error("lock poisoned: {0}")]
    Poisoned(String),
    #[error("no record ids left in collection {0}")]
    RecordIdsExhausted(String),
    #[error("storage error: {0}")]
    Backend(Box<dyn std::error::Error + Send + Sync + 'static>),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoundsError {
    #[error(transparent)]
    Encoding(#[from] EncodeError),
    #[error("start key {start} sorts after end key {end} in index order")]
    Inverted { start: IndexKey, end: IndexKey },
}

/// Errors from building or driving a plan.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("invalid collection handle: {0}")]
    InvalidCollection(String),
    #[error("index {index} does not belong to collection {collection}")]
    IndexNotFound { collection: String, index: String },
    #[error("start record {0} does not exist")]
    StartRecordNotFound(RecordId),
    #[error("invalid scan bounds: {0}")]
    InvalidBounds(#[from] BoundsError),
    #[error("plan executor over {namespace} is dead: {reason}")]
    Dead { namespace: String, reason: String },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl PlanError {
    pub fn is_dead(&self) -> bool { matches!(self, PlanError::Dead { .. }) }
}
