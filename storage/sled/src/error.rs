use keel_core::indexing::EncodeError;
use keel_core::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SledError {
    #[error("Storage error: {0}")]
    StorageError(#[from] sled::Error),
    #[error("Bincode error: {0}")]
    BincodeError(#[from] bincode::Error),
    #[error("Encoding error: {0}")]
    EncodeError(#[from] EncodeError),
    #[error("Invalid key length")]
    InvalidKeyLength,
    #[error("Collection {0} has been dropped")]
    CollectionDropped(String),
    #[error("Index {name} already exists on {collection} with a different key pattern")]
    IndexConflict { collection: String, name: String },
    #[error("Lock poisoned: {0}")]
    Poisoned(String),
    #[error("No record ids left in collection {0}")]
    RecordIdsExhausted(String),
    #[error("No index ids left")]
    IndexIdsExhausted,
}

impl From<SledError> for StorageError {
    fn from(err: SledError) -> Self {
        match err {
            SledError::CollectionDropped(name) => StorageError::CollectionDropped(name),
            SledError::EncodeError(e) => StorageError::CorruptEntry(e),
            SledError::Poisoned(msg) => StorageError::Poisoned(msg),
            SledError::RecordIdsExhausted(name) => StorageError::RecordIdsExhausted(name),
            other => StorageError::Backend(Box::new(other)),
        }
    }
}

pub(crate) fn sled_error(err: sled::Error) -> StorageError { SledError::StorageError(err).into() }

pub(crate) fn poisoned<T>(err: std::sync::PoisonError<T>) -> SledError { SledError::Poisoned(err.to_string()) }
