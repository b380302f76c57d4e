//! Capabilities the planner needs from a storage engine.
//!
//! The planner never touches a concrete engine. A collection handle is anything that can iterate
//! its records by id, iterate its indexes by key, and fetch a document by id.

pub mod memory;

use std::ops::Bound;

use crate::error::StorageError;
use crate::indexing::IndexDescriptor;
use crate::types::{Direction, RecordId};
use crate::value::{Document, IndexKey};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: RecordId,
    pub document: Document,
}

/// One raw index entry as the engine stores it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Encoded key followed by the record id; the order the index iterates in
    pub encoded: Vec<u8>,
    pub key: IndexKey,
    pub record_id: RecordId,
}

/// Raw record iteration in record id order
pub trait RecordCursor: Iterator<Item = Result<Record, StorageError>> + Send {}

/// Raw index iteration in encoded entry order
pub trait IndexCursor: Iterator<Item = Result<IndexEntry, StorageError>> + Send {}

impl<I> RecordCursor for I where I: Iterator<Item = Result<Record, StorageError>> + Send {}
impl<I> IndexCursor for I where I: Iterator<Item = Result<IndexEntry, StorageError>> + Send {}

pub trait RecordSource {
    fn contains(&self, id: RecordId) -> Result<bool, StorageError>;

    /// Cursor over every record in `direction`, starting strictly after (`Forward`) or strictly
    /// before (`Backward`) `after` when given.
    fn record_cursor(&self, direction: Direction, after: Option<RecordId>) -> Result<Box<dyn RecordCursor>, StorageError>;
}

pub trait IndexSource {
    /// The descriptor of the named index, if this collection has it
    fn index(&self, name: &str) -> Result<Option<IndexDescriptor>, StorageError>;

    /// Cursor over the entries of `descriptor`, positioned at `seek` and moving in `direction`.
    /// The cursor does not stop at any end bound; callers check that themselves.
    fn index_cursor(
        &self,
        descriptor: &IndexDescriptor,
        seek: Bound<Vec<u8>>,
        direction: Direction,
    ) -> Result<Box<dyn IndexCursor>, StorageError>;
}

pub trait DocumentFetcher {
    fn fetch(&self, id: RecordId) -> Result<Option<Document>, StorageError>;
}

/// A handle to one collection.
pub trait Collection: RecordSource + IndexSource + DocumentFetcher + Send + Sync {
    fn name(&self) -> &str;

    /// False once the collection has been dropped
    fn is_valid(&self) -> bool;

    /// Whether `descriptor` still names a live index of this collection
    fn has_index(&self, descriptor: &IndexDescriptor) -> Result<bool, StorageError> {
        if descriptor.collection != self.name() {
            return Ok(false);
        }
        Ok(self.index(&descriptor.name)?.as_ref() == Some(descriptor))
    }
}
