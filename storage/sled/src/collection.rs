use std::ops::Bound;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use keel_core::storage::{Collection, DocumentFetcher, IndexCursor, IndexSource, RecordCursor, RecordSource};
use keel_core::{Direction, Document, IndexDescriptor, KeyPattern, RecordId, StorageError};
use tracing::debug;

use crate::database::Database;
use crate::error::{poisoned, sled_error, SledError};
use crate::index::Index;
use crate::scan_collection::SledRecordCursor;
use crate::scan_index::SledIndexCursor;

/// A handle to one collection, stored in the `collection_{name}` tree.
///
/// Records are keyed by big-endian record id so the tree iterates in record id order. Every
/// handle the engine hands out for the same name shares one validity flag, so dropping the
/// collection is seen by all of them.
pub struct SledCollection {
    name: String,
    database: Arc<Database>,
    tree: sled::Tree,
    state: Arc<CollectionState>,
}

pub(crate) struct CollectionState {
    name: String,
    valid: AtomicBool,
    open_cursors: AtomicUsize,
    write_lock: Mutex<()>,
}

impl CollectionState {
    pub(crate) fn new(name: &str) -> Self {
        Self { name: name.to_owned(), valid: AtomicBool::new(true), open_cursors: AtomicUsize::new(0), write_lock: Mutex::new(()) }
    }
}

/// Counts a live cursor against its collection for as long as it exists
pub(crate) struct CursorGuard(Arc<CollectionState>);

impl CursorGuard {
    fn new(state: &Arc<CollectionState>) -> Self {
        state.open_cursors.fetch_add(1, Ordering::SeqCst);
        Self(state.clone())
    }

    pub fn is_valid(&self) -> bool { self.0.valid.load(Ordering::SeqCst) }
    pub fn collection(&self) -> &str { &self.0.name }
}

impl Drop for CursorGuard {
    fn drop(&mut self) { self.0.open_cursors.fetch_sub(1, Ordering::SeqCst); }
}

impl SledCollection {
    pub(crate) fn new(name: &str, database: Arc<Database>, tree: sled::Tree, state: Arc<CollectionState>) -> Self {
        Self { name: name.to_owned(), database, tree, state }
    }

    /// Insert under the id after the highest one stored
    pub fn insert(&self, doc: Document) -> Result<RecordId, SledError> {
        let _guard = self.state.write_lock.lock().map_err(poisoned)?;
        self.check_valid()?;
        let next = match self.tree.last()? {
            Some((k, _)) => RecordId::from_bytes(k.as_ref().try_into().map_err(|_| SledError::InvalidKeyLength)?)
                .as_u64()
                .checked_add(1)
                .ok_or_else(|| SledError::RecordIdsExhausted(self.name.clone()))?,
            None => 1,
        };
        let id = RecordId::new(next);
        self.write(id, doc)?;
        Ok(id)
    }

    /// Insert or replace the record at `id`, keeping every index in step
    pub fn insert_with_id(&self, id: RecordId, doc: Document) -> Result<(), SledError> {
        let _guard = self.state.write_lock.lock().map_err(poisoned)?;
        self.check_valid()?;
        self.write(id, doc)
    }

    pub fn remove(&self, id: RecordId) -> Result<Option<Document>, SledError> {
        let _guard = self.state.write_lock.lock().map_err(poisoned)?;
        self.check_valid()?;
        let Some(old) = self.tree.remove(id.to_bytes())? else { return Ok(None) };
        let old: Document = bincode::deserialize(&old)?;
        for index in self.database.index_manager.for_collection(&self.name)? {
            index.update(id, Some(&old), None)?;
        }
        Ok(Some(old))
    }

    fn write(&self, id: RecordId, doc: Document) -> Result<(), SledError> {
        let bytes = bincode::serialize(&doc)?;
        let old = match self.tree.insert(id.to_bytes(), bytes)? {
            Some(old) => Some(bincode::deserialize::<Document>(&old)?),
            None => None,
        };
        for index in self.database.index_manager.for_collection(&self.name)? {
            index.update(id, old.as_ref(), Some(&doc))?;
        }
        Ok(())
    }

    /// Create an index named after its pattern and backfill it from the existing records
    pub fn create_index(&self, pattern: KeyPattern) -> Result<IndexDescriptor, SledError> {
        self.create_index_named(pattern.name_with("", "__"), pattern)
    }

    pub fn create_index_named<S: Into<String>>(&self, name: S, pattern: KeyPattern) -> Result<IndexDescriptor, SledError> {
        let name = name.into();
        let _guard = self.state.write_lock.lock().map_err(poisoned)?;
        self.check_valid()?;
        if let Some(existing) = self.database.index_manager.find(&self.name, &name)? {
            if *existing.pattern() == pattern {
                return Ok(existing.descriptor().clone());
            }
            return Err(SledError::IndexConflict { collection: self.name.clone(), name });
        }

        let index = self.database.index_manager.create(&self.database.db, &self.name, name, pattern)?;
        let count = index.backfill(&self.tree)?;
        debug!(collection = %self.name, index = %index.name(), id = index.id(), entries = count, "created index");
        Ok(index.descriptor().clone())
    }

    /// Remove the named index. Open cursors over it fail on their next step.
    pub fn drop_index(&self, name: &str) -> Result<bool, SledError> {
        let _guard = self.state.write_lock.lock().map_err(poisoned)?;
        match self.database.index_manager.find(&self.name, name)? {
            Some(index) => {
                self.database.index_manager.remove(&self.database.db, &index)?;
                debug!(collection = %self.name, index = %name, "dropped index");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Descriptors of every index on this collection, in creation order
    pub fn indexes(&self) -> Result<Vec<IndexDescriptor>, SledError> {
        Ok(self.database.index_manager.for_collection(&self.name)?.iter().map(|idx| idx.descriptor().clone()).collect())
    }

    /// Number of record and index cursors currently alive
    pub fn open_cursors(&self) -> usize { self.state.open_cursors.load(Ordering::SeqCst) }

    pub fn len(&self) -> usize { self.tree.len() }
    pub fn is_empty(&self) -> bool { self.tree.is_empty() }

    /// Mark the collection dropped and remove its indexes. The engine drops the tree itself.
    pub(crate) fn invalidate(&self) -> Result<(), SledError> {
        let _guard = self.state.write_lock.lock().map_err(poisoned)?;
        self.state.valid.store(false, Ordering::SeqCst);
        for index in self.database.index_manager.for_collection(&self.name)? {
            self.database.index_manager.remove(&self.database.db, &index)?;
        }
        Ok(())
    }

    fn check_valid(&self) -> Result<(), SledError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(SledError::CollectionDropped(self.name.clone()))
        }
    }

    fn live_index(&self, descriptor: &IndexDescriptor) -> Result<Option<Index>, SledError> {
        Ok(self.database.index_manager.find(&self.name, &descriptor.name)?.filter(|index| index.descriptor() == descriptor))
    }
}

impl RecordSource for SledCollection {
    fn contains(&self, id: RecordId) -> Result<bool, StorageError> {
        self.check_valid()?;
        self.tree.contains_key(id.to_bytes()).map_err(sled_error)
    }

    fn record_cursor(&self, direction: Direction, after: Option<RecordId>) -> Result<Box<dyn RecordCursor>, StorageError> {
        self.check_valid()?;
        Ok(Box::new(SledRecordCursor::new(&self.tree, direction, after, CursorGuard::new(&self.state))))
    }
}

impl IndexSource for SledCollection {
    fn index(&self, name: &str) -> Result<Option<IndexDescriptor>, StorageError> {
        if !self.is_valid() {
            return Ok(None);
        }
        Ok(self.database.index_manager.find(&self.name, name)?.map(|index| index.descriptor().clone()))
    }

    fn index_cursor(
        &self,
        descriptor: &IndexDescriptor,
        seek: Bound<Vec<u8>>,
        direction: Direction,
    ) -> Result<Box<dyn IndexCursor>, StorageError> {
        self.check_valid()?;
        let index = self.live_index(descriptor)?.ok_or_else(|| StorageError::IndexDropped(descriptor.name.clone()))?;
        Ok(Box::new(SledIndexCursor::new(index, seek, direction, CursorGuard::new(&self.state))))
    }
}

impl DocumentFetcher for SledCollection {
    fn fetch(&self, id: RecordId) -> Result<Option<Document>, StorageError> {
        self.check_valid()?;
        match self.tree.get(id.to_bytes()).map_err(sled_error)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes).map_err(SledError::from)?)),
            None => Ok(None),
        }
    }
}

impl Collection for SledCollection {
    fn name(&self) -> &str { &self.name }
    fn is_valid(&self) -> bool { self.state.valid.load(Ordering::SeqCst) }
}
