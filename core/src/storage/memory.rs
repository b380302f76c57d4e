//! In-memory collection with secondary indexes.
//!
//! Cursors are live: each step re-reads the map from the last position, so records inserted or
//! removed during a scan are observed the way an ordered storage engine would show them.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use super::{Collection, DocumentFetcher, IndexCursor, IndexEntry, IndexSource, Record, RecordCursor, RecordSource};
use crate::error::StorageError;
use crate::indexing::{decode_record_id, encode_entry, IndexDescriptor, KeyPattern};
use crate::types::{Direction, RecordId};
use crate::value::{Document, IndexKey};

pub struct MemoryCollection {
    name: String,
    inner: Arc<Inner>,
}

struct Inner {
    records: RwLock<BTreeMap<RecordId, Document>>,
    indexes: RwLock<BTreeMap<String, Arc<MemoryIndex>>>,
    valid: AtomicBool,
    open_cursors: AtomicUsize,
    /// Highest record id handed out or inserted; ids start at 1
    last_id: AtomicU64,
}

struct MemoryIndex {
    descriptor: IndexDescriptor,
    entries: RwLock<BTreeMap<Vec<u8>, IndexKey>>,
    valid: AtomicBool,
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>, StorageError> {
    lock.read().map_err(|e| StorageError::Poisoned(e.to_string()))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>, StorageError> {
    lock.write().map_err(|e| StorageError::Poisoned(e.to_string()))
}

impl MemoryCollection {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            inner: Arc::new(Inner {
                records: RwLock::new(BTreeMap::new()),
                indexes: RwLock::new(BTreeMap::new()),
                valid: AtomicBool::new(true),
                open_cursors: AtomicUsize::new(0),
                last_id: AtomicU64::new(0),
            }),
        }
    }

    /// Insert under the next free record id
    pub fn insert(&self, doc: Document) -> Result<RecordId, StorageError> {
        let last = self
            .inner
            .last_id
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |last| last.checked_add(1))
            .map_err(|_| StorageError::RecordIdsExhausted(self.name.clone()))?;
        let id = RecordId::new(last + 1);
        self.insert_with_id(id, doc)?;
        Ok(id)
    }

    /// Insert or replace the record at `id`, keeping every index in step
    pub fn insert_with_id(&self, id: RecordId, doc: Document) -> Result<(), StorageError> {
        self.check_valid()?;
        let mut records = write(&self.inner.records)?;
        let indexes = read(&self.inner.indexes)?;
        if let Some(old) = records.get(&id) {
            for index in indexes.values() {
                index.remove(id, old)?;
            }
        }
        for index in indexes.values() {
            index.insert(id, &doc)?;
        }
        records.insert(id, doc);
        self.inner.last_id.fetch_max(id.as_u64(), Ordering::Relaxed);
        Ok(())
    }

    pub fn remove(&self, id: RecordId) -> Result<Option<Document>, StorageError> {
        self.check_valid()?;
        let mut records = write(&self.inner.records)?;
        let Some(old) = records.remove(&id) else { return Ok(None) };
        for index in read(&self.inner.indexes)?.values() {
            index.remove(id, &old)?;
        }
        Ok(Some(old))
    }

    /// Create an index named after its pattern and backfill it from the existing records
    pub fn create_index(&self, pattern: KeyPattern) -> Result<IndexDescriptor, StorageError> {
        self.create_index_named(pattern.name_with("", "__"), pattern)
    }

    pub fn create_index_named<S: Into<String>>(&self, name: S, pattern: KeyPattern) -> Result<IndexDescriptor, StorageError> {
        self.check_valid()?;
        let descriptor = IndexDescriptor::new(name, self.name.clone(), pattern);
        let records = read(&self.inner.records)?;
        let mut indexes = write(&self.inner.indexes)?;
        if let Some(existing) = indexes.get(&descriptor.name) {
            if existing.descriptor == descriptor {
                return Ok(descriptor);
            }
            return Err(StorageError::Backend(format!("index {} exists with a different key pattern", descriptor.name).into()));
        }

        let index = MemoryIndex { descriptor: descriptor.clone(), entries: RwLock::new(BTreeMap::new()), valid: AtomicBool::new(true) };
        for (id, doc) in records.iter() {
            index.insert(*id, doc)?;
        }
        debug!(collection = %self.name, index = %descriptor.name, entries = records.len(), "created index");
        indexes.insert(descriptor.name.clone(), Arc::new(index));
        Ok(descriptor)
    }

    pub fn drop_index(&self, name: &str) -> Result<bool, StorageError> {
        match write(&self.inner.indexes)?.remove(name) {
            Some(index) => {
                index.valid.store(false, Ordering::SeqCst);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Invalidate this collection. Every open handle and cursor observes the drop.
    pub fn drop_collection(&self) -> Result<(), StorageError> {
        self.inner.valid.store(false, Ordering::SeqCst);
        for index in write(&self.inner.indexes)?.values() {
            index.valid.store(false, Ordering::SeqCst);
        }
        write(&self.inner.records)?.clear();
        Ok(())
    }

    /// Number of record and index cursors currently alive
    pub fn open_cursors(&self) -> usize { self.inner.open_cursors.load(Ordering::SeqCst) }

    pub fn len(&self) -> Result<usize, StorageError> { Ok(read(&self.inner.records)?.len()) }
    pub fn is_empty(&self) -> Result<bool, StorageError> { Ok(self.len()? == 0) }

    fn check_valid(&self) -> Result<(), StorageError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(StorageError::CollectionDropped(self.name.clone()))
        }
    }
}

impl MemoryIndex {
    fn insert(&self, id: RecordId, doc: &Document) -> Result<(), StorageError> {
        let key = self.descriptor.pattern.extract_key(doc);
        let entry = encode_entry(&key, id, &self.descriptor.pattern)?;
        write(&self.entries)?.insert(entry, key);
        Ok(())
    }

    fn remove(&self, id: RecordId, doc: &Document) -> Result<(), StorageError> {
        let key = self.descriptor.pattern.extract_key(doc);
        let entry = encode_entry(&key, id, &self.descriptor.pattern)?;
        write(&self.entries)?.remove(&entry);
        Ok(())
    }
}

impl RecordSource for MemoryCollection {
    fn contains(&self, id: RecordId) -> Result<bool, StorageError> {
        self.check_valid()?;
        Ok(read(&self.inner.records)?.contains_key(&id))
    }

    fn record_cursor(&self, direction: Direction, after: Option<RecordId>) -> Result<Box<dyn RecordCursor>, StorageError> {
        self.check_valid()?;
        Ok(Box::new(MemoryRecordCursor {
            collection: self.name.clone(),
            direction,
            position: after.map_or(Bound::Unbounded, Bound::Excluded),
            done: false,
            guard: CursorGuard::new(&self.inner),
        }))
    }
}

impl IndexSource for MemoryCollection {
    fn index(&self, name: &str) -> Result<Option<IndexDescriptor>, StorageError> {
        Ok(read(&self.inner.indexes)?.get(name).map(|index| index.descriptor.clone()))
    }

    fn index_cursor(
        &self,
        descriptor: &IndexDescriptor,
        seek: Bound<Vec<u8>>,
        direction: Direction,
    ) -> Result<Box<dyn IndexCursor>, StorageError> {
        self.check_valid()?;
        let index = read(&self.inner.indexes)?
            .get(&descriptor.name)
            .filter(|index| index.descriptor == *descriptor)
            .cloned()
            .ok_or_else(|| StorageError::IndexDropped(descriptor.name.clone()))?;
        Ok(Box::new(MemoryIndexCursor { index, direction, position: seek, done: false, guard: CursorGuard::new(&self.inner) }))
    }
}

impl DocumentFetcher for MemoryCollection {
    fn fetch(&self, id: RecordId) -> Result<Option<Document>, StorageError> {
        self.check_valid()?;
        Ok(read(&self.inner.records)?.get(&id).cloned())
    }
}

impl Collection for MemoryCollection {
    fn name(&self) -> &str { &self.name }
    fn is_valid(&self) -> bool { self.inner.valid.load(Ordering::SeqCst) }
}

/// Counts a live cursor against its collection for as long as it exists
struct CursorGuard(Arc<Inner>);

impl CursorGuard {
    fn new(inner: &Arc<Inner>) -> Self {
        inner.open_cursors.fetch_add(1, Ordering::SeqCst);
        Self(inner.clone())
    }
}

impl Drop for CursorGuard {
    fn drop(&mut self) { self.0.open_cursors.fetch_sub(1, Ordering::SeqCst); }
}

struct MemoryRecordCursor {
    collection: String,
    direction: Direction,
    position: Bound<RecordId>,
    done: bool,
    guard: CursorGuard,
}

impl Iterator for MemoryRecordCursor {
    type Item = Result<Record, StorageError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let inner = &self.guard.0;
        if !inner.valid.load(Ordering::SeqCst) {
            self.done = true;
            return Some(Err(StorageError::CollectionDropped(self.collection.clone())));
        }
        let records = match read(&inner.records) {
            Ok(records) => records,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };

        let next = match self.direction {
            Direction::Forward => records.range((self.position, Bound::Unbounded)).next(),
            Direction::Backward => records.range((Bound::Unbounded, self.position)).next_back(),
        };
        match next {
            Some((id, document)) => {
                self.position = Bound::Excluded(*id);
                Some(Ok(Record { id: *id, document: document.clone() }))
            }
            None => {
                self.done = true;
                None
            }
        }
    }
}

struct MemoryIndexCursor {
    index: Arc<MemoryIndex>,
    direction: Direction,
    position: Bound<Vec<u8>>,
    done: bool,
    guard: CursorGuard,
}

impl Iterator for MemoryIndexCursor {
    type Item = Result<IndexEntry, StorageError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if !self.guard.0.valid.load(Ordering::SeqCst) {
            self.done = true;
            return Some(Err(StorageError::CollectionDropped(self.index.descriptor.collection.clone())));
        }
        if !self.index.valid.load(Ordering::SeqCst) {
            self.done = true;
            return Some(Err(StorageError::IndexDropped(self.index.descriptor.name.clone())));
        }
        let entries = match read(&self.index.entries) {
            Ok(entries) => entries,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };

        let next = match self.direction {
            Direction::Forward => entries.range((self.position.clone(), Bound::Unbounded)).next(),
            Direction::Backward => entries.range((Bound::Unbounded, self.position.clone())).next_back(),
        };
        let Some((encoded, key)) = next else {
            self.done = true;
            return None;
        };
        let entry = decode_record_id(encoded)
            .map(|record_id| IndexEntry { encoded: encoded.clone(), key: key.clone(), record_id })
            .map_err(StorageError::from);
        self.position = Bound::Excluded(encoded.clone());
        Some(entry)
    }
}
