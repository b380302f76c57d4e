use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use keel_core::indexing::encode_entry;
use keel_core::{Document, IndexDescriptor, KeyPattern, RecordId};
use serde::{Deserialize, Serialize};
use sled::{Db, Tree};
use tracing::{debug, warn};

use crate::error::{poisoned, SledError};

/// Persisted definition of one index, stored in the `index_config` tree under its id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexRecord {
    pub id: u32,
    pub collection: String,
    pub name: String,
    pub pattern: KeyPattern,
    pub created_at_unix_ms: i64,
}

#[derive(Clone)]
pub struct Index(Arc<IndexInner>);

struct IndexInner {
    id: u32,
    descriptor: IndexDescriptor,
    created_at_unix_ms: i64,
    tree: Tree,
    valid: AtomicBool,
}

pub struct IndexManager {
    pub index_config_tree: Tree,
    indexes: RwLock<HashMap<u32, Index>>,
}

impl IndexManager {
    pub fn open(index_config_tree: Tree, db: &Db) -> Result<Self, SledError> {
        let mut indexes = HashMap::new();
        for item in index_config_tree.iter() {
            let (key, bytes) = item?;
            let id = u32::from_be_bytes(key.as_ref().try_into().map_err(|_| SledError::InvalidKeyLength)?);
            match bincode::deserialize::<IndexRecord>(&bytes) {
                Ok(mut rec) => {
                    // Trust key as source of truth for id
                    rec.id = id;
                    indexes.insert(id, Index::from_record(rec, db)?);
                }
                Err(e) => warn!(id, "skipping unreadable index record: {e}"),
            }
        }
        debug!(count = indexes.len(), "loaded index definitions");
        Ok(Self { index_config_tree, indexes: RwLock::new(indexes) })
    }

    pub fn next_index_id(&self) -> Result<u32, SledError> {
        if let Some((k, _)) = self.index_config_tree.last()? {
            let arr: [u8; 4] = k.as_ref().try_into().map_err(|_| SledError::InvalidKeyLength)?;
            u32::from_be_bytes(arr).checked_add(1).ok_or(SledError::IndexIdsExhausted)
        } else {
            Ok(0)
        }
    }

    /// Every live index of `collection`
    pub fn for_collection(&self, collection: &str) -> Result<Vec<Index>, SledError> {
        let guard = self.indexes.read().map_err(poisoned)?;
        let mut found: Vec<Index> = guard.values().filter(|idx| idx.collection() == collection).cloned().collect();
        found.sort_by_key(|idx| idx.id());
        Ok(found)
    }

    pub fn find(&self, collection: &str, name: &str) -> Result<Option<Index>, SledError> {
        let guard = self.indexes.read().map_err(poisoned)?;
        Ok(guard.values().find(|idx| idx.collection() == collection && idx.name() == name).cloned())
    }

    /// Define a new index and persist its record. The caller backfills it.
    pub fn create(&self, db: &Db, collection: &str, name: String, pattern: KeyPattern) -> Result<Index, SledError> {
        let mut w = self.indexes.write().map_err(poisoned)?;
        let id = self.next_index_id()?;
        let rec = IndexRecord { id, collection: collection.to_owned(), name, pattern, created_at_unix_ms: chrono::Utc::now().timestamp_millis() };
        let bytes = bincode::serialize(&rec)?;
        let index = Index::from_record(rec, db)?;
        self.index_config_tree.insert(id.to_be_bytes(), bytes)?;
        w.insert(id, index.clone());
        Ok(index)
    }

    /// Forget `index`: its record and its tree are removed and any open cursor over it is invalidated
    pub fn remove(&self, db: &Db, index: &Index) -> Result<(), SledError> {
        self.indexes.write().map_err(poisoned)?.remove(&index.id());
        index.invalidate();
        self.index_config_tree.remove(index.id().to_be_bytes())?;
        db.drop_tree(format!("index_{}", index.id()))?;
        Ok(())
    }
}

impl Index {
    pub fn from_record(rec: IndexRecord, db: &Db) -> Result<Self, SledError> {
        Ok(Self(Arc::new(IndexInner {
            id: rec.id,
            tree: db.open_tree(format!("index_{}", rec.id))?,
            descriptor: IndexDescriptor::new(rec.name, rec.collection, rec.pattern),
            created_at_unix_ms: rec.created_at_unix_ms,
            valid: AtomicBool::new(true),
        })))
    }

    pub fn tree(&self) -> &Tree { &self.0.tree }
    pub fn id(&self) -> u32 { self.0.id }
    pub fn collection(&self) -> &str { &self.0.descriptor.collection }
    pub fn name(&self) -> &str { &self.0.descriptor.name }
    pub fn pattern(&self) -> &KeyPattern { &self.0.descriptor.pattern }
    pub fn descriptor(&self) -> &IndexDescriptor { &self.0.descriptor }
    pub fn created_at_unix_ms(&self) -> i64 { self.0.created_at_unix_ms }

    pub fn is_valid(&self) -> bool { self.0.valid.load(Ordering::SeqCst) }
    pub(crate) fn invalidate(&self) { self.0.valid.store(false, Ordering::SeqCst) }

    /// Entry key for a record: the encoded index key followed by the record id.
    /// The stored value is the unencoded key so scans can hand it back without decoding.
    fn entry(&self, id: RecordId, doc: &Document) -> Result<(Vec<u8>, Vec<u8>), SledError> {
        let key = self.pattern().extract_key(doc);
        let entry = encode_entry(&key, id, self.pattern())?;
        Ok((entry, bincode::serialize(&key)?))
    }

    /// Move `id`'s entry from its old document's key to its new one
    pub fn update(&self, id: RecordId, old: Option<&Document>, new: Option<&Document>) -> Result<(), SledError> {
        let old_entry = old.map(|doc| self.entry(id, doc)).transpose()?;
        let new_entry = new.map(|doc| self.entry(id, doc)).transpose()?;
        match (old_entry, new_entry) {
            (Some((ok, _)), Some((nk, _))) if ok == nk => {}
            (old_entry, new_entry) => {
                if let Some((ok, _)) = old_entry {
                    self.0.tree.remove(ok)?;
                }
                if let Some((nk, value)) = new_entry {
                    self.0.tree.insert(nk, value)?;
                }
            }
        }
        Ok(())
    }

    /// Populate the index from every record already in `records`
    pub fn backfill(&self, records: &Tree) -> Result<usize, SledError> {
        let mut count = 0;
        for item in records.iter() {
            let (k, v) = item?;
            let id = RecordId::from_bytes(k.as_ref().try_into().map_err(|_| SledError::InvalidKeyLength)?);
            let doc: Document = bincode::deserialize(&v)?;
            let (entry, value) = self.entry(id, &doc)?;
            self.0.tree.insert(entry, value)?;
            count += 1;
        }
        Ok(count)
    }
}
