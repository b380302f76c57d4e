use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use keel_core::storage::Collection;
use sled::Config;
use tracing::{debug, info};

use crate::collection::{CollectionState, SledCollection};
use crate::database::Database;
use crate::error::{poisoned, SledError};

pub struct SledStorageEngine {
    pub database: Arc<Database>,
    collections: Mutex<HashMap<String, Arc<SledCollection>>>,
}

impl SledStorageEngine {
    pub fn with_homedir_folder(folder_name: &str) -> anyhow::Result<Self> {
        let dir = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Failed to get home directory"))?.join(folder_name);

        Self::with_path(dir)
    }

    pub fn with_path(path: PathBuf) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&path)?;
        let dbpath = path.join("sled");
        let db = sled::open(&dbpath)?;
        info!(path = %dbpath.display(), "opened sled storage");
        Self::open(db)
    }

    pub fn new() -> anyhow::Result<Self> { Self::with_homedir_folder(".keel") }

    pub fn new_test() -> anyhow::Result<Self> {
        let db = Config::new().temporary(true).flush_every_ms(None).open()?;
        Self::open(db)
    }

    fn open(db: sled::Db) -> anyhow::Result<Self> {
        Ok(Self { database: Arc::new(Database::open(db)?), collections: Mutex::new(HashMap::new()) })
    }

    /// Handle to the named collection, created on first use.
    ///
    /// Handles for the same name share state until the collection is dropped; after that, a call
    /// here starts a new, empty collection.
    pub fn collection(&self, name: &str) -> Result<Arc<SledCollection>, SledError> {
        let mut collections = self.collections.lock().map_err(poisoned)?;
        if let Some(existing) = collections.get(name) {
            if existing.is_valid() {
                return Ok(existing.clone());
            }
        }

        let tree = self.database.db.open_tree(format!("collection_{name}"))?;
        let state = Arc::new(CollectionState::new(name));
        let collection = Arc::new(SledCollection::new(name, self.database.clone(), tree, state));
        debug!(collection = %name, "opened collection");
        collections.insert(name.to_owned(), collection.clone());
        Ok(collection)
    }

    /// Drop the named collection with its indexes. Every handle and cursor over it is invalidated.
    pub fn drop_collection(&self, name: &str) -> Result<bool, SledError> {
        let tree_name = format!("collection_{name}");
        if !self.database.tree_names().iter().any(|t| &t[..] == tree_name.as_bytes()) {
            return Ok(false);
        }
        let handle = self.collection(name)?;
        let mut collections = self.collections.lock().map_err(poisoned)?;
        handle.invalidate()?;
        collections.remove(name);
        let dropped = self.database.db.drop_tree(tree_name)?;
        debug!(collection = %name, dropped, "dropped collection");
        Ok(dropped)
    }

    /// List all collections in the storage engine by looking for trees that start with collection_
    pub fn list_collections(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .database
            .tree_names()
            .into_iter()
            .filter_map(|name| {
                // Convert &[u8] to String, skip if invalid UTF-8
                let name_str = String::from_utf8(name.to_vec()).ok()?;
                Some(name_str.strip_prefix("collection_")?.to_owned())
            })
            .collect();
        names.sort();
        names
    }
}
