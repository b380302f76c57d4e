use sled::Db;

use crate::error::SledError;
use crate::index::IndexManager;

pub struct Database {
    pub db: Db,
    pub index_manager: IndexManager,
}

impl Database {
    pub fn open(db: Db) -> Result<Self, SledError> {
        let index_config_tree = db.open_tree("index_config")?; // index definitions are stored here
        let index_manager = IndexManager::open(index_config_tree, &db)?;
        Ok(Self { db, index_manager })
    }

    /// Names of every tree in the database, collection and index trees included
    pub fn tree_names(&self) -> Vec<sled::IVec> { self.db.tree_names() }
}
