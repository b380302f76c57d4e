use super::key_pattern::KeyPattern;
use serde::{Deserialize, Serialize};

/// Immutable handle naming one index of one collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexDescriptor {
    pub name: String,
    pub collection: String,
    pub pattern: KeyPattern,
}

impl IndexDescriptor {
    pub fn new<N: Into<String>, C: Into<String>>(name: N, collection: C, pattern: KeyPattern) -> Self {
        Self { name: name.into(), collection: collection.into(), pattern }
    }

    /// Descriptor named after its key pattern
    pub fn from_pattern<C: Into<String>>(collection: C, pattern: KeyPattern) -> Self {
        Self { name: pattern.name_with("", "__"), collection: collection.into(), pattern }
    }
}
