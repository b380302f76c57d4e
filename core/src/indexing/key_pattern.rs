use crate::value::{Document, IndexKey, Value};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexDirection {
    Asc,
    Desc,
}

impl IndexDirection {
    pub fn is_desc(&self) -> bool { matches!(self, IndexDirection::Desc) }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyPart {
    pub field: String,
    pub direction: IndexDirection,
}

impl KeyPart {
    pub fn asc<S: Into<String>>(field: S) -> Self { Self { field: field.into(), direction: IndexDirection::Asc } }
    pub fn desc<S: Into<String>>(field: S) -> Self { Self { field: field.into(), direction: IndexDirection::Desc } }
}

/// Ordered list of indexed fields, each ascending or descending.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyPattern {
    pub keyparts: Vec<KeyPart>,
}

impl KeyPattern {
    pub fn new(keyparts: Vec<KeyPart>) -> Self { Self { keyparts } }

    pub fn len(&self) -> usize { self.keyparts.len() }
    pub fn is_empty(&self) -> bool { self.keyparts.is_empty() }

    /// Index name derived from the pattern, e.g. `year_asc__name_desc`
    pub fn name_with(&self, prefix: &str, delim: &str) -> String {
        let fields: Vec<String> = self
            .keyparts
            .iter()
            .map(|k| {
                let dir = match k.direction {
                    IndexDirection::Asc => "asc",
                    IndexDirection::Desc => "desc",
                };
                format!("{}_{}", k.field, dir)
            })
            .collect();

        if prefix.is_empty() { fields.join(delim) } else { format!("{}{}{}", prefix, delim, fields.join(delim)) }
    }

    /// Key under which `doc` is indexed. Missing fields index as `Null`.
    pub fn extract_key(&self, doc: &Document) -> IndexKey {
        IndexKey::new(self.keyparts.iter().map(|kp| doc.get(&kp.field).cloned().unwrap_or(Value::Null)).collect())
    }
}
