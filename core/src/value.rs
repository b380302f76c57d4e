use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single field value. Variant order is the collation order across types, so `MinKey` sorts
/// below everything and `MaxKey` above everything.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Value {
    MinKey,
    Null,
    Bool(bool),
    I64(i64),
    String(String),
    Binary(Vec<u8>),
    MaxKey,
}

impl From<bool> for Value {
    fn from(v: bool) -> Self { Value::Bool(v) }
}
impl From<i64> for Value {
    fn from(v: i64) -> Self { Value::I64(v) }
}
impl From<i32> for Value {
    fn from(v: i32) -> Self { Value::I64(v as i64) }
}
impl From<&str> for Value {
    fn from(v: &str) -> Self { Value::String(v.to_owned()) }
}
impl From<String> for Value {
    fn from(v: String) -> Self { Value::String(v) }
}
impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self { Value::Binary(v) }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::MinKey => write!(f, "MinKey"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::I64(i) => write!(f, "{i}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Binary(b) => write!(f, "<{} bytes>", b.len()),
            Value::MaxKey => write!(f, "MaxKey"),
        }
    }
}

/// A stored record: field name to value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Document(BTreeMap<String, Value>);

impl Document {
    pub fn new() -> Self { Self(BTreeMap::new()) }

    pub fn with<K: Into<String>, V: Into<Value>>(mut self, field: K, value: V) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn insert<K: Into<String>, V: Into<Value>>(&mut self, field: K, value: V) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    pub fn get(&self, field: &str) -> Option<&Value> { self.0.get(field) }
    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> { self.0.iter() }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Document {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self { Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect()) }
}

/// An index key: one value per key pattern part, in pattern order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexKey(pub Vec<Value>);

impl IndexKey {
    pub fn new(values: Vec<Value>) -> Self { Self(values) }
    pub fn single<V: Into<Value>>(value: V) -> Self { Self(vec![value.into()]) }
    pub fn values(&self) -> &[Value] { &self.0 }
    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl From<Value> for IndexKey {
    fn from(v: Value) -> Self { Self(vec![v]) }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{v}")?;
        }
        write!(f, ")")
    }
}
