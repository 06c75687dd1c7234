//! Raw payload values
//!
//! [`Data`] is the untrusted input side of the sanitizer: arbitrarily nested
//! sequences and mappings, shared nodes that may form cycles, and opaque host
//! objects that only know how to describe themselves.

use parking_lot::{RwLock, RwLockReadGuard};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::{self, Debug, Display, Formatter};
use std::hash::BuildHasher;
use std::sync::Arc;

/// A raw value handed to the notifier by the host application
#[derive(Clone, Default)]
pub enum Data {
    /// Absent value
    #[default]
    Null,
    /// Boolean leaf
    Bool(bool),
    /// Integer leaf
    Int(i64),
    /// Floating point leaf
    Float(f64),
    /// String leaf
    Str(String),
    /// Ordered sequence (set-like inputs are flattened into one)
    Seq(Vec<Data>),
    /// Ordered key/value mapping
    Map(Vec<(String, Data)>),
    /// Identity-bearing node, may be referenced from several places
    Shared(SharedData),
    /// Host object converted through [`Inspect`]
    Object(Arc<dyn Inspect>),
}

impl Data {
    /// Empty mapping
    #[inline]
    #[must_use]
    pub fn map() -> Self {
        Self::Map(Vec::new())
    }

    /// Build a mapping from key/value pairs, keeping their order
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Data>,
    {
        Self::Map(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Wrap a host object
    #[inline]
    pub fn object<T: Inspect + 'static>(object: T) -> Self {
        Self::Object(Arc::new(object))
    }

    /// Look up a key in a mapping (the last duplicate wins)
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Data> {
        match self {
            Self::Map(pairs) => pairs.iter().rev().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// String content of a string leaf
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Key/value pairs of a mapping, or of a shared node holding one
    ///
    /// A chain of shared nodes that loops back on itself has no pairs.
    #[must_use]
    pub fn to_pairs(&self) -> Option<Vec<(String, Data)>> {
        self.resolve(&mut Vec::new(), |data| match data {
            Self::Map(pairs) => Some(pairs.clone()),
            _ => None,
        })
        .flatten()
    }

    /// Check for `Null`, an empty string, or an empty container
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.resolve(&mut Vec::new(), |data| match data {
            Self::Null => true,
            Self::Str(s) => s.is_empty(),
            Self::Seq(items) => items.is_empty(),
            Self::Map(pairs) => pairs.is_empty(),
            _ => false,
        })
        .unwrap_or(true)
    }

    /// Follow shared nodes to the first non-shared value and apply `f`
    ///
    /// `visited` holds the identities already passed; revisiting one yields
    /// `None`.
    fn resolve<R>(&self, visited: &mut Vec<usize>, f: impl FnOnce(&Data) -> R) -> Option<R> {
        match self {
            Self::Shared(node) => {
                let id = node.identity();
                if visited.contains(&id) {
                    return None;
                }
                visited.push(id);
                let inner = node.read();
                inner.resolve(visited, f)
            }
            other => Some(f(other)),
        }
    }

    /// Insert into a mapping, turning any other value into an empty mapping first
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Data>) {
        if !matches!(self, Self::Map(_)) {
            *self = Self::map();
        }
        if let Self::Map(pairs) = self {
            pairs.push((key.into(), value.into()));
        }
    }
}

impl Debug for Data {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Self::Int(i) => f.debug_tuple("Int").field(i).finish(),
            Self::Float(x) => f.debug_tuple("Float").field(x).finish(),
            Self::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Self::Seq(items) => f.debug_list().entries(items).finish(),
            Self::Map(pairs) => f
                .debug_map()
                .entries(pairs.iter().map(|(k, v)| (k, v)))
                .finish(),
            Self::Shared(node) => write!(f, "Shared({:#x})", node.identity()),
            Self::Object(object) => write!(f, "Object({object})"),
        }
    }
}

/// Capability check for host objects
///
/// Objects that can present themselves as a mapping or a sequence are
/// converted first and then sanitized like any other container. Everything
/// else is rendered through [`Display`].
pub trait Inspect: Display + Send + Sync {
    /// Convert into a container, if the object has a natural one
    fn convert(&self) -> Conversion {
        Conversion::Opaque
    }
}

/// Result of [`Inspect::convert`]
#[derive(Debug, Clone)]
pub enum Conversion {
    /// Object converts to a mapping
    Mapping(Vec<(String, Data)>),
    /// Object converts to a sequence
    Sequence(Vec<Data>),
    /// Object only has a string representation
    Opaque,
}

/// Shared, mutable node with a stable identity
///
/// This is the only way to build a cyclic [`Data`] graph. Cycles leak.
#[derive(Clone)]
pub struct SharedData(Arc<RwLock<Data>>);

impl SharedData {
    /// Create a new node
    #[inline]
    #[must_use]
    pub fn new(data: Data) -> Self {
        Self(Arc::new(RwLock::new(data)))
    }

    /// Insert a key into the node's mapping
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Data>) {
        self.0.write().insert(key, value);
    }

    /// Stable identity of this node
    #[inline]
    #[must_use]
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.0).cast::<()>() as usize
    }

    /// Read access; recursive so nested reads of the same node never deadlock
    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Data> {
        self.0.read_recursive()
    }
}

impl Debug for SharedData {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "SharedData({:#x})", self.identity())
    }
}

pub(crate) fn object_identity(object: &Arc<dyn Inspect>) -> usize {
    Arc::as_ptr(object).cast::<()>() as usize
}

impl From<bool> for Data {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Data {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Data {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for Data {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for Data {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Data {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Data {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<SharedData> for Data {
    fn from(value: SharedData) -> Self {
        Self::Shared(value)
    }
}

impl<T: Into<Data>> From<Option<T>> for Data {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl<T: Into<Data>> From<Vec<T>> for Data {
    fn from(value: Vec<T>) -> Self {
        Self::Seq(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Data>, S: BuildHasher> From<HashSet<T, S>> for Data {
    fn from(value: HashSet<T, S>) -> Self {
        Self::Seq(value.into_iter().map(Into::into).collect())
    }
}

impl<K: Into<String>, V: Into<Data>, S: BuildHasher> From<HashMap<K, V, S>> for Data {
    fn from(value: HashMap<K, V, S>) -> Self {
        Self::from_pairs(value)
    }
}

impl<K: Into<String>, V: Into<Data>> From<BTreeMap<K, V>> for Data {
    fn from(value: BTreeMap<K, V>) -> Self {
        Self::from_pairs(value)
    }
}

impl From<serde_json::Value> for Data {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float))
                .unwrap_or_else(|| Self::Str(n.to_string())),
            Value::String(s) => Self::Str(s),
            Value::Array(items) => Self::Seq(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => Self::from_pairs(map),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_returns_last_duplicate() {
        let data = Data::from_pairs([("a", "1"), ("a", "2")]);
        assert_eq!(data.get("a").and_then(Data::as_str), Some("2"));
        assert!(data.get("b").is_none());
    }

    #[test]
    fn insert_converts_scalar_to_map() {
        let mut data = Data::Int(3);
        data.insert("k", "v");
        assert_eq!(data.get("k").and_then(Data::as_str), Some("v"));
    }

    #[test]
    fn blank_detection() {
        assert!(Data::Null.is_blank());
        assert!(Data::map().is_blank());
        assert!(Data::from("").is_blank());
        assert!(!Data::Bool(false).is_blank());
        assert!(SharedData::new(Data::map()).identity() != 0);
    }

    #[test]
    fn json_values_convert() {
        let data = Data::from(serde_json::json!({"n": 1, "f": 1.5, "s": "x", "l": [true]}));
        assert!(matches!(data.get("n"), Some(Data::Int(1))));
        assert!(matches!(data.get("f"), Some(Data::Float(_))));
        assert!(matches!(data.get("l"), Some(Data::Seq(items)) if items.len() == 1));
    }

    #[test]
    fn shared_chains_resolve_to_their_value() {
        let inner = SharedData::new(Data::from_pairs([("a", 1)]));
        let outer = Data::Shared(SharedData::new(Data::Shared(inner)));
        assert_eq!(outer.to_pairs().map(|pairs| pairs.len()), Some(1));
        assert!(!outer.is_blank());
        assert!(Data::Shared(SharedData::new(Data::Null)).is_blank());
    }

    #[test]
    fn self_valued_node_has_no_pairs_and_is_blank() {
        let node = SharedData::new(Data::Null);
        *node.0.write() = Data::Shared(node.clone());
        let data = Data::Shared(node);
        assert!(data.to_pairs().is_none());
        assert!(data.is_blank());
    }

    #[test]
    fn two_node_loop_terminates() {
        let a = SharedData::new(Data::Null);
        let b = SharedData::new(Data::Shared(a.clone()));
        *a.0.write() = Data::Shared(b.clone());
        assert!(Data::Shared(a).to_pairs().is_none());
        assert!(Data::Shared(b).is_blank());
    }

    #[test]
    fn shared_identity_is_stable_across_clones() {
        let node = SharedData::new(Data::map());
        let clone = node.clone();
        assert_eq!(node.identity(), clone.identity());
        assert_ne!(node.identity(), SharedData::new(Data::map()).identity());
    }
}
