//! Container adapter for documents that are not plain arrays and objects.
//!
//! The evaluator has a fast path for [`Value::Array`] and [`Value::Object`].
//! Anything else that should be queryable (typed records, maps keyed by
//! integers or booleans, lazily converted sequences, optional fields) is
//! wrapped in a [`ContainerView`] and stored as [`Value::View`]. The
//! evaluator only ever talks to the trait, never to the concrete type.
//!
//! ```
//! use jp_policy::{Value, container::Record};
//!
//! let pod = Record::new("Pod")
//!     .field("Name", "web")
//!     .field("Replicas", 3);
//! let doc = Value::view(pod);
//! assert_eq!(jp_policy::search("name", &doc).unwrap(), Value::from("web"));
//! ```

use std::{collections::BTreeMap, fmt, sync::Arc};

use crate::value::Value;

/// What shape a view presents to the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    /// Named fields, read like an object
    Record,
    /// Associative container, read like an object
    Map,
    /// Ordered elements, read like an array
    Sequence,
    /// Pointer or optional, read as its target or null
    Optional,
}

/// Read-only access to structured data.
///
/// Implementations only need the methods that make sense for their
/// [`ViewKind`]; the defaults describe an empty container.
pub trait ContainerView: fmt::Debug + Send + Sync {
    fn kind(&self) -> ViewKind;

    /// Field or key lookup. `None` when absent.
    fn get(&self, _name: &str) -> Option<Value> {
        None
    }

    /// Field names or keys, in iteration order.
    fn keys(&self) -> Vec<String> {
        Vec::new()
    }

    /// Number of elements of a sequence.
    fn len(&self) -> usize {
        0
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at `index` of a sequence.
    fn index(&self, _index: usize) -> Option<Value> {
        None
    }

    /// Elements of a sequence, in order.
    fn elements(&self) -> Box<dyn Iterator<Item = Value> + '_> {
        Box::new((0..self.len()).filter_map(move |i| self.index(i)))
    }

    /// Target of an optional. `None` when the optional is empty.
    fn target(&self) -> Option<Value> {
        None
    }
}

/// A typed record with named fields.
///
/// Lookup tries the exact name first, then a match that ignores the case of
/// the first letter only, so `metadata` finds a field declared `Metadata`.
#[derive(Debug, Clone, Default)]
pub struct Record {
    type_name: String,
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new(type_name: impl Into<String>) -> Self {
        Record {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    /// Builder-style field declaration.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    fn lookup(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .or_else(|| {
                self.fields
                    .iter()
                    .find(|(field, _)| first_letter_fold_eq(field, name))
            })
            .map(|(_, value)| value)
    }
}

fn first_letter_fold_eq(a: &str, b: &str) -> bool {
    let mut a_chars = a.chars();
    let mut b_chars = b.chars();
    match (a_chars.next(), b_chars.next()) {
        (Some(x), Some(y)) => {
            x.to_lowercase().eq(y.to_lowercase()) && a_chars.as_str() == b_chars.as_str()
        }
        _ => false,
    }
}

impl ContainerView for Record {
    fn kind(&self) -> ViewKind {
        ViewKind::Record
    }

    fn get(&self, name: &str) -> Option<Value> {
        self.lookup(name).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.fields.iter().map(|(name, _)| name.clone()).collect()
    }
}

/// Key types a [`KeyedMap`] can be indexed by. The field name of an
/// expression is coerced into the key type before lookup.
pub trait MapKey: Ord + Clone + fmt::Debug + Send + Sync {
    fn from_field(name: &str) -> Option<Self>;
    fn to_field(&self) -> String;
}

macro_rules! impl_map_key_parse {
    ($($ty:ty),*) => {
        $(
            impl MapKey for $ty {
                fn from_field(name: &str) -> Option<Self> {
                    name.parse().ok()
                }

                fn to_field(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

impl_map_key_parse!(i32, i64, u32, u64, usize, bool, char);

impl MapKey for String {
    fn from_field(name: &str) -> Option<Self> {
        Some(name.to_string())
    }

    fn to_field(&self) -> String {
        self.clone()
    }
}

/// An associative container keyed by a non-string type.
#[derive(Debug, Clone)]
pub struct KeyedMap<K, V> {
    entries: BTreeMap<K, V>,
}

impl<K: MapKey, V> KeyedMap<K, V> {
    pub fn new(entries: BTreeMap<K, V>) -> Self {
        KeyedMap { entries }
    }
}

impl<K, V> FromIterator<(K, V)> for KeyedMap<K, V>
where
    K: MapKey,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        KeyedMap {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<K, V> ContainerView for KeyedMap<K, V>
where
    K: MapKey,
    V: Clone + Into<Value> + fmt::Debug + Send + Sync,
{
    fn kind(&self) -> ViewKind {
        ViewKind::Map
    }

    fn get(&self, name: &str) -> Option<Value> {
        let key = K::from_field(name)?;
        self.entries.get(&key).cloned().map(Into::into)
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().map(MapKey::to_field).collect()
    }
}

/// A typed sequence whose elements are converted only when read.
#[derive(Debug, Clone)]
pub struct Sequence<T> {
    items: Arc<[T]>,
}

impl<T> Sequence<T> {
    pub fn new(items: impl Into<Arc<[T]>>) -> Self {
        Sequence {
            items: items.into(),
        }
    }
}

impl<T> ContainerView for Sequence<T>
where
    T: Clone + Into<Value> + fmt::Debug + Send + Sync,
{
    fn kind(&self) -> ViewKind {
        ViewKind::Sequence
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn index(&self, index: usize) -> Option<Value> {
        self.items.get(index).cloned().map(Into::into)
    }

    fn elements(&self) -> Box<dyn Iterator<Item = Value> + '_> {
        Box::new(self.items.iter().cloned().map(Into::into))
    }
}

/// A pointer or optional field. Reads as its target, or null when empty.
#[derive(Debug, Clone, Default)]
pub struct Optional {
    inner: Option<Box<Value>>,
}

impl Optional {
    pub fn some(value: impl Into<Value>) -> Self {
        Optional {
            inner: Some(Box::new(value.into())),
        }
    }

    pub fn none() -> Self {
        Optional { inner: None }
    }
}

impl ContainerView for Optional {
    fn kind(&self) -> ViewKind {
        ViewKind::Optional
    }

    fn target(&self) -> Option<Value> {
        self.inner.as_deref().cloned()
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::view(record)
    }
}

impl From<Optional> for Value {
    fn from(optional: Optional) -> Self {
        Value::view(optional)
    }
}
