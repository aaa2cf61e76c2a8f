//! Scalar values used as literal operands.
//!
//! Values are immutable once built. Maps keep their entries sorted in
//! canonical order so that two maps with the same content always pack to the
//! same bytes, whatever order the entries were supplied in.

use std::cmp::Ordering;

/// Particle types carried in front of string-like payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ParticleType {
    Null = 0,
    Integer = 1,
    Double = 2,
    String = 3,
    Blob = 4,
    Bool = 17,
    Map = 19,
    List = 20,
    GeoJson = 23,
}

impl ParticleType {
    /// Creates a ParticleType from its wire representation.
    pub fn from_u8(v: u8) -> Option<ParticleType> {
        match v {
            0 => Some(ParticleType::Null),
            1 => Some(ParticleType::Integer),
            2 => Some(ParticleType::Double),
            3 => Some(ParticleType::String),
            4 => Some(ParticleType::Blob),
            17 => Some(ParticleType::Bool),
            19 => Some(ParticleType::Map),
            20 => Some(ParticleType::List),
            23 => Some(ParticleType::GeoJson),
            _ => None,
        }
    }
}

/// A literal value.
///
/// Equality follows [`Value::canonical_cmp`], so a NaN float equals itself
/// and `0.0` differs from `-0.0`.
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    /// GeoJSON document text.
    GeoJson(String),
    List(Vec<Value>),
    Map(ValueMap),
}

impl Value {
    /// Creates a GeoJSON value.
    pub fn geo(json: impl Into<String>) -> Self {
        Value::GeoJson(json.into())
    }

    /// Creates a key-ordered map value.
    pub fn map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<Value>,
        V: Into<Value>,
    {
        Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// Creates a list value.
    pub fn list<T: Into<Value>>(items: impl IntoIterator<Item = T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }

    /// Position of this value's kind in the cross-kind ordering.
    fn kind_rank(&self) -> u8 {
        match self {
            Value::Nil => 0,
            Value::Bool(_) => 1,
            Value::Int(_) => 2,
            Value::String(_) => 3,
            Value::List(_) => 4,
            Value::Map(_) => 5,
            Value::Bytes(_) => 6,
            Value::Float(_) => 7,
            Value::GeoJson(_) => 8,
        }
    }

    /// Total order used for map keys.
    ///
    /// Kinds order as nil, bool, int, string, list, map, bytes, float,
    /// geojson. Floats compare by `f64::total_cmp`.
    pub fn canonical_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Nil, Value::Nil) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::GeoJson(a), Value::GeoJson(b)) => a.cmp(b),
            (Value::Bytes(a), Value::Bytes(b)) => a.cmp(b),
            (Value::List(a), Value::List(b)) => cmp_seq(a.iter(), b.iter(), |x, y| x.canonical_cmp(y)),
            (Value::Map(a), Value::Map(b)) => cmp_seq(a.iter(), b.iter(), |(ka, va), (kb, vb)| {
                ka.canonical_cmp(kb).then_with(|| va.canonical_cmp(vb))
            }),
            _ => self.kind_rank().cmp(&other.kind_rank()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        self.canonical_cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

fn cmp_seq<T>(
    mut a: impl Iterator<Item = T>,
    mut b: impl Iterator<Item = T>,
    cmp: impl Fn(&T, &T) -> Ordering,
) -> Ordering {
    loop {
        match (a.next(), b.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => match cmp(&x, &y) {
                Ordering::Equal => continue,
                ord => return ord,
            },
        }
    }
}

/// Map entries sorted by key in canonical order, keys unique.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValueMap {
    entries: Vec<(Value, Value)>,
}

impl ValueMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry, replacing the value of an equal key.
    pub fn insert(&mut self, key: Value, value: Value) {
        match self.entries.binary_search_by(|(k, _)| k.canonical_cmp(&key)) {
            Ok(idx) => self.entries[idx].1 = value,
            Err(idx) => self.entries.insert(idx, (key, value)),
        }
    }

    /// Looks up a value by key.
    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries
            .binary_search_by(|(k, _)| k.canonical_cmp(key))
            .ok()
            .map(|idx| &self.entries[idx].1)
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in key order.
    pub fn iter(&self) -> std::slice::Iter<'_, (Value, Value)> {
        self.entries.iter()
    }
}

impl FromIterator<(Value, Value)> for ValueMap {
    fn from_iter<I: IntoIterator<Item = (Value, Value)>>(iter: I) -> Self {
        let mut map = ValueMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<'a> IntoIterator for &'a ValueMap {
    type Item = &'a (Value, Value);
    type IntoIter = std::slice::Iter<'a, (Value, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

// =============================================================================
// CONVERSIONS
// =============================================================================

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl From<ValueMap> for Value {
    fn from(v: ValueMap) -> Self {
        Value::Map(v)
    }
}
