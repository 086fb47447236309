//! Sparse canonical records.
//!
//! A [`SparseRecord`] maps a subset of canonical field names to values that
//! are already coerced to the field's kind. Absent keys mean "unknown";
//! [`FieldValue::Null`] means the provider explicitly reported nothing.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{Error, Result};
use crate::schema::{self, CanonicalField, StorageType, ID_FIELD};

/// A value already coerced to a canonical field's kind.
///
/// Booleans are carried as `Int(0 | 1)`; JSON-kind fields carry their JSON
/// text in `Text`.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    /// Flag value for a boolean field.
    pub fn flag(on: bool) -> Self {
        Self::Int(i64::from(on))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Whether this value can be bound as-is to a column of `storage`.
    pub fn fits(&self, storage: StorageType) -> bool {
        matches!(
            (self, storage),
            (Self::Null, _)
                | (Self::Int(_), StorageType::Integer)
                | (Self::Float(_), StorageType::Float)
                | (Self::Text(_), StorageType::Text)
        )
    }

    /// Convert to a value bindable to `storage`, if one exists.
    ///
    /// Integral floats become integers, integers widen to floats, numeric
    /// text parses, and any scalar renders to text.
    pub fn into_storage(self, storage: StorageType) -> Option<FieldValue> {
        match (self, storage) {
            (Self::Null, _) => Some(Self::Null),
            (v @ Self::Int(_), StorageType::Integer) => Some(v),
            (Self::Float(f), StorageType::Integer) => integral(f).map(Self::Int),
            (Self::Text(s), StorageType::Integer) => s.trim().parse().ok().map(Self::Int),
            (Self::Int(n), StorageType::Float) => Some(Self::Float(n as f64)),
            (v @ Self::Float(_), StorageType::Float) => Some(v),
            (Self::Text(s), StorageType::Float) => s.trim().parse().ok().map(Self::Float),
            (Self::Int(n), StorageType::Text) => Some(Self::Text(n.to_string())),
            (Self::Float(f), StorageType::Text) => Some(Self::Text(f.to_string())),
            (v @ Self::Text(_), StorageType::Text) => Some(v),
            _ => None,
        }
    }
}

/// `f` as an integer when it is whole and within `i64` range.
pub fn integral(f: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive.
    let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
    (f.fract() == 0.0 && in_range).then_some(f as i64)
}

impl From<&Value> for FieldValue {
    /// Interchange-file view of a JSON value: booleans become flags and
    /// nested structures are kept as compact JSON text.
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::flag(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => n.as_f64().map_or(Self::Null, Self::Float),
            },
            Value::String(s) => Self::Text(s.clone()),
            nested => Self::Text(nested.to_string()),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Int(n) => serializer.serialize_i64(*n),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(FieldValue::from(&value))
    }
}

/// A mapping from a subset of canonical fields to coerced values.
///
/// Keys are held by registry position, so iteration is always in column
/// order and no key outside the registry can be stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseRecord {
    values: BTreeMap<usize, FieldValue>,
}

impl SparseRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a canonical field. Names outside the registry are rejected.
    pub fn insert(&mut self, name: &str, value: FieldValue) -> Result<()> {
        let pos = schema::position(name).ok_or_else(|| Error::UnknownField(name.to_string()))?;
        self.values.insert(pos, value);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        schema::position(name).and_then(|pos| self.values.get(&pos))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Present fields in registry order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static CanonicalField, &FieldValue)> {
        let fields = schema::fields();
        self.values.iter().map(move |(pos, v)| (&fields[*pos], v))
    }

    /// Names of present fields in registry order.
    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.iter().map(|(f, _)| f.name)
    }

    /// Provider native identifier, if present and integral.
    pub fn id(&self) -> Option<i64> {
        self.get(ID_FIELD).and_then(FieldValue::as_i64)
    }

    pub fn scientific_name(&self) -> Option<&str> {
        self.get("scientific_name").and_then(FieldValue::as_str)
    }

    /// Human-readable identity used in logs and error reports.
    pub fn identity(&self) -> String {
        let id = self
            .id()
            .map_or_else(|| "<no id>".to_string(), |id| id.to_string());
        match self.scientific_name() {
            Some(name) => format!("{} ({})", id, name),
            None => id,
        }
    }

    /// Build a record from a decoded JSON object, dropping keys that are not
    /// canonical. Returns the dropped key names.
    pub fn from_json_map(map: &Map<String, Value>) -> (Self, Vec<String>) {
        let mut record = Self::new();
        let mut dropped = Vec::new();
        for (key, value) in map {
            match schema::position(key) {
                Some(pos) => {
                    record.values.insert(pos, FieldValue::from(value));
                }
                None => dropped.push(key.clone()),
            }
        }
        (record, dropped)
    }
}

impl Serialize for SparseRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (field, value) in self.iter() {
            map.serialize_entry(field.name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SparseRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        let (record, dropped) = SparseRecord::from_json_map(&map);
        if !dropped.is_empty() {
            warn!(
                subsystem = "core",
                component = "record",
                species_id = record.id(),
                dropped = ?dropped,
                "Dropped non-canonical keys from record"
            );
        }
        Ok(record)
    }
}
