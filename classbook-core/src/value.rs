//! Coerced field values and the validated query that carries them.

use bson::Bson;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::schema::EntityKind;

/// Raw input as submitted by a caller: a flat JSON object.
pub type RawQuery = serde_json::Map<String, serde_json::Value>;

/// A value after coercion to its declared [`FieldType`](crate::schema::FieldType).
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    List(Vec<String>),
}

impl FieldValue {
    /// Midnight UTC of a calendar date.
    pub fn midnight(date: NaiveDate) -> DateTime<Utc> {
        date.and_time(NaiveTime::MIN).and_utc()
    }

    /// The plain stored form of this value.
    ///
    /// Calendar dates are stored as date-times at midnight.
    pub fn to_bson(&self) -> Bson {
        match self {
            FieldValue::Null => Bson::Null,
            FieldValue::Bool(value) => Bson::Boolean(*value),
            FieldValue::Int(value) => Bson::Int64(*value),
            FieldValue::Float(value) => Bson::Double(*value),
            FieldValue::String(value) => Bson::String(value.clone()),
            FieldValue::Date(date) => {
                Bson::DateTime(bson::DateTime::from_chrono(Self::midnight(*date)))
            }
            FieldValue::DateTime(value) => Bson::DateTime(bson::DateTime::from_chrono(*value)),
            FieldValue::List(items) => {
                Bson::Array(items.iter().cloned().map(Bson::String).collect())
            }
        }
    }
}

/// A raw query reduced to the fields of one schema, each coerced to its declared type.
///
/// Fields keep the schema's declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedQuery {
    kind: EntityKind,
    fields: Vec<(&'static str, FieldValue)>,
}

impl ValidatedQuery {
    pub(crate) fn new(kind: EntityKind, fields: Vec<(&'static str, FieldValue)>) -> Self {
        Self { kind, fields }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &FieldValue)> + '_ {
        self.fields.iter().map(|(field, value)| (*field, value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns a copy without the named field.
    pub fn without(&self, name: &str) -> Self {
        Self {
            kind: self.kind,
            fields: self
                .fields
                .iter()
                .filter(|(field, _)| *field != name)
                .cloned()
                .collect(),
        }
    }
}
