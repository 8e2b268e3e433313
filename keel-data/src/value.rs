use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DataError;

/// Stable, opaque record identifier.
///
/// The nil value marks a record that has not been persisted yet; a real
/// identifier is generated exactly once, on create.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    pub fn generate() -> Self {
        RecordId(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        RecordId(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    pub fn is_assigned(&self) -> bool {
        !self.0.is_nil()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for RecordId {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(RecordId)
            .map_err(|_| DataError::invalid(format!("'{s}' is not a valid identifier")))
    }
}

/// Declared type of a record or shape field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Bool,
    Int,
    Float,
    Text,
    Timestamp,
    Id,
}

impl FieldType {
    /// Whether `<`, `>` and friends are meaningful for this type.
    pub fn is_ordered(self) -> bool {
        matches!(
            self,
            FieldType::Int | FieldType::Float | FieldType::Text | FieldType::Timestamp
        )
    }

    pub fn is_text(self) -> bool {
        self == FieldType::Text
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::Bool => "bool",
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Text => "text",
            FieldType::Timestamp => "timestamp",
            FieldType::Id => "id",
        };
        f.write_str(name)
    }
}

/// A single field value, as read from or written to a record or shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
    Id(RecordId),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The field type this value inhabits; `None` for `Null`.
    pub fn field_type(&self) -> Option<FieldType> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(FieldType::Bool),
            Value::Int(_) => Some(FieldType::Int),
            Value::Float(_) => Some(FieldType::Float),
            Value::Text(_) => Some(FieldType::Text),
            Value::Timestamp(_) => Some(FieldType::Timestamp),
            Value::Id(_) => Some(FieldType::Id),
        }
    }

    /// Whether this value may be stored in a field of type `ty`.
    pub fn fits(&self, ty: FieldType) -> bool {
        self.field_type().map_or(true, |own| own == ty)
    }

    /// Parse caller-supplied text as a value of type `ty`.
    ///
    /// Parsing is strict: no trimming of text values, RFC 3339 timestamps
    /// only, finite floats only.
    pub fn parse(ty: FieldType, raw: &str) -> Result<Value, DataError> {
        let bad = || DataError::invalid(format!("'{raw}' is not a valid {ty} value"));
        match ty {
            FieldType::Text => Ok(Value::Text(raw.to_string())),
            FieldType::Bool => match raw.trim() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(bad()),
            },
            FieldType::Int => raw.trim().parse().map(Value::Int).map_err(|_| bad()),
            FieldType::Float => match raw.trim().parse::<f64>() {
                Ok(f) if f.is_finite() => Ok(Value::Float(f)),
                _ => Err(bad()),
            },
            FieldType::Timestamp => DateTime::parse_from_rfc3339(raw.trim())
                .map(|t| Value::Timestamp(t.with_timezone(&Utc)))
                .map_err(|_| bad()),
            FieldType::Id => Uuid::parse_str(raw.trim())
                .map(|u| Value::Id(RecordId(u)))
                .map_err(|_| bad()),
        }
    }

    /// Total order used by sorting: nulls first, then by value.
    pub fn compare(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => {
                a.partial_cmp(b).unwrap_or_else(|| a.total_cmp(b))
            }
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            (Value::Id(a), Value::Id(b)) => a.cmp(b),
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) => 2,
            Value::Float(_) => 3,
            Value::Text(_) => 4,
            Value::Timestamp(_) => 5,
            Value::Id(_) => 6,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => write!(f, "'{s}'"),
            Value::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
            Value::Id(id) => write!(f, "{id}"),
        }
    }
}

/// Conversion of a Rust field into a [`Value`].
pub trait IntoValue {
    fn into_value(self) -> Value;
}

/// Conversion of a [`Value`] back into a Rust field.
pub trait FromValue: Sized {
    fn from_value(value: Value, field: &str) -> Result<Self, DataError>;
}

fn type_error(field: &str, expected: &str, got: &Value) -> DataError {
    DataError::invalid(format!("field '{field}' expects {expected}, got {got}"))
}

macro_rules! impl_value_conversions {
    ($($ty:ty => $variant:ident, $label:literal;)+) => {
        $(
            impl IntoValue for $ty {
                fn into_value(self) -> Value {
                    Value::$variant(self)
                }
            }

            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }

            impl FromValue for $ty {
                fn from_value(value: Value, field: &str) -> Result<Self, DataError> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(type_error(field, $label, &other)),
                    }
                }
            }
        )+
    };
}

impl_value_conversions! {
    bool => Bool, "bool";
    i64 => Int, "int";
    f64 => Float, "float";
    String => Text, "text";
    DateTime<Utc> => Timestamp, "timestamp";
    RecordId => Id, "id";
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        match self {
            Some(v) => v.into_value(),
            None => Value::Null,
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value, field: &str) -> Result<Self, DataError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other, field).map(Some),
        }
    }
}
