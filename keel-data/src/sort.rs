use std::cmp::Ordering;

use crate::catalog::{FieldDescriptor, RecordDescriptor};
use crate::entity::FieldAccess;
use crate::error::DataError;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

impl Direction {
    pub fn is_ascending(self) -> bool {
        self == Direction::Ascending
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: Direction,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Ascending,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Descending,
        }
    }
}

/// Ordered sequence of sort keys; earlier keys take precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortSpec {
    keys: Vec<SortKey>,
}

impl SortSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn asc(mut self, field: impl Into<String>) -> Self {
        self.keys.push(SortKey::asc(field));
        self
    }

    pub fn desc(mut self, field: impl Into<String>) -> Self {
        self.keys.push(SortKey::desc(field));
        self
    }

    /// Parse a comma-separated list: `status,-created_at` or `status:asc,created_at:desc`.
    pub fn parse(expr: &str) -> Result<Self, DataError> {
        let mut keys = Vec::new();
        for part in expr.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let key = if let Some(field) = part.strip_prefix('-') {
                SortKey::desc(field.trim())
            } else if let Some((field, dir)) = part.split_once(':') {
                match dir.trim().to_ascii_lowercase().as_str() {
                    "asc" => SortKey::asc(field.trim()),
                    "desc" => SortKey::desc(field.trim()),
                    other => {
                        return Err(DataError::invalid(format!(
                            "unknown sort direction '{other}'"
                        )))
                    }
                }
            } else {
                SortKey::asc(part)
            };
            if key.field.is_empty() {
                return Err(DataError::invalid(format!("sort key '{part}' has no field")));
            }
            keys.push(key);
        }
        Ok(Self { keys })
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// A sort specification resolved against a descriptor.
///
/// Always ends with the identifier, so any two distinct records compare
/// unequal and pagination is deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct SortOrder {
    keys: Vec<(FieldDescriptor, Direction)>,
}

impl SortOrder {
    pub fn resolve(descriptor: &RecordDescriptor, spec: &SortSpec) -> Result<Self, DataError> {
        let mut keys: Vec<(FieldDescriptor, Direction)> = Vec::with_capacity(spec.keys.len() + 1);
        for key in &spec.keys {
            let field = descriptor.field(&key.field).ok_or_else(|| {
                DataError::invalid(format!(
                    "unknown sort field '{}' on record type '{}'",
                    key.field,
                    descriptor.type_name()
                ))
            })?;
            // a repeated key can never break a tie the first one left
            if keys.iter().any(|(f, _)| f.name == field.name) {
                continue;
            }
            keys.push((field.clone(), key.direction));
        }

        let id_field = descriptor.id_field();
        if !keys.iter().any(|(f, _)| f.name == id_field) {
            let id = descriptor.field(id_field).ok_or_else(|| {
                DataError::configuration(format!(
                    "record type '{}' has no identifier field",
                    descriptor.type_name()
                ))
            })?;
            keys.push((id.clone(), Direction::Ascending));
        }
        Ok(Self { keys })
    }

    pub fn keys(&self) -> &[(FieldDescriptor, Direction)] {
        &self.keys
    }

    /// Composite comparison; nulls first ascending, last descending.
    pub fn compare<R: FieldAccess + ?Sized>(&self, a: &R, b: &R) -> Ordering {
        for (field, direction) in &self.keys {
            let left = a.get_field(field.name).unwrap_or(Value::Null);
            let right = b.get_field(field.name).unwrap_or(Value::Null);
            let ordering = match direction {
                Direction::Ascending => left.compare(&right),
                Direction::Descending => right.compare(&left),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FieldType;

    fn descriptor() -> RecordDescriptor {
        RecordDescriptor::builder("parcel", "shipments_parcel")
            .id("id")
            .field("status", FieldType::Text)
            .optional("weight", FieldType::Int)
            .build()
    }

    #[test]
    fn parse_both_forms() {
        let spec = SortSpec::parse("status, -weight,id:desc").unwrap();
        assert_eq!(
            spec.keys(),
            &[
                SortKey::asc("status"),
                SortKey::desc("weight"),
                SortKey::desc("id")
            ]
        );
        assert!(SortSpec::parse("status:sideways").is_err());
        assert!(SortSpec::parse("").unwrap().is_empty());
    }

    #[test]
    fn identifier_appended_last() {
        let order = SortOrder::resolve(&descriptor(), &SortSpec::new().desc("status")).unwrap();
        let names: Vec<_> = order.keys().iter().map(|(f, _)| f.name).collect();
        assert_eq!(names, vec!["status", "id"]);
    }

    #[test]
    fn empty_spec_still_sorts_by_identifier() {
        let order = SortOrder::resolve(&descriptor(), &SortSpec::new()).unwrap();
        assert_eq!(order.keys().len(), 1);
        assert_eq!(order.keys()[0].0.name, "id");
        assert_eq!(order.keys()[0].1, Direction::Ascending);
    }

    #[test]
    fn explicit_identifier_direction_kept() {
        let order = SortOrder::resolve(&descriptor(), &SortSpec::new().desc("id")).unwrap();
        assert_eq!(order.keys().len(), 1);
        assert_eq!(order.keys()[0].1, Direction::Descending);
    }

    #[test]
    fn unknown_sort_field_rejected() {
        let err = SortOrder::resolve(&descriptor(), &SortSpec::new().asc("colour")).unwrap_err();
        assert!(err.is_invalid_request());
    }
}
