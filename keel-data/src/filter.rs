use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::catalog::{FieldDescriptor, RecordDescriptor};
use crate::entity::FieldAccess;
use crate::error::DataError;
use crate::value::Value;

/// Comparison applied by one filter condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
    Contains,
    StartsWith,
    EndsWith,
    In,
    IsNull,
    IsNotNull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Arity {
    Zero,
    One,
    Many,
}

impl FilterOp {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterOp::Equals => "eq",
            FilterOp::NotEquals => "ne",
            FilterOp::GreaterThan => "gt",
            FilterOp::GreaterOrEqual => "gte",
            FilterOp::LessThan => "lt",
            FilterOp::LessOrEqual => "lte",
            FilterOp::Contains => "contains",
            FilterOp::StartsWith => "starts_with",
            FilterOp::EndsWith => "ends_with",
            FilterOp::In => "in",
            FilterOp::IsNull => "is_null",
            FilterOp::IsNotNull => "is_not_null",
        }
    }

    fn arity(self) -> Arity {
        match self {
            FilterOp::IsNull | FilterOp::IsNotNull => Arity::Zero,
            FilterOp::In => Arity::Many,
            _ => Arity::One,
        }
    }

    fn is_text_match(self) -> bool {
        matches!(
            self,
            FilterOp::Contains | FilterOp::StartsWith | FilterOp::EndsWith
        )
    }

    fn is_ordering(self) -> bool {
        matches!(
            self,
            FilterOp::GreaterThan
                | FilterOp::GreaterOrEqual
                | FilterOp::LessThan
                | FilterOp::LessOrEqual
        )
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOp {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op = match s.trim().to_ascii_lowercase().as_str() {
            "eq" | "equals" => FilterOp::Equals,
            "ne" | "not_equals" => FilterOp::NotEquals,
            "gt" | "greater_than" => FilterOp::GreaterThan,
            "gte" | "greater_or_equal" => FilterOp::GreaterOrEqual,
            "lt" | "less_than" => FilterOp::LessThan,
            "lte" | "less_or_equal" => FilterOp::LessOrEqual,
            "contains" => FilterOp::Contains,
            "starts_with" => FilterOp::StartsWith,
            "ends_with" => FilterOp::EndsWith,
            "in" => FilterOp::In,
            "is_null" => FilterOp::IsNull,
            "is_not_null" => FilterOp::IsNotNull,
            other => {
                return Err(DataError::invalid(format!(
                    "unknown filter operator '{other}'"
                )))
            }
        };
        Ok(op)
    }
}

/// Right-hand side of a filter condition as supplied by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    None,
    Value(Value),
    List(Vec<Value>),
    /// Unparsed text, typed against the field's declared type on resolution.
    Raw(String),
}

/// One caller-supplied (field, operator, value) triple.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCondition {
    pub field: String,
    pub op: FilterOp,
    pub operand: Operand,
}

impl FilterCondition {
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            operand: Operand::Value(value.into()),
        }
    }

    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Equals, value)
    }

    pub fn is_in<V: Into<Value>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::In,
            operand: Operand::List(values.into_iter().map(Into::into).collect()),
        }
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::IsNull,
            operand: Operand::None,
        }
    }

    pub fn is_not_null(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::IsNotNull,
            operand: Operand::None,
        }
    }

    pub fn raw(field: impl Into<String>, op: FilterOp, raw: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            op,
            operand: Operand::Raw(raw.into()),
        }
    }

    /// Parse `field:op[:value]`. The value keeps any further `:` characters.
    pub fn parse(expr: &str) -> Result<Self, DataError> {
        let mut parts = expr.splitn(3, ':');
        let field = parts.next().unwrap_or_default().trim();
        let op = parts
            .next()
            .ok_or_else(|| DataError::invalid(format!("filter '{expr}' has no operator")))?;
        if field.is_empty() {
            return Err(DataError::invalid(format!("filter '{expr}' has no field")));
        }
        let op: FilterOp = op.parse()?;
        let operand = match parts.next() {
            Some(raw) => Operand::Raw(raw.to_string()),
            None => Operand::None,
        };
        Ok(Self {
            field: field.to_string(),
            op,
            operand,
        })
    }
}

/// Ordered set of filter conditions, combined with logical AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    conditions: Vec<FilterCondition>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, condition: FilterCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn push(&mut self, condition: FilterCondition) {
        self.conditions.push(condition);
    }

    /// Parse `;`-separated conditions, e.g. `status:eq:closed;weight_kg:gt:10`.
    pub fn parse(expr: &str) -> Result<Self, DataError> {
        let conditions = expr
            .split(';')
            .filter(|segment| !segment.trim().is_empty())
            .map(FilterCondition::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { conditions })
    }

    pub fn conditions(&self) -> &[FilterCondition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }
}

impl FromIterator<FilterCondition> for FilterSpec {
    fn from_iter<I: IntoIterator<Item = FilterCondition>>(iter: I) -> Self {
        Self {
            conditions: iter.into_iter().collect(),
        }
    }
}

/// A filter condition resolved against a record descriptor and type-checked.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    field: FieldDescriptor,
    op: FilterOp,
    values: Vec<Value>,
}

impl Predicate {
    /// Resolve and type-check one condition.
    ///
    /// Unknown fields, operators that do not apply to the field's type, and
    /// values of the wrong type are rejected; nothing is coerced.
    pub fn resolve(
        descriptor: &RecordDescriptor,
        condition: &FilterCondition,
    ) -> Result<Self, DataError> {
        let field = descriptor.field(&condition.field).ok_or_else(|| {
            DataError::invalid(format!(
                "unknown filter field '{}' on record type '{}'",
                condition.field,
                descriptor.type_name()
            ))
        })?;
        let op = condition.op;

        if op.is_text_match() && !field.ty.is_text() {
            return Err(DataError::invalid(format!(
                "operator '{op}' requires a text field, '{}' is {}",
                field.name, field.ty
            )));
        }
        if op.is_ordering() && !field.ty.is_ordered() {
            return Err(DataError::invalid(format!(
                "operator '{op}' does not apply to {} field '{}'",
                field.ty, field.name
            )));
        }

        let values = match (op.arity(), &condition.operand) {
            (Arity::Zero, Operand::None) => Vec::new(),
            (Arity::Zero, Operand::Raw(raw)) if raw.is_empty() => Vec::new(),
            (Arity::One, Operand::Value(v)) => vec![v.clone()],
            (Arity::One, Operand::Raw(raw)) => vec![Value::parse(field.ty, raw)?],
            (Arity::Many, Operand::List(vs)) => vs.clone(),
            (Arity::Many, Operand::Value(v)) => vec![v.clone()],
            (Arity::Many, Operand::Raw(raw)) => raw
                .split(',')
                .map(|part| Value::parse(field.ty, part))
                .collect::<Result<Vec<_>, _>>()?,
            (arity, _) => {
                let expected = match arity {
                    Arity::Zero => "no value",
                    Arity::One => "exactly one value",
                    Arity::Many => "a list of values",
                };
                return Err(DataError::invalid(format!(
                    "operator '{op}' on '{}' takes {expected}",
                    field.name
                )));
            }
        };

        if op.arity() == Arity::Many && values.is_empty() {
            return Err(DataError::invalid(format!(
                "operator 'in' on '{}' needs at least one value",
                field.name
            )));
        }
        for value in &values {
            if value.is_null() {
                return Err(DataError::invalid(format!(
                    "null operand for '{}'; use is_null / is_not_null",
                    field.name
                )));
            }
            if !value.fits(field.ty) {
                return Err(DataError::invalid(format!(
                    "value {value} does not match {} field '{}'",
                    field.ty, field.name
                )));
            }
        }

        Ok(Self {
            field: field.clone(),
            op,
            values,
        })
    }

    pub fn field(&self) -> &FieldDescriptor {
        &self.field
    }

    pub fn op(&self) -> FilterOp {
        self.op
    }

    /// Typed operands; empty for the null checks.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Evaluate against one record. Null field values only satisfy `is_null`.
    pub fn matches<R: FieldAccess + ?Sized>(&self, record: &R) -> bool {
        let actual = record.get_field(self.field.name).unwrap_or(Value::Null);
        match self.op {
            FilterOp::IsNull => return actual.is_null(),
            FilterOp::IsNotNull => return !actual.is_null(),
            _ if actual.is_null() => return false,
            _ => {}
        }

        let Some(operand) = self.values.first() else {
            return false;
        };
        match self.op {
            FilterOp::Equals => actual.compare(operand) == Ordering::Equal,
            FilterOp::NotEquals => actual.compare(operand) != Ordering::Equal,
            FilterOp::GreaterThan => actual.compare(operand) == Ordering::Greater,
            FilterOp::GreaterOrEqual => actual.compare(operand) != Ordering::Less,
            FilterOp::LessThan => actual.compare(operand) == Ordering::Less,
            FilterOp::LessOrEqual => actual.compare(operand) != Ordering::Greater,
            FilterOp::Contains | FilterOp::StartsWith | FilterOp::EndsWith => {
                match (&actual, operand) {
                    (Value::Text(haystack), Value::Text(needle)) => {
                        // ASCII folding only, the same rule SQL LOWER() and LIKE apply
                        let haystack = haystack.to_ascii_lowercase();
                        let needle = needle.to_ascii_lowercase();
                        match self.op {
                            FilterOp::Contains => haystack.contains(&needle),
                            FilterOp::StartsWith => haystack.starts_with(&needle),
                            _ => haystack.ends_with(&needle),
                        }
                    }
                    _ => false,
                }
            }
            FilterOp::In => self
                .values
                .iter()
                .any(|v| actual.compare(v) == Ordering::Equal),
            FilterOp::IsNull | FilterOp::IsNotNull => unreachable!("handled above"),
        }
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
            .field("weight", FieldType::Int)
            .field("fragile", FieldType::Bool)
            .optional("notes", FieldType::Text)
            .build()
    }

    #[test]
    fn parse_conditions() {
        let spec = FilterSpec::parse("status:eq:closed; notes:is_null ;weight:in:1,2").unwrap();
        assert_eq!(spec.len(), 3);
        assert_eq!(spec.conditions()[0].op, FilterOp::Equals);
        assert_eq!(spec.conditions()[1].operand, Operand::None);
        assert_eq!(spec.conditions()[2].operand, Operand::Raw("1,2".into()));
    }

    #[test]
    fn parse_keeps_colons_in_value() {
        let cond = FilterCondition::parse("status:eq:a:b").unwrap();
        assert_eq!(cond.operand, Operand::Raw("a:b".into()));
    }

    #[test]
    fn unknown_operator_rejected() {
        let err = FilterCondition::parse("status:like:x").unwrap_err();
        assert!(err.is_invalid_request());
    }

    #[test]
    fn text_operator_on_numeric_field_rejected() {
        let cond = FilterCondition::new("weight", FilterOp::Contains, "4");
        let err = Predicate::resolve(&descriptor(), &cond).unwrap_err();
        assert!(err.is_invalid_request());
    }

    #[test]
    fn ordering_operator_on_bool_rejected() {
        let cond = FilterCondition::new("fragile", FilterOp::GreaterThan, true);
        assert!(Predicate::resolve(&descriptor(), &cond).is_err());
    }

    #[test]
    fn mismatched_value_type_rejected() {
        let cond = FilterCondition::equals("weight", "10");
        assert!(Predicate::resolve(&descriptor(), &cond).is_err());
        let cond = FilterCondition::raw("weight", FilterOp::Equals, "ten");
        assert!(Predicate::resolve(&descriptor(), &cond).is_err());
    }

    #[test]
    fn raw_values_are_typed_by_field() {
        let cond = FilterCondition::raw("weight", FilterOp::In, "1,2,3");
        let predicate = Predicate::resolve(&descriptor(), &cond).unwrap();
        assert_eq!(
            predicate.values(),
            &[Value::Int(1), Value::Int(2), Value::Int(3)]
        );
    }

    #[test]
    fn null_operand_rejected() {
        let cond = FilterCondition {
            field: "notes".into(),
            op: FilterOp::Equals,
            operand: Operand::Value(Value::Null),
        };
        assert!(Predicate::resolve(&descriptor(), &cond).is_err());
    }

    #[test]
    fn arity_checked() {
        let cond = FilterCondition {
            field: "notes".into(),
            op: FilterOp::IsNull,
            operand: Operand::Value(Value::text("x")),
        };
        assert!(Predicate::resolve(&descriptor(), &cond).is_err());

        let cond = FilterCondition::is_in("weight", Vec::<i64>::new());
        assert!(Predicate::resolve(&descriptor(), &cond).is_err());
    }

    #[derive(Default)]
    struct Parcel {
        status: String,
    }

    crate::impl_field_access!(Parcel { status });

    #[test]
    fn text_operators_fold_ascii_case_only() {
        let descriptor = descriptor();
        let parcel = Parcel {
            status: "CAFÉ-1".into(),
        };
        let matches = |op: FilterOp, needle: &str| {
            Predicate::resolve(&descriptor, &FilterCondition::new("status", op, needle))
                .unwrap()
                .matches(&parcel)
        };
        assert!(matches(FilterOp::Contains, "caf"));
        assert!(matches(FilterOp::StartsWith, "cafÉ"));
        assert!(matches(FilterOp::EndsWith, "É-1"));
        assert!(!matches(FilterOp::Contains, "café"));
    }

    #[test]
    fn unknown_field_rejected() {
        let cond = FilterCondition::equals("colour", "red");
        let err = Predicate::resolve(&descriptor(), &cond).unwrap_err();
        assert!(err.to_string().contains("colour"));
    }
}
