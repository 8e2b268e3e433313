use std::collections::HashMap;
use std::fmt;

use crate::entity::Record;
use crate::error::DataError;
use crate::value::FieldType;

pub const CREATED_AT: &str = "created_at";
pub const CREATED_BY: &str = "created_by";
pub const MODIFIED_AT: &str = "modified_at";
pub const MODIFIED_BY: &str = "modified_by";

/// The four audit fields, in declaration order.
pub const AUDIT_FIELDS: [(&str, FieldType); 4] = [
    (CREATED_AT, FieldType::Timestamp),
    (CREATED_BY, FieldType::Text),
    (MODIFIED_AT, FieldType::Timestamp),
    (MODIFIED_BY, FieldType::Text),
];

/// What a field means to the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRole {
    Identifier,
    Data,
    Audit,
}

/// Name, type and role of one field of a record or transfer shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub ty: FieldType,
    pub nullable: bool,
    pub role: FieldRole,
}

impl FieldDescriptor {
    pub fn new(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            nullable: false,
            role: FieldRole::Data,
        }
    }

    pub fn optional(name: &'static str, ty: FieldType) -> Self {
        Self {
            nullable: true,
            ..Self::new(name, ty)
        }
    }

    /// Identifier and audit fields are never written from a transfer shape.
    pub fn is_write_protected(&self) -> bool {
        self.role != FieldRole::Data
    }
}

/// Per-type metadata: fields, identity, storage name and audit capability.
#[derive(Debug, Clone)]
pub struct RecordDescriptor {
    type_name: &'static str,
    storage_name: &'static str,
    id_field: &'static str,
    fields: Vec<FieldDescriptor>,
    auditable: bool,
}

impl RecordDescriptor {
    /// Start describing a record type.
    ///
    /// `storage_name` is module-prefixed (`shipments_consignment`) and only
    /// interpreted by the persistence collaborator.
    pub fn builder(type_name: &'static str, storage_name: &'static str) -> DescriptorBuilder {
        DescriptorBuilder {
            type_name,
            storage_name,
            id_field: None,
            fields: Vec::new(),
            auditable: false,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn storage_name(&self) -> &'static str {
        self.storage_name
    }

    pub fn id_field(&self) -> &'static str {
        self.id_field
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_auditable(&self) -> bool {
        self.auditable
    }

    /// Field names in declaration order, for column lists.
    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.name).collect()
    }

    /// Structural checks run by [`Catalog::register`].
    pub fn validate(&self) -> Result<(), DataError> {
        let context = self.type_name;
        if !is_identifier(self.type_name) {
            return Err(DataError::configuration(format!(
                "record type name '{}' is not a valid identifier",
                self.type_name
            )));
        }
        if !is_identifier(self.storage_name) {
            return Err(DataError::configuration(format!(
                "{context}: storage name '{}' is not a valid identifier",
                self.storage_name
            )));
        }

        let mut seen = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            if !is_identifier(field.name) {
                return Err(DataError::configuration(format!(
                    "{context}: field name '{}' is not a valid identifier",
                    field.name
                )));
            }
            if seen.contains(&field.name) {
                return Err(DataError::configuration(format!(
                    "{context}: field '{}' declared twice",
                    field.name
                )));
            }
            seen.push(field.name);
        }

        match self.field(self.id_field) {
            Some(f) if f.ty == FieldType::Id && !f.nullable => {}
            _ => {
                return Err(DataError::configuration(format!(
                    "{context}: identifier field '{}' must be a non-null id field",
                    self.id_field
                )))
            }
        }

        let audit_count = self
            .fields
            .iter()
            .filter(|f| f.role == FieldRole::Audit)
            .count();
        if self.auditable && audit_count != AUDIT_FIELDS.len() {
            return Err(DataError::configuration(format!(
                "{context}: auditable records carry exactly the four audit fields"
            )));
        }
        if !self.auditable && audit_count > 0 {
            return Err(DataError::configuration(format!(
                "{context}: audit fields declared on a non-auditable record"
            )));
        }
        Ok(())
    }
}

/// Builder for [`RecordDescriptor`].
pub struct DescriptorBuilder {
    type_name: &'static str,
    storage_name: &'static str,
    id_field: Option<&'static str>,
    fields: Vec<FieldDescriptor>,
    auditable: bool,
}

impl DescriptorBuilder {
    /// Declare the identifier field. It is always the first column.
    pub fn id(mut self, name: &'static str) -> Self {
        self.id_field = Some(name);
        self.fields.insert(
            0,
            FieldDescriptor {
                role: FieldRole::Identifier,
                ..FieldDescriptor::new(name, FieldType::Id)
            },
        );
        self
    }

    pub fn field(mut self, name: &'static str, ty: FieldType) -> Self {
        self.fields.push(FieldDescriptor::new(name, ty));
        self
    }

    pub fn optional(mut self, name: &'static str, ty: FieldType) -> Self {
        self.fields.push(FieldDescriptor::optional(name, ty));
        self
    }

    /// Give the record the audit capability: adds the four nullable audit fields.
    pub fn auditable(mut self) -> Self {
        if !self.auditable {
            self.auditable = true;
            for (name, ty) in AUDIT_FIELDS {
                self.fields.push(FieldDescriptor {
                    role: FieldRole::Audit,
                    ..FieldDescriptor::optional(name, ty)
                });
            }
        }
        self
    }

    pub fn build(self) -> RecordDescriptor {
        RecordDescriptor {
            type_name: self.type_name,
            storage_name: self.storage_name,
            id_field: self.id_field.unwrap_or("id"),
            fields: self.fields,
            auditable: self.auditable,
        }
    }
}

/// Why a catalog lookup failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    UnknownRecord(String),
    UnknownField { record: String, field: String },
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupError::UnknownRecord(record) => write!(f, "unknown record type '{record}'"),
            LookupError::UnknownField { record, field } => {
                write!(f, "unknown field '{field}' on record type '{record}'")
            }
        }
    }
}

impl From<LookupError> for DataError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::UnknownRecord(_) => DataError::Configuration(err.to_string()),
            LookupError::UnknownField { .. } => DataError::InvalidRequest(err.to_string()),
        }
    }
}

/// Read-only registry of record descriptors, populated at process start.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    records: HashMap<&'static str, RecordDescriptor>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor. Registering the same type twice is a configuration error.
    pub fn register(&mut self, descriptor: RecordDescriptor) -> Result<(), DataError> {
        descriptor.validate()?;
        let name = descriptor.type_name;
        if self.records.contains_key(name) {
            return Err(DataError::configuration(format!(
                "record type '{name}' registered twice"
            )));
        }
        tracing::info!(
            record = name,
            storage = descriptor.storage_name,
            fields = descriptor.fields.len(),
            auditable = descriptor.auditable,
            "record type registered"
        );
        self.records.insert(name, descriptor);
        Ok(())
    }

    /// Register the descriptor declared by `R`.
    ///
    /// The descriptor's type name must match `R::type_name()`.
    pub fn register_record<R: Record>(&mut self) -> Result<(), DataError> {
        let descriptor = R::descriptor();
        if descriptor.type_name != R::type_name() {
            return Err(DataError::configuration(format!(
                "record type '{}' declares a descriptor named '{}'",
                R::type_name(),
                descriptor.type_name
            )));
        }
        self.register(descriptor)
    }

    pub fn descriptor(&self, record_type: &str) -> Result<&RecordDescriptor, LookupError> {
        self.records
            .get(record_type)
            .ok_or_else(|| LookupError::UnknownRecord(record_type.to_string()))
    }

    pub fn resolve_field(
        &self,
        record_type: &str,
        field_name: &str,
    ) -> Result<&FieldDescriptor, LookupError> {
        self.descriptor(record_type)?
            .field(field_name)
            .ok_or_else(|| LookupError::UnknownField {
                record: record_type.to_string(),
                field: field_name.to_string(),
            })
    }

    /// Unknown record types are not auditable.
    pub fn is_auditable(&self, record_type: &str) -> bool {
        self.records
            .get(record_type)
            .is_some_and(RecordDescriptor::is_auditable)
    }

    pub fn contains(&self, record_type: &str) -> bool {
        self.records.contains_key(record_type)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Conservative identifier pattern shared with the SQL builder.
pub(crate) fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoice() -> RecordDescriptor {
        RecordDescriptor::builder("invoice", "finance_invoice")
            .id("id")
            .field("number", FieldType::Text)
            .optional("paid_at", FieldType::Timestamp)
            .auditable()
            .build()
    }

    #[test]
    fn resolves_declared_fields() {
        let mut catalog = Catalog::new();
        catalog.register(invoice()).unwrap();

        let field = catalog.resolve_field("invoice", "number").unwrap();
        assert_eq!(field.ty, FieldType::Text);
        assert_eq!(
            catalog.resolve_field("invoice", CREATED_BY).unwrap().role,
            FieldRole::Audit
        );
        assert_eq!(
            catalog.resolve_field("invoice", "id").unwrap().role,
            FieldRole::Identifier
        );
        assert!(catalog.is_auditable("invoice"));
        assert!(!catalog.is_auditable("payment"));
    }

    #[test]
    fn unknown_field_is_a_lookup_miss_not_a_panic() {
        let mut catalog = Catalog::new();
        catalog.register(invoice()).unwrap();

        let err = catalog.resolve_field("invoice", "amount").unwrap_err();
        assert!(matches!(err, LookupError::UnknownField { .. }));
        assert!(DataError::from(err).is_invalid_request());
        assert!(matches!(
            catalog.resolve_field("payment", "id"),
            Err(LookupError::UnknownRecord(_))
        ));
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut catalog = Catalog::new();
        catalog.register(invoice()).unwrap();
        let err = catalog.register(invoice()).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn audit_field_collision_fails() {
        let descriptor = RecordDescriptor::builder("invoice", "finance_invoice")
            .id("id")
            .optional(CREATED_BY, FieldType::Text)
            .auditable()
            .build();
        assert!(Catalog::new().register(descriptor).is_err());
    }

    #[test]
    fn missing_identifier_fails() {
        let descriptor = RecordDescriptor::builder("invoice", "finance_invoice")
            .field("number", FieldType::Text)
            .build();
        assert!(Catalog::new().register(descriptor).is_err());
    }

    #[test]
    fn storage_name_must_be_identifier() {
        let descriptor = RecordDescriptor::builder("invoice", "finance invoice")
            .id("id")
            .build();
        assert!(Catalog::new().register(descriptor).is_err());
    }
}
