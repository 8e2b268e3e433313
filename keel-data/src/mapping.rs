//! Declarative, bidirectional field mapping between records and transfer shapes.
//!
//! A [`MappingRule`] lists one resolution per shape field. Rules are checked
//! for totality and type compatibility when registered, so a mapping gap
//! stops the process at startup instead of surfacing on first use.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::catalog::{Catalog, FieldDescriptor};
use crate::entity::{Record, Shape};
use crate::error::DataError;
use crate::value::Value;

type ComputeFn<R> = Arc<dyn Fn(&R) -> Value + Send + Sync>;

/// How one shape field obtains its value.
pub enum Resolution<R> {
    /// Copy from the named record field (and back, unless write-protected).
    Copy(&'static str),
    /// Leave the shape's type default; never written back.
    Ignore,
    /// Substitute a constant; never written back.
    Default(Value),
    /// Derive from the whole record; never written back.
    Computed(ComputeFn<R>),
}

impl<R> Clone for Resolution<R> {
    fn clone(&self) -> Self {
        match self {
            Resolution::Copy(source) => Resolution::Copy(source),
            Resolution::Ignore => Resolution::Ignore,
            Resolution::Default(value) => Resolution::Default(value.clone()),
            Resolution::Computed(f) => Resolution::Computed(Arc::clone(f)),
        }
    }
}

struct FieldRule<R> {
    target: &'static str,
    resolution: Resolution<R>,
    read_only: bool,
}

/// The declared rule set for one record/shape pair.
///
/// ```ignore
/// let rule = MappingRule::<Consignment, ConsignmentSummary>::new()
///     .copy("id")
///     .copy_from("carrier", "carrier_name")
///     .default_value("currency", "EUR")
///     .computed("label", |c| Value::text(format!("{} ({})", c.reference, c.status)))
///     .ignore("internal_notes");
/// ```
pub struct MappingRule<R, S> {
    rules: Vec<FieldRule<R>>,
    _shape: PhantomData<fn() -> S>,
}

impl<R: Record, S: Shape> Default for MappingRule<R, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record, S: Shape> MappingRule<R, S> {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            _shape: PhantomData,
        }
    }

    fn push(mut self, target: &'static str, resolution: Resolution<R>, read_only: bool) -> Self {
        self.rules.push(FieldRule {
            target,
            resolution,
            read_only,
        });
        self
    }

    /// Copy a field of the same name in both directions.
    pub fn copy(self, field: &'static str) -> Self {
        self.push(field, Resolution::Copy(field), false)
    }

    /// Copy `source` on the record into `target` on the shape, and back.
    pub fn copy_from(self, target: &'static str, source: &'static str) -> Self {
        self.push(target, Resolution::Copy(source), false)
    }

    /// Copy a field of the same name onto the shape only; the record keeps
    /// its own value on write.
    pub fn read_only(self, field: &'static str) -> Self {
        self.push(field, Resolution::Copy(field), true)
    }

    pub fn ignore(self, target: &'static str) -> Self {
        self.push(target, Resolution::Ignore, true)
    }

    pub fn default_value(self, target: &'static str, value: impl Into<Value>) -> Self {
        self.push(target, Resolution::Default(value.into()), true)
    }

    pub fn computed(
        self,
        target: &'static str,
        f: impl Fn(&R) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.push(target, Resolution::Computed(Arc::new(f)), true)
    }

    /// Add a same-name copy for every shape field that has no rule yet and
    /// exists on the record. Call it after the explicit rules.
    pub fn copy_matching(mut self) -> Self {
        let descriptor = R::descriptor();
        for field in S::fields() {
            let ruled = self.rules.iter().any(|r| r.target == field.name);
            if !ruled && descriptor.field(field.name).is_some() {
                self = self.copy(field.name);
            }
        }
        self
    }

    fn compile(self, catalog: &Catalog) -> Result<CompiledMapping<R, S>, DataError> {
        let pair = format!("{} -> {}", R::type_name(), S::shape_name());
        let record = catalog.descriptor(R::type_name()).map_err(|e| {
            DataError::configuration(format!("mapping {pair}: {e}"))
        })?;
        let shape_fields = S::fields();

        for (i, field) in shape_fields.iter().enumerate() {
            if shape_fields[..i].iter().any(|f| f.name == field.name) {
                return Err(DataError::configuration(format!(
                    "mapping {pair}: shape field '{}' declared twice",
                    field.name
                )));
            }
        }

        let mut compiled = Vec::with_capacity(self.rules.len());
        for rule in self.rules {
            let target = shape_fields
                .iter()
                .find(|f| f.name == rule.target)
                .cloned()
                .ok_or_else(|| {
                    DataError::configuration(format!(
                        "mapping {pair}: rule for unknown shape field '{}'",
                        rule.target
                    ))
                })?;
            if compiled
                .iter()
                .any(|c: &CompiledRule<R>| c.target.name == target.name)
            {
                return Err(DataError::configuration(format!(
                    "mapping {pair}: more than one rule for '{}'",
                    target.name
                )));
            }

            let mut writable = false;
            let mut source = None;
            match &rule.resolution {
                Resolution::Copy(name) => {
                    let field = record.field(name).ok_or_else(|| {
                        DataError::configuration(format!(
                            "mapping {pair}: '{}' copies unknown record field '{name}'",
                            target.name
                        ))
                    })?;
                    if field.ty != target.ty {
                        return Err(DataError::configuration(format!(
                            "mapping {pair}: '{}' is {} but record field '{name}' is {}",
                            target.name, target.ty, field.ty
                        )));
                    }
                    writable = !rule.read_only && !field.is_write_protected();
                    if writable && target.nullable && !field.nullable {
                        return Err(DataError::configuration(format!(
                            "mapping {pair}: nullable '{}' cannot be written to required '{name}'",
                            target.name
                        )));
                    }
                    source = Some(field.clone());
                }
                Resolution::Default(value) => {
                    if !value.fits(target.ty) || (value.is_null() && !target.nullable) {
                        return Err(DataError::configuration(format!(
                            "mapping {pair}: default {value} does not fit {} field '{}'",
                            target.ty, target.name
                        )));
                    }
                }
                Resolution::Ignore | Resolution::Computed(_) => {}
            }

            compiled.push(CompiledRule {
                target,
                source,
                resolution: rule.resolution,
                writable,
            });
        }

        let missing: Vec<&str> = shape_fields
            .iter()
            .filter(|f| !compiled.iter().any(|c| c.target.name == f.name))
            .map(|f| f.name)
            .collect();
        if !missing.is_empty() {
            return Err(DataError::configuration(format!(
                "mapping {pair}: no resolution for {}",
                missing.join(", ")
            )));
        }

        Ok(CompiledMapping {
            rules: compiled,
            _shape: PhantomData,
        })
    }
}

struct CompiledRule<R> {
    target: FieldDescriptor,
    source: Option<FieldDescriptor>,
    resolution: Resolution<R>,
    writable: bool,
}

struct CompiledMapping<R, S> {
    rules: Vec<CompiledRule<R>>,
    _shape: PhantomData<fn() -> S>,
}

impl<R: Record, S: Shape> CompiledMapping<R, S> {
    fn to_shape(&self, record: &R) -> Result<S, DataError> {
        let mut shape = S::default();
        for rule in &self.rules {
            let value = match &rule.resolution {
                Resolution::Ignore => continue,
                Resolution::Copy(source) => record.get_field(source).unwrap_or(Value::Null),
                Resolution::Default(value) => value.clone(),
                Resolution::Computed(f) => f(record),
            };
            // a missing value on a required shape field keeps the type default
            if value.is_null() && !rule.target.nullable {
                continue;
            }
            if !value.fits(rule.target.ty) {
                return Err(DataError::configuration(format!(
                    "mapping {} -> {}: value {value} does not fit {} field '{}'",
                    R::type_name(),
                    S::shape_name(),
                    rule.target.ty,
                    rule.target.name
                )));
            }
            shape.set_field(rule.target.name, value)?;
        }
        Ok(shape)
    }

    fn to_record(&self, shape: &S, existing: Option<&R>) -> Result<R, DataError> {
        let mut record = existing.cloned().unwrap_or_default();
        for rule in self.rules.iter().filter(|r| r.writable) {
            let Some(source) = &rule.source else {
                continue;
            };
            let value = shape.get_field(rule.target.name).unwrap_or(Value::Null);
            record.set_field(source.name, value)?;
        }
        Ok(record)
    }
}

type PairKey = (TypeId, TypeId);

/// Registry of validated mappings, keyed by (record type, shape type).
///
/// Mapping never performs I/O and never mutates its input.
pub struct MappingRegistry {
    catalog: Arc<Catalog>,
    mappings: HashMap<PairKey, Arc<dyn Any + Send + Sync>>,
}

impl std::fmt::Debug for MappingRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappingRegistry")
            .field("mappings", &self.mappings.len())
            .finish()
    }
}

impl MappingRegistry {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            mappings: HashMap::new(),
        }
    }

    /// Validate and register a rule set.
    ///
    /// Fails with a configuration error when the rule set is not total over
    /// the shape's fields, has two rules for one field, references unknown
    /// fields, or when the pair is already registered.
    pub fn register<R: Record, S: Shape>(
        &mut self,
        rule: MappingRule<R, S>,
    ) -> Result<(), DataError> {
        let key = (TypeId::of::<R>(), TypeId::of::<S>());
        if self.mappings.contains_key(&key) {
            return Err(DataError::configuration(format!(
                "mapping {} -> {} registered twice",
                R::type_name(),
                S::shape_name()
            )));
        }
        let compiled = rule.compile(&self.catalog)?;
        tracing::info!(
            record = R::type_name(),
            shape = S::shape_name(),
            rules = compiled.rules.len(),
            "mapping registered"
        );
        self.mappings.insert(key, Arc::new(compiled));
        Ok(())
    }

    pub fn contains<R: Record, S: Shape>(&self) -> bool {
        self.mappings
            .contains_key(&(TypeId::of::<R>(), TypeId::of::<S>()))
    }

    fn lookup<R: Record, S: Shape>(&self) -> Result<&CompiledMapping<R, S>, DataError> {
        self.mappings
            .get(&(TypeId::of::<R>(), TypeId::of::<S>()))
            .and_then(|m| m.downcast_ref::<CompiledMapping<R, S>>())
            .ok_or_else(|| {
                DataError::configuration(format!(
                    "no mapping registered for {} -> {}",
                    R::type_name(),
                    S::shape_name()
                ))
            })
    }

    /// Project a record onto a shape.
    pub fn to_shape<R: Record, S: Shape>(&self, record: &R) -> Result<S, DataError> {
        self.lookup::<R, S>()?.to_shape(record)
    }

    /// Build a record from a shape.
    ///
    /// With `existing` (update path), identifier, audit and read-only fields
    /// keep the existing record's values. Without it they stay at their
    /// defaults for the create path to fill in.
    pub fn to_record<R: Record, S: Shape>(
        &self,
        shape: &S,
        existing: Option<&R>,
    ) -> Result<R, DataError> {
        self.lookup::<R, S>()?.to_record(shape, existing)
    }
}
