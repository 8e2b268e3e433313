use crate::catalog::{FieldDescriptor, RecordDescriptor};
use crate::error::DataError;
use crate::value::{RecordId, Value};

/// Named access to the fields of a record or transfer shape.
///
/// `get_field` returns `None` for a name the type does not have. Usually
/// generated with [`impl_field_access!`](crate::impl_field_access).
pub trait FieldAccess {
    fn get_field(&self, name: &str) -> Option<Value>;
    fn set_field(&mut self, name: &str, value: Value) -> Result<(), DataError>;
}

/// A persisted entity type known to the catalog.
///
/// # Example
///
/// ```ignore
/// impl Record for Consignment {
///     fn type_name() -> &'static str { "consignment" }
///     fn descriptor() -> RecordDescriptor {
///         RecordDescriptor::builder("consignment", "shipments_consignment")
///             .id("id")
///             .field("status", FieldType::Text)
///             .auditable()
///             .build()
///     }
///     fn id(&self) -> RecordId { self.id }
///     fn set_id(&mut self, id: RecordId) { self.id = id }
/// }
/// ```
pub trait Record: FieldAccess + Clone + Default + Send + Sync + 'static {
    fn type_name() -> &'static str;
    fn descriptor() -> RecordDescriptor;
    fn id(&self) -> RecordId;
    fn set_id(&mut self, id: RecordId);
}

/// A transfer shape: an in-memory projection handed across a boundary.
pub trait Shape: FieldAccess + Default + Send + Sync + 'static {
    fn shape_name() -> &'static str;
    fn fields() -> Vec<FieldDescriptor>;
}

/// Binds a record type to its two canonical transfer shapes.
pub trait Projected: Record {
    /// Identifiers and display fields, used for search results.
    type Reduced: Shape;
    /// Full field set, used for single-item read and write.
    type Detailed: Shape;
}

/// Implement [`FieldAccess`] for a plain struct.
///
/// Every listed field must implement `Clone`, [`IntoValue`](crate::IntoValue)
/// and [`FromValue`](crate::FromValue).
///
/// ```ignore
/// keel_data::impl_field_access!(Consignment { id, status, weight_kg, created_at });
/// ```
#[macro_export]
macro_rules! impl_field_access {
    ($ty:ty { $($field:ident),* $(,)? }) => {
        impl $crate::FieldAccess for $ty {
            fn get_field(&self, name: &str) -> Option<$crate::Value> {
                $(
                    if name == stringify!($field) {
                        return Some($crate::IntoValue::into_value(self.$field.clone()));
                    }
                )*
                None
            }

            fn set_field(
                &mut self,
                name: &str,
                value: $crate::Value,
            ) -> Result<(), $crate::DataError> {
                $(
                    if name == stringify!($field) {
                        self.$field = $crate::FromValue::from_value(value, name)?;
                        return Ok(());
                    }
                )*
                Err($crate::DataError::InvalidRequest(format!(
                    "{} has no field '{}'",
                    stringify!($ty),
                    name
                )))
            }
        }
    };
}
